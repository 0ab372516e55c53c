pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-topic error counter for one learner/subject pair. Consumed by the
/// external question generator as topic-targeting hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakArea {
    pub topic: String,
    pub error_count: u32,
    pub last_error_at: DateTime<Utc>,
    pub consecutive_correct: u32,
    pub is_resolved: bool,
}

/// All weak areas for one (learner, subject), persisted as a single record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakAreaSet {
    pub learner_id: String,
    pub subject: String,
    pub areas: HashMap<String, WeakArea>,
}

impl WeakAreaSet {
    pub fn new(learner_id: &str, subject: &str) -> Self {
        WeakAreaSet {
            learner_id: learner_id.to_string(),
            subject: subject.to_string(),
            areas: HashMap::new(),
        }
    }

    /// Record one graded answer for a topic. Wrong answers create or bump the
    /// counter and reopen a resolved area; correct answers on a tracked topic
    /// count toward the resolution run.
    pub fn record_outcome(
        &mut self,
        topic: &str,
        correct: bool,
        at: DateTime<Utc>,
        resolve_run: u32,
    ) {
        if correct {
            if let Some(area) = self.areas.get_mut(topic) {
                area.consecutive_correct += 1;
                if !area.is_resolved && area.consecutive_correct >= resolve_run {
                    area.is_resolved = true;
                    tracing::debug!(
                        learner = %self.learner_id,
                        subject = %self.subject,
                        topic = %topic,
                        run = area.consecutive_correct,
                        "Weak area resolved"
                    );
                }
            }
            return;
        }

        let area = self.areas.entry(topic.to_string()).or_insert(WeakArea {
            topic: topic.to_string(),
            error_count: 0,
            last_error_at: at,
            consecutive_correct: 0,
            is_resolved: false,
        });
        area.error_count += 1;
        area.last_error_at = at;
        area.consecutive_correct = 0;
        area.is_resolved = false;
    }

    /// Unresolved areas, worst first; ties break by most-recent error.
    pub fn top_areas(&self, limit: usize) -> Vec<WeakArea> {
        let mut areas: Vec<WeakArea> = self
            .areas
            .values()
            .filter(|a| !a.is_resolved)
            .cloned()
            .collect();
        areas.sort_by(|a, b| {
            b.error_count
                .cmp(&a.error_count)
                .then(b.last_error_at.cmp(&a.last_error_at))
        });
        areas.truncate(limit);
        areas
    }
}
