pub mod store;

use serde::{Deserialize, Serialize};

use crate::config::MasteryTuning;
use crate::difficulty::Difficulty;

/// Long-run competence aggregate per (learner, subject, grade). Created
/// lazily on first access and mutated only at session-commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryState {
    pub learner_id: String,
    pub subject: String,
    pub grade_level: u8,
    /// Seed difficulty for the learner's next session.
    pub current_difficulty: Difficulty,
    /// 0-100 competence estimate.
    pub mastery_level: u8,
    pub total_sessions: u32,
    pub total_questions_answered: u32,
    pub total_correct: u32,
    /// Within-session correct-streak high-water mark.
    pub best_streak: u32,
}

impl MasteryState {
    pub fn new(learner_id: &str, subject: &str, grade_level: u8) -> Self {
        MasteryState {
            learner_id: learner_id.to_string(),
            subject: subject.to_string(),
            grade_level,
            current_difficulty: Difficulty::Medium,
            mastery_level: 50,
            total_sessions: 0,
            total_questions_answered: 0,
            total_correct: 0,
            best_streak: 0,
        }
    }

    /// Merge one finished session into the aggregate.
    ///
    /// The mastery level moves by an exponentially-weighted average so the
    /// long-run history dominates a single short burst. A zero-question
    /// session still counts as a session but leaves the level and the seed
    /// difficulty untouched.
    pub fn commit_session(
        &mut self,
        answered: u32,
        correct: u32,
        final_difficulty: Difficulty,
        best_correct_run: u32,
        tuning: &MasteryTuning,
    ) {
        self.total_sessions += 1;
        if answered == 0 {
            return;
        }

        let session_accuracy = correct as f64 / answered as f64;
        let merged = tuning.history_weight * self.mastery_level as f64
            + tuning.session_weight * session_accuracy * 100.0;
        self.mastery_level = merged.round().clamp(0.0, 100.0) as u8;

        self.current_difficulty = final_difficulty;
        self.total_questions_answered += answered;
        self.total_correct += correct;
        self.best_streak = self.best_streak.max(best_correct_run);
    }
}
