use serde::{Deserialize, Serialize};

use crate::difficulty::Difficulty;
use crate::error::EngineError;

/// Running tally for one practice/quiz session, supplied by the caller on
/// every next-question request. Never stored server-side: the server derives
/// the same next difficulty from the same inputs, so any request is safe to
/// replay and the engine stays restart-safe.
///
/// These counters are untrusted telemetry. They steer difficulty only; XP and
/// mastery are recomputed from server-authoritative records at commit time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPerformance {
    pub total_answered: u32,
    pub correct_count: u32,
    pub consecutive_correct: u32,
    pub consecutive_wrong: u32,
    /// Already-served question ids, for generator de-duplication.
    #[serde(default)]
    pub answered_question_ids: Vec<String>,
    #[serde(default)]
    pub difficulty_history: Vec<Difficulty>,
}

impl SessionPerformance {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.correct_count > self.total_answered {
            return Err(EngineError::validation(
                "correctCount exceeds totalAnswered",
                "session",
            ));
        }
        if self.consecutive_correct > self.correct_count {
            return Err(EngineError::validation(
                "consecutiveCorrect exceeds correctCount",
                "session",
            ));
        }
        if self.consecutive_wrong > self.total_answered - self.correct_count {
            return Err(EngineError::validation(
                "consecutiveWrong exceeds wrong-answer count",
                "session",
            ));
        }
        if self.consecutive_correct > 0 && self.consecutive_wrong > 0 {
            return Err(EngineError::validation(
                "only one of consecutiveCorrect/consecutiveWrong can be non-zero",
                "session",
            ));
        }
        if self.answered_question_ids.len() > self.total_answered as usize {
            return Err(EngineError::validation(
                "more answeredQuestionIds than answered questions",
                "session",
            ));
        }
        Ok(())
    }
}

/// Lifecycle of one quiz attempt. An attempt, once completed, can never be
/// re-graded: a replayed submit returns the stored record unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptPhase {
    NotStarted,
    InProgress,
    Completed,
}

impl AttemptPhase {
    /// Phase implied by the caller-supplied counters on the adaptive path.
    pub fn from_performance(perf: &SessionPerformance) -> AttemptPhase {
        if perf.total_answered == 0 {
            AttemptPhase::NotStarted
        } else {
            AttemptPhase::InProgress
        }
    }

    pub fn on_question_fetch(self) -> Result<AttemptPhase, EngineError> {
        match self {
            AttemptPhase::NotStarted | AttemptPhase::InProgress => Ok(AttemptPhase::InProgress),
            AttemptPhase::Completed => Err(EngineError::validation(
                "attempt already completed",
                "session",
            )),
        }
    }

    pub fn on_submit(self) -> Result<AttemptPhase, EngineError> {
        match self {
            AttemptPhase::NotStarted | AttemptPhase::InProgress => Ok(AttemptPhase::Completed),
            AttemptPhase::Completed => Err(EngineError::validation(
                "attempt already completed",
                "session",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_valid() {
        assert!(SessionPerformance::default().validate().is_ok());
    }

    #[test]
    fn rejects_inconsistent_counters() {
        let perf = SessionPerformance {
            total_answered: 2,
            correct_count: 3,
            ..Default::default()
        };
        assert!(perf.validate().is_err());
    }

    #[test]
    fn completed_attempt_rejects_further_fetches() {
        assert!(AttemptPhase::Completed.on_question_fetch().is_err());
        assert_eq!(
            AttemptPhase::NotStarted.on_question_fetch().unwrap(),
            AttemptPhase::InProgress
        );
    }

    #[test]
    fn submit_completes_once_and_only_once() {
        let phase = AttemptPhase::InProgress.on_submit().unwrap();
        assert_eq!(phase, AttemptPhase::Completed);
        assert!(phase.on_submit().is_err());
    }
}
