pub mod scoring;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collaborators::QuestionOption;
use crate::difficulty::Difficulty;

/// One gradable question inside a quiz definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question_id: String,
    pub prompt: String,
    pub options: Vec<QuestionOption>,
    pub correct_option_id: String,
    pub points: u32,
    pub difficulty: Difficulty,
    /// Topic tag feeding the weak-area tracker; untagged questions skip it.
    pub topic: Option<String>,
}

/// Quiz definition supplied by the catalog. The engine grades against it but
/// never stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDefinition {
    pub quiz_id: String,
    pub lesson_id: String,
    pub title: String,
    /// Pass threshold as a percentage.
    pub passing_score: u32,
    pub questions: Vec<QuizQuestion>,
}

/// Per-question grading detail, echoed in the result and kept in the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    pub question_id: String,
    pub selected_option_id: Option<String>,
    pub correct_option_id: String,
    pub correct: bool,
    pub points: u32,
    pub earned: u32,
}

/// Immutable record of one graded submission. Written exactly once; the
/// record's presence is the replay guard for retried submits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub attempt_id: String,
    pub learner_id: String,
    pub quiz_id: String,
    pub lesson_id: String,
    pub score: u32,
    pub total_points: u32,
    pub percentage: u32,
    pub passed: bool,
    pub is_perfect: bool,
    pub correct_count: u32,
    pub total_questions: u32,
    pub answers: Vec<AnswerDetail>,
    /// Seconds the learner spent, as reported by the caller.
    pub time_spent: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub xp_earned: u64,
    pub new_badges: Vec<String>,
}

/// Result payload returned to the submitting caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub attempt_id: String,
    pub score: u32,
    pub total_points: u32,
    pub percentage: u32,
    pub passed: bool,
    pub is_perfect: bool,
    pub correct_count: u32,
    pub total_questions: u32,
    pub answers: Vec<AnswerDetail>,
    pub xp_earned: u64,
    pub new_badges: Vec<String>,
}

impl QuizAttempt {
    pub fn result(&self) -> AttemptResult {
        AttemptResult {
            attempt_id: self.attempt_id.clone(),
            score: self.score,
            total_points: self.total_points,
            percentage: self.percentage,
            passed: self.passed,
            is_perfect: self.is_perfect,
            correct_count: self.correct_count,
            total_questions: self.total_questions,
            answers: self.answers.clone(),
            xp_earned: self.xp_earned,
            new_badges: self.new_badges.clone(),
        }
    }
}
