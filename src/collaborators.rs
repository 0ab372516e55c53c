use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::difficulty::Difficulty;
use crate::quiz::QuizDefinition;

/// Lesson metadata supplied by the course/lesson catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonInfo {
    pub lesson_id: String,
    pub subject: String,
    pub title: String,
    pub content: String,
    pub grade_level: u8,
}

/// Parameterization handed to the external question generator. The engine
/// never inspects or stores question content beyond what it needs to grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    pub subject: String,
    pub grade_level: u8,
    pub lesson_title: String,
    pub lesson_content: String,
    pub target_difficulty: Difficulty,
    pub weak_topics: Vec<String>,
    pub exclude_question_ids: Vec<String>,
    pub question_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub option_id: String,
    pub text: String,
}

/// One generated question with enough structure to grade it later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question_id: String,
    pub prompt: String,
    pub options: Vec<QuestionOption>,
    pub correct_option_id: String,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub topic: Option<String>,
}

/// Low-score alert fact, fire-and-forget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowScoreAlert {
    pub learner_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub lesson_title: String,
    pub score: u32,
}

impl LowScoreAlert {
    pub fn new(learner_id: String, lesson_title: String, score: u32) -> Self {
        LowScoreAlert {
            learner_id,
            kind: "LOW_QUIZ_SCORE".to_string(),
            lesson_title,
            score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizCompletedNotice {
    pub learner_id: String,
    pub lesson_title: String,
    pub percentage: u32,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeAwardedNotice {
    pub learner_id: String,
    pub badge_id: String,
    pub badge_name: String,
}

/// Course/lesson catalog. Also answers the identity/permission questions the
/// engine validates before touching any state.
#[async_trait]
pub trait LessonCatalog: Send + Sync {
    async fn lesson(&self, lesson_id: &str) -> anyhow::Result<Option<LessonInfo>>;
    async fn quiz(&self, quiz_id: &str) -> anyhow::Result<Option<QuizDefinition>>;
    async fn learner_exists(&self, learner_id: &str) -> anyhow::Result<bool>;
    async fn can_access(&self, learner_id: &str, lesson_id: &str) -> anyhow::Result<bool>;
}

/// External question-content generator. No retry policy here: a failure is
/// surfaced to the caller as a transient error with no question returned.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, request: &QuestionRequest) -> anyhow::Result<GeneratedQuestion>;
}

/// Alerting sink for low-score facts. Delivery failures are swallowed.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn low_quiz_score(&self, alert: LowScoreAlert) -> anyhow::Result<()>;
}

/// Push/notification dispatcher. Delivery and throttling are its concern.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn quiz_completed(&self, notice: QuizCompletedNotice) -> anyhow::Result<()>;
    async fn badge_awarded(&self, notice: BadgeAwardedNotice) -> anyhow::Result<()>;
}
