#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tutor_engine::collaborators::{
    AlertSink, BadgeAwardedNotice, GeneratedQuestion, LessonCatalog, LessonInfo, LowScoreAlert,
    NotificationDispatcher, QuestionGenerator, QuestionOption, QuestionRequest,
    QuizCompletedNotice,
};
use tutor_engine::quiz::{QuizDefinition, QuizQuestion};
use tutor_engine::{Difficulty, EngineConfig};

static DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique data directory per test so parallel tests never share state.
pub fn temp_data_dir() -> PathBuf {
    let unique = format!(
        "tutor_engine_test_{}_{}",
        std::process::id(),
        DIR_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    std::env::temp_dir().join(unique)
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        data_dir: temp_data_dir(),
        ..EngineConfig::default()
    }
}

pub struct StubCatalog {
    pub lessons: HashMap<String, LessonInfo>,
    pub quizzes: HashMap<String, QuizDefinition>,
    pub learners: HashSet<String>,
    pub denied: HashSet<(String, String)>,
}

impl StubCatalog {
    pub fn new() -> Self {
        let mut lessons = HashMap::new();
        lessons.insert(
            "lesson-1".to_string(),
            LessonInfo {
                lesson_id: "lesson-1".to_string(),
                subject: "math".to_string(),
                title: "Fractions".to_string(),
                content: "Adding and comparing fractions.".to_string(),
                grade_level: 4,
            },
        );
        let mut quizzes = HashMap::new();
        quizzes.insert("quiz-1".to_string(), five_question_quiz());
        let mut learners = HashSet::new();
        learners.insert("learner-1".to_string());
        StubCatalog {
            lessons,
            quizzes,
            learners,
            denied: HashSet::new(),
        }
    }
}

#[async_trait]
impl LessonCatalog for StubCatalog {
    async fn lesson(&self, lesson_id: &str) -> anyhow::Result<Option<LessonInfo>> {
        Ok(self.lessons.get(lesson_id).cloned())
    }

    async fn quiz(&self, quiz_id: &str) -> anyhow::Result<Option<QuizDefinition>> {
        Ok(self.quizzes.get(quiz_id).cloned())
    }

    async fn learner_exists(&self, learner_id: &str) -> anyhow::Result<bool> {
        Ok(self.learners.contains(learner_id))
    }

    async fn can_access(&self, learner_id: &str, lesson_id: &str) -> anyhow::Result<bool> {
        Ok(!self
            .denied
            .contains(&(learner_id.to_string(), lesson_id.to_string())))
    }
}

/// Deterministic generator: option "a" is always correct, difficulty echoes
/// the requested target. `fail: true` simulates an unavailable generator.
pub struct StubGenerator {
    pub fail: bool,
    pub requests: Arc<Mutex<Vec<QuestionRequest>>>,
}

impl StubGenerator {
    pub fn new() -> Self {
        StubGenerator {
            fail: false,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        StubGenerator {
            fail: true,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl QuestionGenerator for StubGenerator {
    async fn generate(&self, request: &QuestionRequest) -> anyhow::Result<GeneratedQuestion> {
        if self.fail {
            anyhow::bail!("generator offline");
        }
        self.requests.lock().push(request.clone());
        Ok(GeneratedQuestion {
            question_id: format!("gen-q{}", request.question_number),
            prompt: format!("Question {}", request.question_number),
            options: vec![
                QuestionOption {
                    option_id: "a".to_string(),
                    text: "Right".to_string(),
                },
                QuestionOption {
                    option_id: "b".to_string(),
                    text: "Wrong".to_string(),
                },
            ],
            correct_option_id: "a".to_string(),
            explanation: "Because it is.".to_string(),
            difficulty: request.target_difficulty,
            topic: request.weak_topics.first().cloned(),
        })
    }
}

#[derive(Clone)]
pub struct RecordingAlerts {
    pub alerts: Arc<Mutex<Vec<LowScoreAlert>>>,
}

impl RecordingAlerts {
    pub fn new() -> Self {
        RecordingAlerts {
            alerts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn low_quiz_score(&self, alert: LowScoreAlert) -> anyhow::Result<()> {
        self.alerts.lock().push(alert);
        Ok(())
    }
}

#[derive(Clone)]
pub struct RecordingNotifier {
    pub completions: Arc<Mutex<Vec<QuizCompletedNotice>>>,
    pub badges: Arc<Mutex<Vec<BadgeAwardedNotice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        RecordingNotifier {
            completions: Arc::new(Mutex::new(Vec::new())),
            badges: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn quiz_completed(&self, notice: QuizCompletedNotice) -> anyhow::Result<()> {
        self.completions.lock().push(notice);
        Ok(())
    }

    async fn badge_awarded(&self, notice: BadgeAwardedNotice) -> anyhow::Result<()> {
        self.badges.lock().push(notice);
        Ok(())
    }
}

pub fn question(id: &str, points: u32, topic: Option<&str>) -> QuizQuestion {
    QuizQuestion {
        question_id: id.to_string(),
        prompt: format!("prompt {}", id),
        options: vec![
            QuestionOption {
                option_id: "a".to_string(),
                text: "Right".to_string(),
            },
            QuestionOption {
                option_id: "b".to_string(),
                text: "Wrong".to_string(),
            },
        ],
        correct_option_id: "a".to_string(),
        points,
        difficulty: Difficulty::Medium,
        topic: topic.map(|t| t.to_string()),
    }
}

/// Five equal-weight questions, passing score 70, topics on q4/q5.
pub fn five_question_quiz() -> QuizDefinition {
    QuizDefinition {
        quiz_id: "quiz-1".to_string(),
        lesson_id: "lesson-1".to_string(),
        title: "Fractions check".to_string(),
        passing_score: 70,
        questions: vec![
            question("q1", 10, None),
            question("q2", 10, None),
            question("q3", 10, None),
            question("q4", 10, Some("comparing_fractions")),
            question("q5", 10, Some("adding_fractions")),
        ],
    }
}
