mod common;

use std::sync::Arc;

use common::{test_config, RecordingAlerts, RecordingNotifier, StubCatalog, StubGenerator};
use tutor_engine::engine::NextQuestionRequest;
use tutor_engine::{Difficulty, Engine, ErrorKind, SessionPerformance};

fn engine_with_generator(generator: StubGenerator) -> Engine {
    Engine::new(
        test_config(),
        Arc::new(StubCatalog::new()),
        Arc::new(generator),
        Arc::new(RecordingAlerts::new()),
        Arc::new(RecordingNotifier::new()),
    )
}

fn request(perf: SessionPerformance, current: Difficulty) -> NextQuestionRequest {
    NextQuestionRequest {
        lesson_id: "lesson-1".to_string(),
        learner_id: "learner-1".to_string(),
        current_difficulty: current,
        session_performance: perf,
    }
}

#[tokio::test]
async fn serves_question_with_adaptation_and_context() {
    let generator = StubGenerator::new();
    let requests = generator.requests.clone();
    let engine = engine_with_generator(generator);

    let perf = SessionPerformance {
        total_answered: 2,
        correct_count: 2,
        consecutive_correct: 2,
        consecutive_wrong: 0,
        answered_question_ids: vec!["gen-q1".to_string(), "gen-q2".to_string()],
        difficulty_history: vec![Difficulty::Easy, Difficulty::Easy],
    };
    let response = engine
        .next_question(request(perf, Difficulty::Easy))
        .await
        .unwrap();

    // Two correct in a row from easy: escalate to medium.
    assert_eq!(response.adaptation.previous_difficulty, Difficulty::Easy);
    assert_eq!(response.adaptation.current_difficulty, Difficulty::Medium);
    assert!(response.adaptation.difficulty_changed);

    assert_eq!(response.context.subject, "math");
    assert_eq!(response.context.lesson_title, "Fractions");
    assert_eq!(response.context.grade_level, 4);
    assert_eq!(response.context.question_number, 3);
    assert_eq!(response.question.difficulty, Difficulty::Medium);

    // The generator saw the target difficulty and the served-question ids.
    let seen = requests.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].target_difficulty, Difficulty::Medium);
    assert_eq!(seen[0].exclude_question_ids.len(), 2);
    assert_eq!(seen[0].question_number, 3);
}

#[tokio::test]
async fn replaying_the_same_request_gives_the_same_decision() {
    let engine = engine_with_generator(StubGenerator::new());
    let perf = SessionPerformance {
        total_answered: 4,
        correct_count: 1,
        consecutive_correct: 0,
        consecutive_wrong: 2,
        ..Default::default()
    };

    let first = engine
        .next_question(request(perf.clone(), Difficulty::Medium))
        .await
        .unwrap();
    let second = engine
        .next_question(request(perf, Difficulty::Medium))
        .await
        .unwrap();

    assert_eq!(
        first.adaptation.current_difficulty,
        second.adaptation.current_difficulty
    );
    assert_eq!(first.adaptation.reason, second.adaptation.reason);
}

#[tokio::test]
async fn generator_failure_is_transient_and_retryable() {
    let engine = engine_with_generator(StubGenerator::failing());
    let err = engine
        .next_question(request(SessionPerformance::default(), Difficulty::Medium))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transient);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unknown_lesson_and_inconsistent_counters_are_rejected() {
    let engine = engine_with_generator(StubGenerator::new());

    let mut bad_lesson = request(SessionPerformance::default(), Difficulty::Medium);
    bad_lesson.lesson_id = "lesson-404".to_string();
    let err = engine.next_question(bad_lesson).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let perf = SessionPerformance {
        total_answered: 1,
        correct_count: 2,
        ..Default::default()
    };
    let err = engine
        .next_question(request(perf, Difficulty::Medium))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn denied_access_is_rejected() {
    let mut catalog = StubCatalog::new();
    catalog
        .denied
        .insert(("learner-1".to_string(), "lesson-1".to_string()));
    let engine = Engine::new(
        test_config(),
        Arc::new(catalog),
        Arc::new(StubGenerator::new()),
        Arc::new(RecordingAlerts::new()),
        Arc::new(RecordingNotifier::new()),
    );

    let err = engine
        .next_question(request(SessionPerformance::default(), Difficulty::Medium))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}
