use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::quiz::{AnswerDetail, QuizDefinition};

/// Outcome of grading one submission, before any side effects.
#[derive(Debug, Clone)]
pub struct GradedSubmission {
    pub answers: Vec<AnswerDetail>,
    pub score: u32,
    pub total_points: u32,
    pub percentage: u32,
    pub passed: bool,
    pub is_perfect: bool,
    pub correct_count: u32,
    pub total_questions: u32,
    /// Longest correct run, in question order.
    pub best_correct_run: u32,
    /// Longest wrong run, in question order.
    pub best_wrong_run: u32,
}

/// Grade a submitted answer map against the quiz definition. Pure: compares
/// each selected option id to the option flagged correct and accumulates
/// point-weighted scores. A question absent from the map counts as wrong.
pub fn grade(quiz: &QuizDefinition, answer_map: &HashMap<String, String>) -> GradedSubmission {
    let mut answers = Vec::with_capacity(quiz.questions.len());
    let mut score = 0u32;
    let mut total_points = 0u32;
    let mut correct_count = 0u32;
    let mut correct_run = 0u32;
    let mut wrong_run = 0u32;
    let mut best_correct_run = 0u32;
    let mut best_wrong_run = 0u32;

    for question in &quiz.questions {
        let selected = answer_map.get(&question.question_id).cloned();
        let correct = selected.as_deref() == Some(question.correct_option_id.as_str());
        let earned = if correct { question.points } else { 0 };

        total_points += question.points;
        score += earned;
        if correct {
            correct_count += 1;
            correct_run += 1;
            wrong_run = 0;
            best_correct_run = best_correct_run.max(correct_run);
        } else {
            wrong_run += 1;
            correct_run = 0;
            best_wrong_run = best_wrong_run.max(wrong_run);
        }

        answers.push(AnswerDetail {
            question_id: question.question_id.clone(),
            selected_option_id: selected,
            correct_option_id: question.correct_option_id.clone(),
            correct,
            points: question.points,
            earned,
        });
    }

    // Degenerate zero-point quiz grades to 0 rather than dividing by zero.
    let percentage = if total_points == 0 {
        0
    } else {
        (score as f64 / total_points as f64 * 100.0).round() as u32
    };

    GradedSubmission {
        answers,
        score,
        total_points,
        percentage,
        passed: percentage >= quiz.passing_score,
        is_perfect: percentage == 100,
        correct_count,
        total_questions: quiz.questions.len() as u32,
        best_correct_run,
        best_wrong_run,
    }
}

/// Derive the attempt id from the triggering business event, so a retried
/// submit converges on the same attempt record and ledger keys while a
/// genuine new attempt (new startedAt) gets a fresh id.
pub fn attempt_key(learner_id: &str, quiz_id: &str, started_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(learner_id.as_bytes());
    hasher.update(b"|");
    hasher.update(quiz_id.as_bytes());
    hasher.update(b"|");
    hasher.update(started_at.timestamp_millis().to_be_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("att_{}", &digest[..32])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::QuestionOption;
    use crate::difficulty::Difficulty;
    use crate::quiz::QuizQuestion;

    fn question(id: &str, correct: &str, points: u32) -> QuizQuestion {
        QuizQuestion {
            question_id: id.to_string(),
            prompt: format!("prompt {}", id),
            options: vec![
                QuestionOption {
                    option_id: "a".to_string(),
                    text: "A".to_string(),
                },
                QuestionOption {
                    option_id: "b".to_string(),
                    text: "B".to_string(),
                },
            ],
            correct_option_id: correct.to_string(),
            points,
            difficulty: Difficulty::Medium,
            topic: None,
        }
    }

    fn quiz(passing_score: u32, questions: Vec<QuizQuestion>) -> QuizDefinition {
        QuizDefinition {
            quiz_id: "quiz-1".to_string(),
            lesson_id: "lesson-1".to_string(),
            title: "Fractions".to_string(),
            passing_score,
            questions,
        }
    }

    #[test]
    fn four_of_five_equal_weight_is_eighty_percent() {
        let quiz = quiz(
            70,
            (1..=5).map(|i| question(&format!("q{}", i), "a", 10)).collect(),
        );
        let mut answers = HashMap::new();
        for i in 1..=4 {
            answers.insert(format!("q{}", i), "a".to_string());
        }
        answers.insert("q5".to_string(), "b".to_string());

        let graded = grade(&quiz, &answers);
        assert_eq!(graded.percentage, 80);
        assert!(graded.passed);
        assert!(!graded.is_perfect);
        assert_eq!(graded.correct_count, 4);
        assert_eq!(graded.best_correct_run, 4);
        assert_eq!(graded.best_wrong_run, 1);
    }

    #[test]
    fn all_correct_is_perfect_regardless_of_passing_score() {
        let quiz = quiz(100, vec![question("q1", "a", 5), question("q2", "b", 5)]);
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), "a".to_string());
        answers.insert("q2".to_string(), "b".to_string());

        let graded = grade(&quiz, &answers);
        assert_eq!(graded.percentage, 100);
        assert!(graded.is_perfect);
        assert!(graded.passed);
    }

    #[test]
    fn missing_answers_count_as_wrong() {
        let quiz = quiz(50, vec![question("q1", "a", 10), question("q2", "a", 10)]);
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), "a".to_string());

        let graded = grade(&quiz, &answers);
        assert_eq!(graded.percentage, 50);
        assert_eq!(graded.answers[1].selected_option_id, None);
        assert!(!graded.answers[1].correct);
    }

    #[test]
    fn zero_point_quiz_grades_to_zero() {
        let quiz = quiz(70, vec![]);
        let graded = grade(&quiz, &HashMap::new());
        assert_eq!(graded.percentage, 0);
        assert!(!graded.passed);
    }

    #[test]
    fn attempt_key_is_stable_per_event() {
        let at = Utc::now();
        let a = attempt_key("l1", "quiz-1", at);
        let b = attempt_key("l1", "quiz-1", at);
        assert_eq!(a, b);
        let c = attempt_key("l1", "quiz-1", at + chrono::Duration::seconds(1));
        assert_ne!(a, c);
    }
}
