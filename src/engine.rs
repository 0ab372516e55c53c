use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::collaborators::{
    AlertSink, BadgeAwardedNotice, GeneratedQuestion, LessonCatalog, LessonInfo, LowScoreAlert,
    NotificationDispatcher, QuestionGenerator, QuestionRequest, QuizCompletedNotice,
};
use crate::config::EngineConfig;
use crate::difficulty::{next_difficulty, Adaptation, Difficulty};
use crate::error::EngineError;
use crate::ledger::badges::{evaluate, Badge, StatsSnapshot, DEFAULT_BADGES};
use crate::ledger::store::LedgerStore;
use crate::ledger::{apply_award, apply_streak, LearnerProfile, StreakUpdate};
use crate::mastery::store::MasteryStore;
use crate::mastery::MasteryState;
use crate::progress::{LessonProgress, ProgressStore};
use crate::quiz::scoring::{attempt_key, grade};
use crate::quiz::store::AttemptStore;
use crate::quiz::{AttemptResult, QuizAttempt};
use crate::session::{AttemptPhase, SessionPerformance};
use crate::state::EngineState;
use crate::store::WriteSet;
use crate::weak_areas::store::WeakAreaStore;
use crate::weak_areas::{WeakArea, WeakAreaSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextQuestionRequest {
    pub lesson_id: String,
    pub learner_id: String,
    pub current_difficulty: Difficulty,
    pub session_performance: SessionPerformance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionContext {
    pub subject: String,
    pub lesson_title: String,
    pub grade_level: u8,
    pub question_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextQuestionResponse {
    pub question: GeneratedQuestion,
    pub adaptation: Adaptation,
    pub context: QuestionContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmitRequest {
    pub quiz_id: String,
    pub lesson_id: String,
    pub learner_id: String,
    /// questionId -> selected optionId
    pub answers: HashMap<String, String>,
    pub time_spent: u32,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmitResponse {
    pub success: bool,
    pub result: AttemptResult,
}

/// The adaptive assessment & progression engine. Request/response and
/// stateless between adaptive-loop calls; all durable state goes through
/// the stores under per-learner write locks.
pub struct Engine {
    config: EngineConfig,
    state: Arc<EngineState>,
    ledger: LedgerStore,
    mastery: MasteryStore,
    weak_areas: WeakAreaStore,
    attempts: AttemptStore,
    progress: ProgressStore,
    badge_catalog: Vec<Badge>,
    catalog: Arc<dyn LessonCatalog>,
    generator: Arc<dyn QuestionGenerator>,
    alerts: Arc<dyn AlertSink>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        catalog: Arc<dyn LessonCatalog>,
        generator: Arc<dyn QuestionGenerator>,
        alerts: Arc<dyn AlertSink>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let state = Arc::new(EngineState::new(config.lesson_cache_size));
        Engine {
            ledger: LedgerStore::new(&config.data_dir),
            mastery: MasteryStore::new(&config.data_dir),
            weak_areas: WeakAreaStore::new(&config.data_dir),
            attempts: AttemptStore::new(&config.data_dir),
            progress: ProgressStore::new(&config.data_dir),
            badge_catalog: DEFAULT_BADGES.clone(),
            config,
            state,
            catalog,
            generator,
            alerts,
            notifier,
        }
    }

    /// Replace the default badge catalog.
    pub fn with_badge_catalog(mut self, badge_catalog: Vec<Badge>) -> Self {
        self.badge_catalog = badge_catalog;
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Serve the next question for a live session. Stateless: the running
    /// tally arrives with the request and the same inputs always produce the
    /// same difficulty decision, so the caller can safely retry.
    pub async fn next_question(
        &self,
        request: NextQuestionRequest,
    ) -> Result<NextQuestionResponse, EngineError> {
        request.session_performance.validate()?;
        self.require_learner(&request.learner_id).await?;
        let lesson = self.require_lesson(&request.lesson_id).await?;
        self.require_access(&request.learner_id, &request.lesson_id)
            .await?;

        let phase = AttemptPhase::from_performance(&request.session_performance);
        let next_phase = phase.on_question_fetch()?;
        if phase != next_phase {
            self.state.metrics.record_state_transition();
        }

        let perf = &request.session_performance;
        let adaptation = next_difficulty(
            request.current_difficulty,
            perf.consecutive_correct,
            perf.consecutive_wrong,
            perf.total_answered,
            perf.correct_count,
        );

        let weak_topics: Vec<String> = self
            .weak_areas
            .get(&request.learner_id, &lesson.subject)
            .await?
            .top_areas(self.config.weak_topic_hints)
            .into_iter()
            .map(|a| a.topic)
            .collect();

        let question_number = perf.total_answered + 1;
        let generation_request = QuestionRequest {
            subject: lesson.subject.clone(),
            grade_level: lesson.grade_level,
            lesson_title: lesson.title.clone(),
            lesson_content: lesson.content.clone(),
            target_difficulty: adaptation.current_difficulty,
            weak_topics,
            exclude_question_ids: perf.answered_question_ids.clone(),
            question_number,
        };

        let question = match self.generator.generate(&generation_request).await {
            Ok(question) => question,
            Err(e) => {
                self.state.metrics.record_generator_failure();
                return Err(EngineError::transient(
                    format!("Question generator failed: {}", e),
                    "generator",
                )
                .with_context(format!("lesson: {}", request.lesson_id)));
            }
        };

        self.state.metrics.record_question_served();
        tracing::debug!(
            learner = %request.learner_id,
            lesson = %request.lesson_id,
            difficulty = %adaptation.current_difficulty,
            changed = adaptation.difficulty_changed,
            question_number,
            "Question served"
        );

        Ok(NextQuestionResponse {
            question,
            adaptation,
            context: QuestionContext {
                subject: lesson.subject,
                lesson_title: lesson.title,
                grade_level: lesson.grade_level,
                question_number,
            },
        })
    }

    /// Grade a submitted quiz and commit every side effect as one durable
    /// unit: attempt record, lesson progress, mastery merge, ledger awards,
    /// badge evaluation. Replaying the same submission returns the stored
    /// result without applying anything twice.
    pub async fn submit_quiz(
        &self,
        request: QuizSubmitRequest,
    ) -> Result<QuizSubmitResponse, EngineError> {
        self.require_learner(&request.learner_id).await?;
        let quiz = self
            .catalog
            .quiz(&request.quiz_id)
            .await
            .map_err(|e| {
                EngineError::transient(format!("Catalog unavailable: {}", e), "catalog")
            })?
            .ok_or_else(|| {
                EngineError::validation(
                    format!("Unknown quiz: {}", request.quiz_id),
                    "submit",
                )
            })?;
        if quiz.lesson_id != request.lesson_id {
            return Err(EngineError::validation(
                "lessonId does not match the quiz's lesson",
                "submit",
            ));
        }
        let lesson = self.require_lesson(&request.lesson_id).await?;
        self.require_access(&request.learner_id, &request.lesson_id)
            .await?;
        for question_id in request.answers.keys() {
            if !quiz.questions.iter().any(|q| &q.question_id == question_id) {
                return Err(EngineError::validation(
                    format!("Answer for unknown question: {}", question_id),
                    "submit",
                ));
            }
        }

        let attempt_id = attempt_key(&request.learner_id, &request.quiz_id, request.started_at);
        let lock = self.state.learner_lock(&request.learner_id);
        let _guard = lock.lock().await;

        // Retried submission: the attempt is already committed, return it.
        if let Some(existing) = self.attempts.get(&attempt_id).await? {
            self.state.metrics.record_idempotent_replay();
            tracing::info!(
                learner = %request.learner_id,
                attempt = %attempt_id,
                "Replayed quiz submission, returning stored attempt"
            );
            return Ok(QuizSubmitResponse {
                success: true,
                result: existing.result(),
            });
        }
        self.state.metrics.record_state_transition();

        let graded = grade(&quiz, &request.answers);
        let completed_at = Utc::now();
        let activity_date = completed_at.date_naive();

        // Load server-authoritative current state. The prior values are kept
        // so the staged commit can roll back to exactly what was on disk.
        let prev_profile = self.ledger.get_opt(&request.learner_id).await?;
        let mut profile = prev_profile
            .clone()
            .unwrap_or_else(|| LearnerProfile::new(&request.learner_id));
        let prev_mastery = self
            .mastery
            .get(&request.learner_id, &lesson.subject, lesson.grade_level)
            .await?;
        let mut mastery = prev_mastery.clone().unwrap_or_else(|| {
            MasteryState::new(&request.learner_id, &lesson.subject, lesson.grade_level)
        });
        let prev_weak = self
            .weak_areas
            .get_opt(&request.learner_id, &lesson.subject)
            .await?;
        let mut weak_set = prev_weak
            .clone()
            .unwrap_or_else(|| WeakAreaSet::new(&request.learner_id, &lesson.subject));
        let prev_progress = self
            .progress
            .get_opt(&request.learner_id, &request.lesson_id)
            .await?;
        let mut progress = prev_progress
            .clone()
            .unwrap_or_else(|| LessonProgress::new(&request.learner_id, &request.lesson_id, completed_at));
        self.mastery.load_all_for(&request.learner_id).await?;

        // Ledger: attempt XP tier, then streak, then conditional bonus.
        let (base_amount, reason) = if graded.is_perfect {
            (self.config.xp.perfect, "perfect quiz")
        } else if graded.passed {
            (self.config.xp.pass, "quiz passed")
        } else {
            (self.config.xp.completion, "quiz completed")
        };
        let mut xp_earned = apply_award(
            &mut profile,
            base_amount,
            reason,
            &format!("attempt:{}", attempt_id),
            completed_at,
        );
        let streak = apply_streak(&mut profile, activity_date);
        if streak.streak_updated && streak.current_streak > 1 {
            xp_earned += apply_award(
                &mut profile,
                self.config.xp.streak_bonus,
                "daily streak bonus",
                &format!("streak:{}:{}", request.learner_id, activity_date),
                completed_at,
            );
        }

        // Mastery merge, seeded difficulty for the next session.
        let final_difficulty = quiz
            .questions
            .last()
            .map(|q| q.difficulty)
            .unwrap_or(mastery.current_difficulty);
        mastery.commit_session(
            graded.total_questions,
            graded.correct_count,
            final_difficulty,
            graded.best_correct_run,
            &self.config.mastery,
        );

        // Weak areas, per topic-tagged question.
        for (question, answer) in quiz.questions.iter().zip(graded.answers.iter()) {
            if let Some(topic) = &question.topic {
                weak_set.record_outcome(
                    topic,
                    answer.correct,
                    completed_at,
                    self.config.weak_area_resolve_run,
                );
            }
        }

        progress.record_attempt(graded.percentage, graded.passed, completed_at);

        // Badges, against the post-award aggregate snapshot.
        let snapshot = StatsSnapshot {
            xp: profile.xp,
            current_streak: profile.current_streak,
            best_streak: profile.best_streak,
            top_mastery: self
                .mastery
                .max_level_for(&request.learner_id)
                .max(mastery.mastery_level),
            total_attempts: profile.attempt_count(),
        };
        let newly_awarded = evaluate(&mut profile, &self.badge_catalog, &snapshot, completed_at);

        let attempt = QuizAttempt {
            attempt_id: attempt_id.clone(),
            learner_id: request.learner_id.clone(),
            quiz_id: request.quiz_id.clone(),
            lesson_id: request.lesson_id.clone(),
            score: graded.score,
            total_points: graded.total_points,
            percentage: graded.percentage,
            passed: graded.passed,
            is_perfect: graded.is_perfect,
            correct_count: graded.correct_count,
            total_questions: graded.total_questions,
            answers: graded.answers.clone(),
            time_spent: request.time_spent,
            started_at: request.started_at,
            completed_at,
            xp_earned,
            new_badges: newly_awarded.iter().map(|b| b.badge_id.clone()).collect(),
        };

        // Stage and commit the whole unit; a failed write rolls everything
        // back and leaves the in-memory views untouched.
        let mut writes = WriteSet::new();
        writes.stage(self.attempts.path_for(&attempt_id), &attempt, None)?;
        writes.stage(
            self.ledger.path_for(&request.learner_id),
            &profile,
            prev_profile.as_ref(),
        )?;
        writes.stage(
            self.mastery
                .path_for(&request.learner_id, &lesson.subject, lesson.grade_level),
            &mastery,
            prev_mastery.as_ref(),
        )?;
        writes.stage(
            self.weak_areas.path_for(&request.learner_id, &lesson.subject),
            &weak_set,
            prev_weak.as_ref(),
        )?;
        writes.stage(
            self.progress.path_for(&request.learner_id, &request.lesson_id),
            &progress,
            prev_progress.as_ref(),
        )?;
        writes.commit().await?;

        self.attempts.apply(attempt.clone());
        self.ledger.apply(profile);
        self.mastery.apply(mastery);
        self.weak_areas.apply(weak_set);
        self.progress.apply(progress);

        self.state.metrics.record_submission();
        self.state.metrics.record_xp_awarded(xp_earned);
        self.state
            .metrics
            .record_badges_awarded(newly_awarded.len() as u64);

        tracing::info!(
            learner = %request.learner_id,
            quiz = %request.quiz_id,
            attempt = %attempt_id,
            percentage = graded.percentage,
            passed = graded.passed,
            perfect = graded.is_perfect,
            xp = xp_earned,
            badges = newly_awarded.len(),
            streak = streak.current_streak,
            "Quiz submission committed"
        );

        self.dispatch_post_commit(&request, &lesson, &attempt, &newly_awarded);

        Ok(QuizSubmitResponse {
            success: true,
            result: attempt.result(),
        })
    }

    /// Stored mastery state, or `None` when the learner has not committed a
    /// session for this subject/grade yet.
    pub async fn mastery(
        &self,
        learner_id: &str,
        subject: &str,
        grade_level: u8,
    ) -> Result<Option<MasteryState>, EngineError> {
        self.mastery.get(learner_id, subject, grade_level).await
    }

    /// Worst unresolved topics for the pair, for generator targeting.
    pub async fn weak_areas(
        &self,
        learner_id: &str,
        subject: &str,
        limit: usize,
    ) -> Result<Vec<WeakArea>, EngineError> {
        Ok(self.weak_areas.get(learner_id, subject).await?.top_areas(limit))
    }

    pub async fn profile(&self, learner_id: &str) -> Result<LearnerProfile, EngineError> {
        self.ledger.get(learner_id).await
    }

    /// Award XP outside the quiz path (host-driven events). Atomic and
    /// idempotent: a duplicate key returns the current total unchanged.
    pub async fn award_xp(
        &self,
        learner_id: &str,
        amount: u64,
        reason: &str,
        idempotency_key: &str,
    ) -> Result<u64, EngineError> {
        let lock = self.state.learner_lock(learner_id);
        let _guard = lock.lock().await;

        let prev = self.ledger.get_opt(learner_id).await?;
        let mut profile = prev
            .clone()
            .unwrap_or_else(|| LearnerProfile::new(learner_id));
        let credited = apply_award(&mut profile, amount, reason, idempotency_key, Utc::now());
        if credited == 0 {
            return Ok(profile.xp);
        }

        let mut writes = WriteSet::new();
        writes.stage(self.ledger.path_for(learner_id), &profile, prev.as_ref())?;
        writes.commit().await?;
        let total = profile.xp;
        self.ledger.apply(profile);
        self.state.metrics.record_xp_awarded(credited);
        Ok(total)
    }

    /// Advance the learner's daily streak for activity on `activity_date`.
    pub async fn update_streak(
        &self,
        learner_id: &str,
        activity_date: NaiveDate,
    ) -> Result<StreakUpdate, EngineError> {
        let lock = self.state.learner_lock(learner_id);
        let _guard = lock.lock().await;

        let prev = self.ledger.get_opt(learner_id).await?;
        let mut profile = prev
            .clone()
            .unwrap_or_else(|| LearnerProfile::new(learner_id));
        let update = apply_streak(&mut profile, activity_date);
        if !update.streak_updated {
            return Ok(update);
        }

        let mut writes = WriteSet::new();
        writes.stage(self.ledger.path_for(learner_id), &profile, prev.as_ref())?;
        writes.commit().await?;
        self.ledger.apply(profile);
        Ok(update)
    }

    /// Evaluate the badge catalog for the learner and persist any new awards.
    pub async fn check_and_award_badges(
        &self,
        learner_id: &str,
    ) -> Result<Vec<Badge>, EngineError> {
        let lock = self.state.learner_lock(learner_id);
        let _guard = lock.lock().await;

        let prev = self.ledger.get_opt(learner_id).await?;
        let mut profile = prev
            .clone()
            .unwrap_or_else(|| LearnerProfile::new(learner_id));
        let top_mastery = self.mastery.load_all_for(learner_id).await?;
        let snapshot = StatsSnapshot {
            xp: profile.xp,
            current_streak: profile.current_streak,
            best_streak: profile.best_streak,
            top_mastery,
            total_attempts: profile.attempt_count(),
        };
        let newly_awarded = evaluate(&mut profile, &self.badge_catalog, &snapshot, Utc::now());
        if newly_awarded.is_empty() {
            return Ok(newly_awarded);
        }

        let mut writes = WriteSet::new();
        writes.stage(self.ledger.path_for(learner_id), &profile, prev.as_ref())?;
        writes.commit().await?;
        self.ledger.apply(profile);
        self.state
            .metrics
            .record_badges_awarded(newly_awarded.len() as u64);
        Ok(newly_awarded)
    }

    /// Fire-and-forget facts to the alerting sink and the notification
    /// dispatcher; failures are logged and never fail the primary response.
    fn dispatch_post_commit(
        &self,
        request: &QuizSubmitRequest,
        lesson: &LessonInfo,
        attempt: &QuizAttempt,
        newly_awarded: &[Badge],
    ) {
        let metrics = self.state.metrics.clone();

        if attempt.percentage < self.config.low_score_alert_threshold {
            let alerts = self.alerts.clone();
            let alert = LowScoreAlert::new(
                request.learner_id.clone(),
                lesson.title.clone(),
                attempt.percentage,
            );
            let metrics = metrics.clone();
            tokio::spawn(async move {
                if let Err(e) = alerts.low_quiz_score(alert).await {
                    metrics.record_dispatch_failure();
                    tracing::warn!(error = %e, "Low-score alert dispatch failed");
                }
            });
        }

        let notifier = self.notifier.clone();
        let notice = QuizCompletedNotice {
            learner_id: request.learner_id.clone(),
            lesson_title: lesson.title.clone(),
            percentage: attempt.percentage,
            passed: attempt.passed,
        };
        let badge_notices: Vec<BadgeAwardedNotice> = newly_awarded
            .iter()
            .map(|badge| BadgeAwardedNotice {
                learner_id: request.learner_id.clone(),
                badge_id: badge.badge_id.clone(),
                badge_name: badge.name.clone(),
            })
            .collect();
        tokio::spawn(async move {
            if let Err(e) = notifier.quiz_completed(notice).await {
                metrics.record_dispatch_failure();
                tracing::warn!(error = %e, "Quiz-completed notification failed");
            }
            for notice in badge_notices {
                if let Err(e) = notifier.badge_awarded(notice).await {
                    metrics.record_dispatch_failure();
                    tracing::warn!(error = %e, "Badge notification failed");
                }
            }
        });
    }

    async fn require_learner(&self, learner_id: &str) -> Result<(), EngineError> {
        let exists = self
            .catalog
            .learner_exists(learner_id)
            .await
            .map_err(|e| {
                EngineError::transient(format!("Catalog unavailable: {}", e), "catalog")
            })?;
        if !exists {
            return Err(EngineError::validation(
                format!("Unknown learner: {}", learner_id),
                "request",
            ));
        }
        Ok(())
    }

    async fn require_lesson(&self, lesson_id: &str) -> Result<LessonInfo, EngineError> {
        if let Some(lesson) = self.state.cached_lesson(lesson_id) {
            return Ok(lesson);
        }
        let lesson = self
            .catalog
            .lesson(lesson_id)
            .await
            .map_err(|e| {
                EngineError::transient(format!("Catalog unavailable: {}", e), "catalog")
            })?
            .ok_or_else(|| {
                EngineError::validation(format!("Unknown lesson: {}", lesson_id), "request")
            })?;
        self.state.cache_lesson(lesson.clone());
        Ok(lesson)
    }

    async fn require_access(&self, learner_id: &str, lesson_id: &str) -> Result<(), EngineError> {
        let allowed = self
            .catalog
            .can_access(learner_id, lesson_id)
            .await
            .map_err(|e| {
                EngineError::transient(format!("Catalog unavailable: {}", e), "catalog")
            })?;
        if !allowed {
            return Err(EngineError::validation(
                format!("Learner {} may not access lesson {}", learner_id, lesson_id),
                "request",
            ));
        }
        Ok(())
    }
}
