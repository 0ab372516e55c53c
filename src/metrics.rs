use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Prometheus-style counters for observability.
/// All metrics are atomic for thread-safety.
#[derive(Clone, Default)]
pub struct Metrics {
    /// Questions served through the adaptive loop
    pub questions_served: Arc<AtomicU64>,
    /// Quiz submissions committed
    pub submissions_total: Arc<AtomicU64>,
    /// Submissions answered from the existing attempt record
    pub idempotent_replays: Arc<AtomicU64>,
    /// XP credited across all learners (sum)
    pub xp_awarded_total: Arc<AtomicU64>,
    /// Badge awards inserted
    pub badges_awarded_total: Arc<AtomicU64>,
    /// Question generator failures surfaced to callers
    pub generator_failures: Arc<AtomicU64>,
    /// Alert/notification dispatch failures (swallowed)
    pub dispatch_failures: Arc<AtomicU64>,
    /// Attempt state transitions
    pub state_transitions: Arc<AtomicU64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_question_served(&self) {
        self.questions_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission(&self) {
        self.submissions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_idempotent_replay(&self) {
        self.idempotent_replays.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_xp_awarded(&self, amount: u64) {
        self.xp_awarded_total.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn record_badges_awarded(&self, count: u64) {
        self.badges_awarded_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_generator_failure(&self) {
        self.generator_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch_failure(&self) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_state_transition(&self) {
        self.state_transitions.fetch_add(1, Ordering::Relaxed);
    }
}
