pub mod badges;
pub mod store;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One applied XP award. The idempotency key is derived from the triggering
/// business event (a specific attempt id, a specific calendar-day streak
/// bonus) and guards at-most-once application under retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub key: String,
    pub amount: u64,
    pub reason: String,
    pub applied_at: DateTime<Utc>,
}

/// The (learner, badge) ownership fact; unique per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeAward {
    pub badge_id: String,
    pub awarded_at: DateTime<Utc>,
}

/// Durable gamification state for one learner. Mutated only through the
/// ledger operations, always under the learner's write lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: String,
    pub xp: u64,
    /// Derived from xp; monotonic.
    pub level: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub events: Vec<LedgerEvent>,
    pub badges: Vec<BadgeAward>,
}

impl LearnerProfile {
    pub fn new(learner_id: &str) -> Self {
        LearnerProfile {
            learner_id: learner_id.to_string(),
            xp: 0,
            level: 1,
            current_streak: 0,
            best_streak: 0,
            last_activity_date: None,
            events: Vec::new(),
            badges: Vec::new(),
        }
    }

    pub fn has_event(&self, key: &str) -> bool {
        self.events.iter().any(|e| e.key == key)
    }

    pub fn owns_badge(&self, badge_id: &str) -> bool {
        self.badges.iter().any(|b| b.badge_id == badge_id)
    }

    /// Graded quiz attempts are exactly the ledger events keyed by attempt.
    pub fn attempt_count(&self) -> u32 {
        self.events
            .iter()
            .filter(|e| e.key.starts_with("attempt:"))
            .count() as u32
    }
}

/// Cumulative XP required to reach a level. Quadratic so early levels come
/// quickly and later ones stretch out; monotonic by construction.
pub fn xp_for_level(level: u32) -> u64 {
    let n = level as u64;
    50 * n.saturating_sub(1) * n
}

pub fn level_for_xp(xp: u64) -> u32 {
    let mut level = 1;
    while xp >= xp_for_level(level + 1) {
        level += 1;
    }
    level
}

/// Apply one XP award to the profile. Returns the credited amount: 0 when
/// the idempotency key was already applied (the profile is left unchanged).
pub fn apply_award(
    profile: &mut LearnerProfile,
    amount: u64,
    reason: &str,
    key: &str,
    at: DateTime<Utc>,
) -> u64 {
    if profile.has_event(key) {
        return 0;
    }
    profile.events.push(LedgerEvent {
        key: key.to_string(),
        amount,
        reason: reason.to_string(),
        applied_at: at,
    });
    profile.xp += amount;
    profile.level = level_for_xp(profile.xp);
    amount
}

/// Result of a streak update; `streak_updated` signals callers that a
/// streak-bonus award may apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakUpdate {
    pub streak_updated: bool,
    pub current_streak: u32,
}

/// Advance the daily streak for activity on the given calendar date.
/// Same day: no-op. Exactly the next day: increment. Anything else
/// (first-ever activity, or a gap of 2+ days): reset to 1.
pub fn apply_streak(profile: &mut LearnerProfile, activity_date: NaiveDate) -> StreakUpdate {
    match profile.last_activity_date {
        Some(last) if last == activity_date => StreakUpdate {
            streak_updated: false,
            current_streak: profile.current_streak,
        },
        Some(last) if last.succ_opt() == Some(activity_date) => {
            profile.current_streak += 1;
            profile.best_streak = profile.best_streak.max(profile.current_streak);
            profile.last_activity_date = Some(activity_date);
            StreakUpdate {
                streak_updated: true,
                current_streak: profile.current_streak,
            }
        }
        _ => {
            profile.current_streak = 1;
            profile.best_streak = profile.best_streak.max(1);
            profile.last_activity_date = Some(activity_date);
            StreakUpdate {
                streak_updated: true,
                current_streak: 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn level_curve_is_monotonic() {
        let mut last = 0;
        for level in 1..=50 {
            let xp = xp_for_level(level);
            assert!(xp >= last);
            last = xp;
            assert_eq!(level_for_xp(xp), level);
        }
        assert_eq!(level_for_xp(0), 1);
    }

    #[test]
    fn duplicate_award_key_is_a_no_op() {
        let mut profile = LearnerProfile::new("l1");
        let now = Utc::now();
        assert_eq!(apply_award(&mut profile, 50, "quiz", "attempt:a1", now), 50);
        assert_eq!(apply_award(&mut profile, 50, "quiz", "attempt:a1", now), 0);
        assert_eq!(profile.xp, 50);
        assert_eq!(profile.events.len(), 1);
    }

    #[test]
    fn streak_increments_resets_and_ignores_same_day() {
        let mut profile = LearnerProfile::new("l1");

        let update = apply_streak(&mut profile, day(1));
        assert!(update.streak_updated);
        assert_eq!(update.current_streak, 1);

        let update = apply_streak(&mut profile, day(2));
        assert!(update.streak_updated);
        assert_eq!(update.current_streak, 2);

        // same day again: no-op
        let update = apply_streak(&mut profile, day(2));
        assert!(!update.streak_updated);
        assert_eq!(update.current_streak, 2);

        // skipped day 3: reset
        let update = apply_streak(&mut profile, day(4));
        assert!(update.streak_updated);
        assert_eq!(update.current_streak, 1);
        assert_eq!(profile.best_streak, 2);
    }
}
