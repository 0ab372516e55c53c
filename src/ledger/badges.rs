use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::ledger::{BadgeAward, LearnerProfile};

/// Badge criteria as tagged predicates over a stats snapshot, so the badge
/// set stays data-driven instead of one bespoke function per badge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BadgeRule {
    XpAtLeast { amount: u64 },
    StreakAtLeast { days: u32 },
    MasteryAtLeast { level: u8 },
    AttemptsAtLeast { count: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub badge_id: String,
    pub name: String,
    pub description: String,
    pub rule: BadgeRule,
}

/// Snapshot of a learner's aggregate stats at evaluation time.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub xp: u64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub top_mastery: u8,
    pub total_attempts: u32,
}

impl BadgeRule {
    pub fn satisfied_by(&self, stats: &StatsSnapshot) -> bool {
        match self {
            BadgeRule::XpAtLeast { amount } => stats.xp >= *amount,
            BadgeRule::StreakAtLeast { days } => stats.current_streak >= *days,
            BadgeRule::MasteryAtLeast { level } => stats.top_mastery >= *level,
            BadgeRule::AttemptsAtLeast { count } => stats.total_attempts >= *count,
        }
    }
}

/// Evaluate the catalog against the snapshot and insert awards for every
/// satisfied badge the learner does not own yet. The owned-set check runs
/// under the learner's write lock, so a concurrent double-evaluation cannot
/// insert the same badge twice. Returns only the newly awarded badges.
pub fn evaluate(
    profile: &mut LearnerProfile,
    catalog: &[Badge],
    stats: &StatsSnapshot,
    at: DateTime<Utc>,
) -> Vec<Badge> {
    let mut newly_awarded = Vec::new();
    for badge in catalog {
        if profile.owns_badge(&badge.badge_id) {
            continue;
        }
        if badge.rule.satisfied_by(stats) {
            profile.badges.push(BadgeAward {
                badge_id: badge.badge_id.clone(),
                awarded_at: at,
            });
            newly_awarded.push(badge.clone());
        }
    }
    newly_awarded
}

fn badge(badge_id: &str, name: &str, description: &str, rule: BadgeRule) -> Badge {
    Badge {
        badge_id: badge_id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        rule,
    }
}

lazy_static! {
    /// Default badge catalog. Hosts can pass their own set at engine
    /// construction; criteria thresholds are data, not code.
    pub static ref DEFAULT_BADGES: Vec<Badge> = vec![
        badge(
            "first_attempt",
            "First Steps",
            "Complete your first quiz",
            BadgeRule::AttemptsAtLeast { count: 1 },
        ),
        badge(
            "quiz_veteran",
            "Quiz Veteran",
            "Complete 25 quizzes",
            BadgeRule::AttemptsAtLeast { count: 25 },
        ),
        badge(
            "xp_500",
            "Rising Star",
            "Earn 500 XP",
            BadgeRule::XpAtLeast { amount: 500 },
        ),
        badge(
            "xp_5000",
            "Scholar",
            "Earn 5,000 XP",
            BadgeRule::XpAtLeast { amount: 5000 },
        ),
        badge(
            "streak_3",
            "Warming Up",
            "Practice 3 days in a row",
            BadgeRule::StreakAtLeast { days: 3 },
        ),
        badge(
            "streak_14",
            "Habit Builder",
            "Practice 14 days in a row",
            BadgeRule::StreakAtLeast { days: 14 },
        ),
        badge(
            "mastery_80",
            "Subject Ace",
            "Reach mastery level 80 in any subject",
            BadgeRule::MasteryAtLeast { level: 80 },
        ),
        badge(
            "mastery_95",
            "Virtuoso",
            "Reach mastery level 95 in any subject",
            BadgeRule::MasteryAtLeast { level: 95 },
        ),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(xp: u64, streak: u32, mastery: u8, attempts: u32) -> StatsSnapshot {
        StatsSnapshot {
            xp,
            current_streak: streak,
            best_streak: streak,
            top_mastery: mastery,
            total_attempts: attempts,
        }
    }

    #[test]
    fn awards_are_unique_per_learner_and_badge() {
        let mut profile = LearnerProfile::new("l1");
        let now = Utc::now();
        let first = evaluate(&mut profile, &DEFAULT_BADGES, &stats(600, 0, 50, 1), now);
        assert!(first.iter().any(|b| b.badge_id == "first_attempt"));
        assert!(first.iter().any(|b| b.badge_id == "xp_500"));

        // Re-evaluating the same snapshot awards nothing new.
        let second = evaluate(&mut profile, &DEFAULT_BADGES, &stats(600, 0, 50, 1), now);
        assert!(second.is_empty());
    }

    #[test]
    fn thresholds_gate_each_rule() {
        let snapshot = stats(499, 2, 79, 0);
        assert!(!BadgeRule::XpAtLeast { amount: 500 }.satisfied_by(&snapshot));
        assert!(!BadgeRule::StreakAtLeast { days: 3 }.satisfied_by(&snapshot));
        assert!(!BadgeRule::MasteryAtLeast { level: 80 }.satisfied_by(&snapshot));
        assert!(!BadgeRule::AttemptsAtLeast { count: 1 }.satisfied_by(&snapshot));
    }
}
