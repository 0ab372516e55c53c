use serde::{Deserialize, Serialize};

/// Accuracy rate at or above which a correct streak escalates difficulty.
const ESCALATE_RATE: f64 = 0.7;
/// Accuracy rate below which difficulty de-escalates regardless of streak.
const DEESCALATE_RATE: f64 = 0.4;
/// Below this rate a single wrong answer is enough to leave the hard tier.
const HARD_GUARD_RATE: f64 = 0.5;
/// Answered-question count at which overall accuracy starts to matter.
const RATE_PHASE_MIN_ANSWERED: u32 = 3;
/// Consecutive answers required to trigger a streak transition.
const STREAK_LEN: u32 = 2;

/// Ordered three-point difficulty scale for generated questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// One step harder, saturating at the top.
    pub fn step_up(self) -> Difficulty {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium | Difficulty::Hard => Difficulty::Hard,
        }
    }

    /// One step easier, saturating at the bottom.
    pub fn step_down(self) -> Difficulty {
        match self {
            Difficulty::Hard => Difficulty::Medium,
            Difficulty::Medium | Difficulty::Easy => Difficulty::Easy,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one adapter decision, including a human-readable rationale
/// for audit trails and UI display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adaptation {
    pub previous_difficulty: Difficulty,
    pub current_difficulty: Difficulty,
    pub difficulty_changed: bool,
    pub reason: String,
}

enum Decision {
    Escalate(u32),
    Deescalate(u32),
    Hold,
}

/// Decide the next question's target difficulty from session counters.
///
/// Pure and deterministic. Early in a session only streaks matter (they react
/// fast when there is no rate signal yet); once enough questions have been
/// answered the overall accuracy rate damps streak-driven oscillation.
pub fn next_difficulty(
    current: Difficulty,
    consecutive_correct: u32,
    consecutive_wrong: u32,
    total_answered: u32,
    correct_count: u32,
) -> Adaptation {
    let decision = if total_answered < RATE_PHASE_MIN_ANSWERED {
        if consecutive_correct >= STREAK_LEN {
            Decision::Escalate(consecutive_correct)
        } else if consecutive_wrong >= STREAK_LEN {
            Decision::Deescalate(consecutive_wrong)
        } else {
            Decision::Hold
        }
    } else {
        let rate = correct_count as f64 / total_answered as f64;
        if consecutive_correct >= STREAK_LEN && rate >= ESCALATE_RATE {
            Decision::Escalate(consecutive_correct)
        } else if consecutive_wrong >= STREAK_LEN || rate < DEESCALATE_RATE {
            Decision::Deescalate(consecutive_wrong)
        } else if current == Difficulty::Hard && consecutive_wrong >= 1 && rate < HARD_GUARD_RATE {
            // A lone lucky streak must not strand a struggling learner at hard.
            Decision::Deescalate(consecutive_wrong)
        } else {
            Decision::Hold
        }
    };

    let (next, reason) = match decision {
        Decision::Escalate(streak) => {
            let next = current.step_up();
            if next != current {
                (next, format!("leveled up after {} correct in a row", streak))
            } else {
                (current, format!("held at {}, already at the top", current))
            }
        }
        Decision::Deescalate(streak) => {
            let next = current.step_down();
            if next != current {
                if streak >= 1 {
                    (next, format!("leveled down after {} wrong in a row", streak))
                } else {
                    (next, "leveled down, session accuracy too low".to_string())
                }
            } else {
                (current, format!("held at {}, already at the bottom", current))
            }
        }
        Decision::Hold => (current, format!("held steady at {}", current)),
    };

    Adaptation {
        previous_difficulty: current,
        current_difficulty: next,
        difficulty_changed: next != current,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturates_at_both_ends() {
        assert_eq!(Difficulty::Hard.step_up(), Difficulty::Hard);
        assert_eq!(Difficulty::Easy.step_down(), Difficulty::Easy);
    }

    #[test]
    fn hard_guard_drops_after_single_wrong_when_rate_is_low() {
        // 4 of 10 correct, one wrong just now: leave hard immediately.
        let adaptation = next_difficulty(Difficulty::Hard, 0, 1, 10, 4);
        assert_eq!(adaptation.current_difficulty, Difficulty::Medium);
        assert!(adaptation.difficulty_changed);
    }

    #[test]
    fn single_wrong_at_hard_holds_when_rate_is_healthy() {
        let adaptation = next_difficulty(Difficulty::Hard, 0, 1, 10, 7);
        assert_eq!(adaptation.current_difficulty, Difficulty::Hard);
        assert!(!adaptation.difficulty_changed);
    }
}
