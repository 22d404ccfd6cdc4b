//! Three-die hand evaluation and comparison.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{ScoringError, HAND_SIZE};

/// The rank of a three-die hand, weakest first.
///
/// Derived `Ord` follows declaration order, so `Single < Double < Straight
/// < Triple` — comparing ranks directly gives the right answer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandRank {
    Single,
    Double,
    Straight,
    Triple,
}

/// An evaluated three-die hand.
///
/// `primary`/`secondary`/`tertiary` are the tie-break values in comparison
/// order; unused slots are 0 so lexicographic comparison stays total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedHand {
    pub rank: HandRank,
    pub primary: u8,
    pub secondary: u8,
    pub tertiary: u8,
    /// Human-readable summary, e.g. "Straight to 5" or "Pair of 4s, 6 kicker".
    pub description: String,
}

impl EvaluatedHand {
    /// The comparison key: rank first, then the three tie-break values.
    fn key(&self) -> (HandRank, u8, u8, u8) {
        (self.rank, self.primary, self.secondary, self.tertiary)
    }
}

impl PartialOrd for EvaluatedHand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EvaluatedHand {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Evaluates a hand of exactly three die faces.
///
/// Classification, on the values sorted ascending as (low, mid, high):
/// - all equal → Triple
/// - consecutive run → Straight (only 1-2-3 .. 4-5-6; no wrap-around)
/// - two equal → Double (pair value primary, kicker secondary)
/// - otherwise → Single (high, mid, low)
///
/// The input order never matters and the input is not mutated.
pub fn evaluate_hand(values: &[u8]) -> Result<EvaluatedHand, ScoringError> {
    if values.len() != HAND_SIZE {
        return Err(ScoringError::WrongHandSize(values.len()));
    }
    if let Some(&bad) = values.iter().find(|v| !(1..=6).contains(*v)) {
        return Err(ScoringError::FaceOutOfRange(bad));
    }

    let mut sorted = [values[0], values[1], values[2]];
    sorted.sort_unstable();
    let [low, mid, high] = sorted;

    let hand = if low == mid && mid == high {
        EvaluatedHand {
            rank: HandRank::Triple,
            primary: high,
            secondary: 0,
            tertiary: 0,
            description: format!("Triple {high}s"),
        }
    } else if mid == low + 1 && high == mid + 1 {
        EvaluatedHand {
            rank: HandRank::Straight,
            primary: high,
            secondary: 0,
            tertiary: 0,
            description: format!("Straight to {high}"),
        }
    } else if low == mid {
        EvaluatedHand {
            rank: HandRank::Double,
            primary: low,
            secondary: high,
            tertiary: 0,
            description: format!("Pair of {low}s, {high} kicker"),
        }
    } else if mid == high {
        EvaluatedHand {
            rank: HandRank::Double,
            primary: high,
            secondary: low,
            tertiary: 0,
            description: format!("Pair of {high}s, {low} kicker"),
        }
    } else {
        EvaluatedHand {
            rank: HandRank::Single,
            primary: high,
            secondary: mid,
            tertiary: low,
            description: format!("High {high}-{mid}-{low}"),
        }
    };

    Ok(hand)
}
