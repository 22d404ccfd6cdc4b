//! Round-total predictions: availability, ranges, and bonuses.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// A player's prediction for their round total (set 1 + set 2, 0..=12).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Prediction {
    Zero,
    Min,
    More,
    Max,
}

/// Flat bonus for a ZERO prediction that lands.
const ZERO_BONUS: f64 = 40.0;

impl Prediction {
    /// The predictions offered for a given player count.
    ///
    /// MIN is not offered at 2 players — the 2P points table has no middle
    /// placements for it to cover.
    pub fn available(player_count: usize) -> &'static [Prediction] {
        if player_count == 2 {
            &[Prediction::Zero, Prediction::More, Prediction::Max]
        } else {
            &[
                Prediction::Zero,
                Prediction::Min,
                Prediction::More,
                Prediction::Max,
            ]
        }
    }

    /// The closed round-total range this prediction covers, by player count.
    ///
    /// Returns `None` for MIN at 2 players (not offered) and for player
    /// counts outside 2-6.
    pub fn range(self, player_count: usize) -> Option<RangeInclusive<u8>> {
        let range = match (self, player_count) {
            (Prediction::Zero, 2..=6) => 0..=0,

            (Prediction::Min, 3) => 3..=3,
            (Prediction::Min, 4..=6) => 1..=4,

            (Prediction::More, 2) => 6..=6,
            (Prediction::More, 3..=4) => 6..=9,
            (Prediction::More, 5) => 5..=8,
            (Prediction::More, 6) => 5..=9,

            (Prediction::Max, 2) => 12..=12,
            (Prediction::Max, 3..=6) => 10..=12,

            _ => return None,
        };
        Some(range)
    }

    /// The bonus earned for this prediction given the actual round total.
    ///
    /// A hit pays a flat 40 for ZERO and the round total itself for the
    /// others; a miss pays nothing. Fractional totals (from tie splits) hit
    /// a range only if they land inside its closed bounds.
    pub fn bonus(self, player_count: usize, round_total: f64) -> f64 {
        let Some(range) = self.range(player_count) else {
            return 0.0;
        };
        let lo = *range.start() as f64;
        let hi = *range.end() as f64;
        if round_total < lo || round_total > hi {
            return 0.0;
        }
        match self {
            Prediction::Zero => ZERO_BONUS,
            _ => round_total,
        }
    }
}
