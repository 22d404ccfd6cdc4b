//! Placement computation and per-placement points.

use crate::{EvaluatedHand, ScoringError};

/// Per-placement points, indexed by player count (2-6 players).
///
/// First place always earns 6, last place always 0; the middle of the table
/// varies with the field size.
const POINTS_BY_COUNT: [&[f64]; 5] = [
    &[6.0, 0.0],                     // 2 players
    &[6.0, 3.0, 0.0],                // 3 players
    &[6.0, 3.0, 1.0, 0.0],          // 4 players
    &[6.0, 4.0, 2.0, 1.0, 0.0],     // 5 players
    &[6.0, 4.0, 3.0, 2.0, 1.0, 0.0], // 6 players
];

/// Points for finishing at `placement` (1-based) among `player_count` players.
pub fn placement_points(player_count: usize, placement: usize) -> Result<f64, ScoringError> {
    let table = POINTS_BY_COUNT
        .get(player_count.wrapping_sub(2))
        .ok_or(ScoringError::PlayerCount(player_count))?;
    table
        .get(placement.wrapping_sub(1))
        .copied()
        .ok_or(ScoringError::PlayerCount(player_count))
}

/// One player's placement within a set.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement<K> {
    pub key: K,
    /// 1-based placement. Tied players share the same placement.
    pub placement: usize,
    /// Points earned. Fractional when a tie group splits a point range.
    pub points: f64,
}

/// Assigns placements and points for one set.
///
/// Hands are ranked descending. A tie group of size `t` starting at
/// placement `k` occupies placements `k..k+t-1` and each member earns the
/// even split of the points for those placements; the next group starts at
/// `k + t`. The input is left untouched.
pub fn assign_placements<K: Clone>(
    hands: &[(K, EvaluatedHand)],
) -> Result<Vec<Placement<K>>, ScoringError> {
    let player_count = hands.len();
    if player_count == 0 {
        return Ok(Vec::new());
    }

    let mut order: Vec<usize> = (0..player_count).collect();
    // Stable sort: equal hands keep input order, which keeps output
    // deterministic for tied groups.
    order.sort_by(|&a, &b| hands[b].1.cmp(&hands[a].1));

    let mut placements = Vec::with_capacity(player_count);
    let mut i = 0;
    while i < player_count {
        // Extend the tie group over every hand equal to the group leader.
        let mut j = i + 1;
        while j < player_count && hands[order[j]].1 == hands[order[i]].1 {
            j += 1;
        }

        let group = &order[i..j];
        let first_place = i + 1;
        let mut pool = 0.0;
        for place in first_place..first_place + group.len() {
            pool += placement_points(player_count, place)?;
        }
        let share = pool / group.len() as f64;

        for &idx in group {
            placements.push(Placement {
                key: hands[idx].0.clone(),
                placement: first_place,
                points: share,
            });
        }
        i = j;
    }

    Ok(placements)
}
