//! Turn-order computation.

/// Round-1 turn order: ascending by each player's 2d6 roll sum.
///
/// Lowest roll goes first. The sort is stable, so players tied on their
/// roll keep their input (join) order. The input is not mutated.
pub fn initial_turn_order<K: Clone>(rolls: &[(K, u8)]) -> Vec<K> {
    let mut order: Vec<usize> = (0..rolls.len()).collect();
    order.sort_by_key(|&i| rolls[i].1);
    order.into_iter().map(|i| rolls[i].0.clone()).collect()
}

/// Turn order for rounds after the first: cumulative score descending.
///
/// Ties break by position in the round-1 initial order (earlier wins);
/// players missing from that order sort after everyone present. The inputs
/// are not mutated.
pub fn next_round_turn_order<K: Clone + PartialEq>(
    scores: &[(K, f64)],
    initial_order: &[K],
) -> Vec<K> {
    let initial_pos = |key: &K| -> usize {
        initial_order
            .iter()
            .position(|k| k == key)
            .unwrap_or(usize::MAX)
    };

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .1
            .partial_cmp(&scores[a].1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| initial_pos(&scores[a].0).cmp(&initial_pos(&scores[b].0)))
    });
    order.into_iter().map(|i| scores[i].0.clone()).collect()
}
