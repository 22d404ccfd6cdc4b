//! Results-acknowledgement tracking.

use std::collections::HashSet;

use trihand_protocol::PlayerId;

/// Tracks which players have acknowledged the results on display.
///
/// Completion is always judged against the *currently connected* players,
/// so a disconnect can never hold the room hostage — and can itself
/// complete the set if everyone still online has already acked.
#[derive(Debug, Default)]
pub struct AckTracker {
    acked: HashSet<PlayerId>,
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an ack. Returns `false` for a duplicate.
    pub fn insert(&mut self, player_id: PlayerId) -> bool {
        self.acked.insert(player_id)
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.acked.contains(&player_id)
    }

    pub fn count(&self) -> usize {
        self.acked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acked.is_empty()
    }

    /// Connected players who haven't acknowledged yet, in the given order.
    pub fn waiting_for(&self, connected: &[PlayerId]) -> Vec<PlayerId> {
        connected
            .iter()
            .filter(|id| !self.acked.contains(id))
            .copied()
            .collect()
    }

    /// Whether every connected player has acknowledged.
    pub fn is_complete(&self, connected: &[PlayerId]) -> bool {
        connected.iter().all(|id| self.acked.contains(id))
    }

    /// Resets for the next reveal/summary phase.
    pub fn clear(&mut self) {
        self.acked.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<PlayerId> {
        (0..n).map(|_| PlayerId::random()).collect()
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let players = ids(2);
        let mut tracker = AckTracker::new();
        assert!(tracker.insert(players[0]));
        assert!(!tracker.insert(players[0]));
        assert_eq!(tracker.count(), 1);
    }

    #[test]
    fn test_complete_over_connected_players_only() {
        let players = ids(3);
        let mut tracker = AckTracker::new();
        tracker.insert(players[0]);
        tracker.insert(players[1]);

        // players[2] never acks but is disconnected: complete.
        let connected = vec![players[0], players[1]];
        assert!(tracker.is_complete(&connected));
        // While they're connected: incomplete, and they're the holdout.
        let all = players.clone();
        assert!(!tracker.is_complete(&all));
        assert_eq!(tracker.waiting_for(&all), vec![players[2]]);
    }

    #[test]
    fn test_clear_resets_for_next_phase() {
        let players = ids(2);
        let mut tracker = AckTracker::new();
        tracker.insert(players[0]);
        tracker.clear();
        assert!(tracker.is_empty());
        assert!(tracker.insert(players[0]));
    }

    #[test]
    fn test_complete_with_no_connected_players() {
        // Degenerate case: nobody connected — vacuously complete, caller
        // decides whether to force-advance.
        let tracker = AckTracker::new();
        assert!(tracker.is_complete(&[]));
    }
}
