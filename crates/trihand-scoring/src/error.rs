//! Error types for the scoring kernel.

/// Errors for malformed scoring inputs.
///
/// These are programmer/validation errors, not game-rule errors: a hand
/// that reaches the evaluator has already passed selection validation, so
/// in practice these only fire in tests and on misuse.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    /// A hand must contain exactly three dice.
    #[error("hand must contain exactly 3 dice, got {0}")]
    WrongHandSize(usize),

    /// Die faces are 1 through 6.
    #[error("die face {0} out of range 1-6")]
    FaceOutOfRange(u8),

    /// Placements and prediction tables are defined for 2-6 players.
    #[error("unsupported player count {0}")]
    PlayerCount(usize),
}
