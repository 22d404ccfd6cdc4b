//! Session layer: per-connection state and reconnect tokens.
//!
//! A session is the gateway's record of one live socket — which player it
//! speaks for and which room it is joined to. Reconnect tokens are the
//! identity that outlives the socket: an opaque 128-bit secret, persisted
//! with a 24-hour expiry, that lets a fresh connection reclaim its player
//! record after a network drop.

mod error;
mod session;
mod token;

pub use error::SessionError;
pub use session::{Session, SessionIdAllocator};
pub use token::{generate_token, ReconnectToken, TOKEN_TTL_SECS};
