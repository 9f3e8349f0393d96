//! Ephemeral session credential.
//!
//! The manager owns the only copy of the token. Other components ask it for a
//! valid token before each remote call and pass that token along explicitly.

/// Session issuance and de-duplicated refresh.
pub mod manager;
/// Token persistence backends.
pub mod store;
/// Session value and expiry decoding.
pub mod token;

pub use manager::SessionManager;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::{Session, decode_expiry, now_ts};
