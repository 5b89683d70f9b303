//! Session management for the authenticated user.
//!
//! This module provides:
//! - `SessionStore`: the current token and user, persisted through a
//!   `SessionStorage` backend and observable via `subscribe`
//! - `SessionState`: the snapshot readers see, where a token always comes
//!   with its user
//!
//! The store is shared by cloning. The API pipeline holds one handle and
//! clears the session when the server answers 401.

pub mod session;

pub use session::{SessionData, SessionState, SessionStatus, SessionStore, TOKEN_KEY, USER_KEY};
