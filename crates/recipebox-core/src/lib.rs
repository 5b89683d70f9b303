//! Core library for the recipebox recipe-sharing client.
//!
//! This crate provides:
//! - `ApiClient`: the shared REST request pipeline (bearer token attachment,
//!   401-driven session invalidation, error normalization) and the feature
//!   endpoint groups layered on top of it
//! - `SessionStore`: the authenticated identity, persisted across restarts
//! - `Config`: API base URL and storage backend selection
//! - Data models for users, recipes and comments
//!
//! Every client call returns `Result<T, ApiError>`; `ApiError` is the single
//! normalized failure shape callers ever see.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod storage;

pub use api::{ApiClient, ApiError, ErrorKind};
pub use auth::{SessionData, SessionState, SessionStatus, SessionStore};
pub use config::{Config, StorageBackend};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, SessionStorage, StorageError};
