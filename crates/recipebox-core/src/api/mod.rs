//! REST API client module for the recipebox service.
//!
//! Requests flow through a decorator pipeline composed when the client is
//! built: `BearerAuth` attaches the session token, `SessionGuard` clears the
//! session on 401, and `ApiClient` normalizes every failure into `ApiError`.
//!
//! Endpoint groups (`auth`, `recipes`, `comments`, `users`) are thin
//! route mappings over that pipeline.

pub mod auth;
pub mod client;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod recipes;
pub mod transport;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::AuthApi;
pub use client::{ApiClient, DEFAULT_TIMEOUT};
pub use comments::CommentsApi;
pub use error::{ApiError, ErrorKind, FieldErrors, TransportError};
pub use middleware::{BearerAuth, SessionGuard};
pub use recipes::RecipesApi;
pub use transport::{
    ApiRequest, ApiResponse, FilePart, HttpMethod, HttpTransport, MultipartForm, RequestBody,
    Transport,
};
pub use users::UsersApi;
