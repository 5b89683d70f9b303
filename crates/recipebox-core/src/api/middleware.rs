//! Pipeline stages wrapped around the send primitive.
//!
//! Each stage is itself a `Transport`, so `ApiClient` composes them once at
//! construction: `SessionGuard(BearerAuth(inner))`.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::error::TransportError;
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::auth::SessionStore;

pub const AUTHORIZATION: &str = "Authorization";

/// Request phase: attaches the current session token as a bearer credential.
pub struct BearerAuth<T> {
    inner: T,
    session: SessionStore,
}

impl<T> BearerAuth<T> {
    pub fn new(inner: T, session: SessionStore) -> Self {
        Self { inner, session }
    }
}

#[async_trait]
impl<T: Transport> Transport for BearerAuth<T> {
    async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, TransportError> {
        match self.session.token() {
            Some(token) => request.set_header(AUTHORIZATION, format!("Bearer {}", token)),
            None => {
                debug!(path = %request.path, "No session token, sending unauthenticated");
                request.remove_header(AUTHORIZATION);
            }
        }
        self.inner.send(request).await
    }
}

/// Response phase: a 401 from any endpoint clears the session.
///
/// The response itself is passed on untouched so the caller still receives
/// a normalized error.
pub struct SessionGuard<T> {
    inner: T,
    session: SessionStore,
}

impl<T> SessionGuard<T> {
    pub fn new(inner: T, session: SessionStore) -> Self {
        Self { inner, session }
    }
}

#[async_trait]
impl<T: Transport> Transport for SessionGuard<T> {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let path = request.path.clone();
        let response = self.inner.send(request).await?;
        if response.status == 401 {
            warn!(path = %path, "Unauthorized response, clearing session");
            self.session.invalidate();
        }
        Ok(response)
    }
}
