//! API client for the recipebox REST API.
//!
//! `ApiClient` owns the composed request pipeline and is the normalization
//! boundary: whatever goes wrong below it, callers receive an `ApiError`.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::ApiError;
use super::middleware::{BearerAuth, SessionGuard};
use super::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
use super::{AuthApi, CommentsApi, RecipesApi, UsersApi};
use crate::auth::SessionStore;

/// Fixed per-request ceiling. There is no retry; a timed-out request is
/// reported once as a network error.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared API client. Clone is cheap: the pipeline and session are both
/// reference counted.
#[derive(Clone)]
pub struct ApiClient {
    pipeline: Arc<dyn Transport>,
    session: SessionStore,
}

impl ApiClient {
    /// Build a client over reqwest for `base_url`, bound to `session`.
    pub fn new(base_url: &str, session: SessionStore) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(base_url, DEFAULT_TIMEOUT)?;
        debug!(base_url = transport.base_url(), "API client created");
        Ok(Self::with_transport(transport, session))
    }

    /// Build a client over any send primitive. The session middleware is
    /// layered on top here, so every transport gets the same behavior.
    pub fn with_transport<T: Transport + 'static>(transport: T, session: SessionStore) -> Self {
        let authed = BearerAuth::new(transport, session.clone());
        let guarded = SessionGuard::new(authed, session.clone());
        Self {
            pipeline: Arc::new(guarded),
            session,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn recipes(&self) -> RecipesApi<'_> {
        RecipesApi::new(self)
    }

    pub fn comments(&self) -> CommentsApi<'_> {
        CommentsApi::new(self)
    }

    pub fn users(&self) -> UsersApi<'_> {
        UsersApi::new(self)
    }

    /// Send a request through the pipeline. Non-2xx responses and transport
    /// failures come back as `ApiError`; successful responses are untouched.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let method = request.method;
        let path = request.path.clone();

        match self.pipeline.send(request).await {
            Ok(response) if response.is_success() => {
                debug!(%method, path = %path, status = response.status, "Request succeeded");
                Ok(response)
            }
            Ok(response) => {
                let err = ApiError::from_response(response.status, &response.body);
                warn!(%method, path = %path, status = response.status, message = %err.message, "Request failed");
                Err(err)
            }
            Err(transport_err) => {
                warn!(%method, path = %path, error = %transport_err, "Request not completed");
                Err(transport_err.into())
            }
        }
    }

    /// Send and decode a JSON response body.
    pub(crate) async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        serde_json::from_str(&response.body).map_err(|e| {
            warn!(path = %path, error = %e, "Failed to parse response");
            ApiError::unexpected(format!("Invalid response from {}: {}", path, e))
        })
    }

    /// Send and discard the response body.
    pub(crate) async fn execute(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }
}
