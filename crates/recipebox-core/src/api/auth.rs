//! `/auth` routes. Session bookkeeping lives in `SessionStore`; these are
//! the raw calls it makes.

use super::client::ApiClient;
use super::error::ApiError;
use super::transport::ApiRequest;
use crate::models::{AuthResponse, Credentials, Registration, TokenRefresh};

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let request = ApiRequest::post("/auth/login").json(credentials)?;
        self.client.fetch(request).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        let request = ApiRequest::post("/auth/register").json(registration)?;
        self.client.fetch(request).await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.client.execute(ApiRequest::post("/auth/logout")).await
    }

    pub async fn refresh(&self) -> Result<TokenRefresh, ApiError> {
        self.client.fetch(ApiRequest::post("/auth/refresh")).await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::MockTransport;
    use crate::api::{ApiClient, HttpMethod, RequestBody};
    use crate::auth::SessionStore;
    use crate::models::Credentials;

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"token":"t1","user":{"id":"u1","name":"A"}}"#);
        let client = ApiClient::with_transport(mock.clone(), SessionStore::in_memory());

        let resp = client
            .auth()
            .login(&Credentials::new("a@b.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(resp.token, "t1");

        let sent = mock.last_request();
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.path, "/auth/login");
        assert_eq!(
            sent.body,
            RequestBody::Json(serde_json::json!({ "email": "a@b.com", "password": "secret1" }))
        );
    }

    #[tokio::test]
    async fn test_logout_and_refresh_routes() {
        let mock = MockTransport::new();
        mock.respond(204, "");
        mock.respond(200, r#"{"token":"t2"}"#);
        let client = ApiClient::with_transport(mock.clone(), SessionStore::in_memory());

        client.auth().logout().await.unwrap();
        let refreshed = client.auth().refresh().await.unwrap();
        assert_eq!(refreshed.token, "t2");

        let paths: Vec<String> = mock.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/auth/logout", "/auth/refresh"]);
    }
}
