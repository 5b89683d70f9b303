use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{AuthResponse, Credentials, Registration, User};
use crate::storage::{MemoryStorage, SessionStorage, StorageError};

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "authToken";

/// Storage key for the JSON user record
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Persisted state not loaded yet.
    Unknown,
    Authenticated,
    Unauthenticated,
}

/// Token and profile of a logged-in user. Always held together.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionData {
    pub token: String,
    pub user: User,
}

impl std::fmt::Debug for SessionData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionData")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// The session as readers see it. A token without a user (or the reverse)
/// is not representable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unknown,
    Unauthenticated,
    Authenticated(SessionData),
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Unknown => SessionStatus::Unknown,
            SessionState::Unauthenticated => SessionStatus::Unauthenticated,
            SessionState::Authenticated(_) => SessionStatus::Authenticated,
        }
    }

    pub fn data(&self) -> Option<&SessionData> {
        match self {
            SessionState::Authenticated(data) => Some(data),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.data().map(|d| d.token.as_str())
    }

    pub fn user(&self) -> Option<&User> {
        self.data().map(|d| &d.user)
    }
}

struct Inner {
    storage: Box<dyn SessionStorage>,
    /// Serializes mutations so storage and memory change as one step.
    write_lock: Mutex<()>,
    state: watch::Sender<SessionState>,
}

/// Who is logged in, backed by durable storage.
///
/// Cloning yields another handle to the same session. Mutations write
/// through to storage first and then publish the new state in one swap, so
/// readers never see a half-updated token/user pair. Concurrent
/// login/logout calls are applied in the order they finish: last write wins.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            inner: Arc::new(Inner {
                storage: Box::new(storage),
                write_lock: Mutex::new(()),
                state,
            }),
        }
    }

    /// Session that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    // ===== Reads =====

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().token().map(str::to_string)
    }

    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// Watch session changes, e.g. to return to a login screen after a 401.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    // ===== Lifecycle =====

    /// Read the persisted session. Never fails: unreadable or incomplete
    /// storage counts as "no session".
    ///
    /// Storage is only cleaned up when both keys were read and the pair is
    /// incomplete or corrupt. A failed read leaves storage as it is, so a
    /// temporarily locked keychain does not lose the session.
    pub fn load_persisted(&self) -> SessionStatus {
        let _guard = self.write_lock();
        let storage = &self.inner.storage;

        let state = match (storage.get(TOKEN_KEY), storage.get(USER_KEY)) {
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to read stored session, starting logged out");
                SessionState::Unauthenticated
            }
            (Ok(Some(token)), Ok(Some(user_json))) if !token.is_empty() => {
                match serde_json::from_str::<User>(&user_json) {
                    Ok(user) => SessionState::Authenticated(SessionData { token, user }),
                    Err(e) => {
                        warn!(error = %e, "Stored user record is unreadable, discarding session");
                        self.clear_storage();
                        SessionState::Unauthenticated
                    }
                }
            }
            (Ok(None), Ok(None)) => SessionState::Unauthenticated,
            (Ok(_), Ok(_)) => {
                debug!("Incomplete stored session, discarding");
                self.clear_storage();
                SessionState::Unauthenticated
            }
        };

        let status = state.status();
        info!(?status, "Session loaded");
        self.inner.state.send_replace(state);
        status
    }

    /// Log in. On failure the session is unchanged (except that a 401 always
    /// clears it) and the error is returned for display.
    pub async fn login(&self, client: &ApiClient, credentials: &Credentials) -> Result<(), ApiError> {
        credentials.validate()?;
        let response = client.auth().login(credentials).await?;
        self.accept(response)?;
        info!("Logged in");
        Ok(())
    }

    /// Create an account; the server answers with a token for it, so a
    /// successful registration is also a login.
    pub async fn register(&self, client: &ApiClient, registration: &Registration) -> Result<(), ApiError> {
        registration.validate()?;
        let response = client.auth().register(registration).await?;
        self.accept(response)?;
        info!("Registered and logged in");
        Ok(())
    }

    /// Tell the server (best effort), then clear the session no matter what
    /// the server said. Safe to call when already logged out.
    ///
    /// The request is skipped only when the session is known to be empty;
    /// before `load_persisted` has run (`Unknown`) it is still sent.
    pub async fn logout(&self, client: &ApiClient) {
        if self.status() != SessionStatus::Unauthenticated {
            if let Err(e) = client.auth().logout().await {
                warn!(error = %e, "Logout request failed, clearing local session anyway");
            }
        } else {
            debug!("No active session, skipping logout request");
        }
        self.invalidate();
        info!("Logged out");
    }

    /// Replace the stored profile; the token is untouched and nothing is
    /// sent to the server. Ignored without a session.
    pub fn update_profile(&self, user: User) {
        let _guard = self.write_lock();
        if self.inner.state.borrow().data().is_none() {
            warn!("Profile update without an active session, ignoring");
            return;
        }

        let persisted = serde_json::to_string(&user)
            .map_err(StorageError::from)
            .and_then(|json| self.inner.storage.set(USER_KEY, &json));
        if let Err(e) = persisted {
            warn!(error = %e, "Failed to persist profile update");
            return;
        }

        self.inner.state.send_modify(|state| {
            if let SessionState::Authenticated(data) = state {
                data.user = user;
            }
        });
        debug!("Profile updated");
    }

    /// Exchange the current token for a fresh one.
    pub async fn refresh(&self, client: &ApiClient) -> Result<(), ApiError> {
        if !self.is_authenticated() {
            return Err(ApiError::not_logged_in());
        }
        let refreshed = client.auth().refresh().await?;

        let _guard = self.write_lock();
        let current = self.inner.state.borrow().data().cloned();
        // Logged out while the request was in flight: do not resurrect.
        let Some(current) = current else {
            return Err(ApiError::not_logged_in());
        };
        let data = SessionData {
            token: refreshed.token,
            user: refreshed.user.unwrap_or(current.user),
        };
        self.persist_and_publish(data)
            .map_err(|e| ApiError::unexpected(format!("Failed to save session: {}", e)))?;
        debug!("Token refreshed");
        Ok(())
    }

    // ===== Narrow write interface =====

    /// Store a token/user pair and mark the session authenticated.
    pub fn establish(&self, data: SessionData) -> Result<(), StorageError> {
        let _guard = self.write_lock();
        self.persist_and_publish(data)
    }

    /// Clear token and user from storage and memory. Storage failures are
    /// logged; memory is cleared regardless.
    pub fn invalidate(&self) {
        let _guard = self.write_lock();
        self.clear_storage();
        let previous = self.inner.state.send_replace(SessionState::Unauthenticated);
        if previous.status() == SessionStatus::Authenticated {
            info!("Session cleared");
        }
    }

    // ===== Internals =====

    fn accept(&self, response: AuthResponse) -> Result<(), ApiError> {
        self.establish(SessionData {
            token: response.token,
            user: response.user,
        })
        .map_err(|e| {
            warn!(error = %e, "Failed to persist session");
            ApiError::unexpected(format!("Failed to save session: {}", e))
        })
    }

    /// Caller holds the write lock.
    fn persist_and_publish(&self, data: SessionData) -> Result<(), StorageError> {
        let storage = &self.inner.storage;
        let user_json = serde_json::to_string(&data.user)?;

        storage.set(TOKEN_KEY, &data.token)?;
        if let Err(e) = storage.set(USER_KEY, &user_json) {
            // Never leave a token without its user behind.
            if let Err(rollback) = storage.remove(TOKEN_KEY) {
                warn!(error = %rollback, "Failed to roll back stored token");
            }
            return Err(e);
        }

        self.inner.state.send_replace(SessionState::Authenticated(data));
        Ok(())
    }

    /// Caller holds the write lock.
    fn clear_storage(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.inner.storage.remove(key) {
                warn!(key, error = %e, "Failed to remove stored session key");
            }
        }
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.inner
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{sample_user, MockTransport};
    use crate::api::{ErrorKind, TransportError};

    /// Memory storage whose reads or writes to one key can be made to fail.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_reads_of: Option<&'static str>,
        fail_writes_to: Option<&'static str>,
    }

    impl SessionStorage for FlakyStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_reads_of == Some(key) {
                return Err(std::io::Error::other("keychain locked").into());
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes_to == Some(key) {
                return Err(std::io::Error::other("disk full").into());
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    fn stored_session() -> Arc<MemoryStorage> {
        Arc::new(MemoryStorage::with_entries([
            (TOKEN_KEY, "t0"),
            (USER_KEY, r#"{"id":"u1","name":"Ada"}"#),
        ]))
    }

    fn client_for(session: &SessionStore, mock: &MockTransport) -> ApiClient {
        ApiClient::with_transport(mock.clone(), session.clone())
    }

    #[test]
    fn test_starts_unknown() {
        let session = SessionStore::in_memory();
        assert_eq!(session.status(), SessionStatus::Unknown);
        assert!(session.token().is_none());
    }

    #[test]
    fn test_load_persisted_restores_session() {
        let session = SessionStore::new(stored_session());
        assert_eq!(session.load_persisted(), SessionStatus::Authenticated);
        assert_eq!(session.token().as_deref(), Some("t0"));
        assert_eq!(session.user().map(|u| u.name), Some("Ada".to_string()));
    }

    #[test]
    fn test_load_persisted_without_storage_is_unauthenticated() {
        let session = SessionStore::in_memory();
        assert_eq!(session.load_persisted(), SessionStatus::Unauthenticated);
    }

    #[test]
    fn test_load_persisted_discards_half_session() {
        let storage = Arc::new(MemoryStorage::with_entries([(TOKEN_KEY, "t0")]));
        let session = SessionStore::new(storage.clone());

        assert_eq!(session.load_persisted(), SessionStatus::Unauthenticated);
        assert!(storage.get(TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn test_load_persisted_discards_corrupt_user() {
        let storage = Arc::new(MemoryStorage::with_entries([
            (TOKEN_KEY, "t0"),
            (USER_KEY, "{broken"),
        ]));
        let session = SessionStore::new(storage.clone());

        assert_eq!(session.load_persisted(), SessionStatus::Unauthenticated);
        assert!(session.user().is_none());
        assert!(storage.get(USER_KEY).unwrap().is_none());
    }

    #[test]
    fn test_load_persisted_read_failure_keeps_stored_session() {
        let user_json = serde_json::to_string(&sample_user()).unwrap();
        let flaky = Arc::new(FlakyStorage {
            inner: MemoryStorage::with_entries([(TOKEN_KEY, "t0"), (USER_KEY, user_json.as_str())]),
            fail_reads_of: Some(TOKEN_KEY),
            ..Default::default()
        });
        let session = SessionStore::new(flaky.clone());

        assert_eq!(session.load_persisted(), SessionStatus::Unauthenticated);
        assert!(session.token().is_none());
        assert_eq!(flaky.inner.get(TOKEN_KEY).unwrap().as_deref(), Some("t0"));
        assert_eq!(flaky.inner.get(USER_KEY).unwrap(), Some(user_json.clone()));

        // Once the backend is readable again the session comes back.
        let recovered = SessionStore::new(MemoryStorage::with_entries([
            (TOKEN_KEY, "t0"),
            (USER_KEY, user_json.as_str()),
        ]));
        assert_eq!(recovered.load_persisted(), SessionStatus::Authenticated);
    }

    #[tokio::test]
    async fn test_login_persists_token_and_user() {
        let storage = Arc::new(MemoryStorage::new());
        let session = SessionStore::new(storage.clone());
        session.load_persisted();
        let mock = MockTransport::new();
        mock.respond(200, r#"{"token":"t1","user":{"id":"u1","name":"A"}}"#);
        let client = client_for(&session, &mock);

        session
            .login(&client, &Credentials::new("a@b.com", "secret1"))
            .await
            .unwrap();

        assert_eq!(session.status(), SessionStatus::Authenticated);
        assert_eq!(session.token().as_deref(), Some("t1"));
        assert_eq!(session.user().map(|u| u.id), Some("u1".to_string()));
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("t1"));
        let stored_user: User =
            serde_json::from_str(&storage.get(USER_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored_user.name, "A");
    }

    #[tokio::test]
    async fn test_login_failure_leaves_session_unchanged() {
        let session = SessionStore::new(stored_session());
        session.load_persisted();
        let mock = MockTransport::new();
        mock.respond(
            422,
            r#"{"message":"Invalid credentials","errors":{"email":"Unknown email"}}"#,
        );
        let client = client_for(&session, &mock);

        let err = session
            .login(&client, &Credentials::new("x@y.com", "secret1"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code, 422);
        assert_eq!(err.field_error("email"), Some("Unknown email"));
        assert_eq!(session.token().as_deref(), Some("t0"));
    }

    #[tokio::test]
    async fn test_login_validation_skips_network() {
        let session = SessionStore::in_memory();
        session.load_persisted();
        let mock = MockTransport::new();
        let client = client_for(&session, &mock);

        let err = session
            .login(&client, &Credentials::new("bad", ""))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(mock.requests().is_empty());
        assert_eq!(session.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_storage_failure_is_reported() {
        let session = SessionStore::new(FlakyStorage {
            fail_writes_to: Some(USER_KEY),
            ..Default::default()
        });
        session.load_persisted();
        let mock = MockTransport::new();
        mock.respond(200, r#"{"token":"t1","user":{"id":"u1","name":"A"}}"#);
        let client = client_for(&session, &mock);

        let err = session
            .login(&client, &Credentials::new("a@b.com", "secret1"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code, 0);
        assert!(err.message.starts_with("Failed to save session"));
        assert_eq!(session.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_register_authenticates_new_account() {
        let session = SessionStore::in_memory();
        session.load_persisted();
        let mock = MockTransport::new();
        mock.respond(201, r#"{"token":"fresh","user":{"_id":"u9","name":"Nia"}}"#);
        let client = client_for(&session, &mock);

        session
            .register(&client, &Registration::new("Nia", "nia@b.com", "secret1"))
            .await
            .unwrap();

        assert_eq!(session.token().as_deref(), Some("fresh"));
        assert_eq!(mock.last_request().path, "/auth/register");
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_server_fails() {
        let storage = stored_session();
        let session = SessionStore::new(storage.clone());
        session.load_persisted();
        let mock = MockTransport::new();
        mock.fail(TransportError::Unreachable("offline".to_string()));
        let client = client_for(&session, &mock);

        session.logout(&client).await;

        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert!(storage.get(TOKEN_KEY).unwrap().is_none());
        assert!(storage.get(USER_KEY).unwrap().is_none());
        let sent = mock.last_request();
        assert_eq!(sent.path, "/auth/logout");
        assert_eq!(sent.header("Authorization"), Some("Bearer t0"));
    }

    #[tokio::test]
    async fn test_logout_when_logged_out_is_a_no_op() {
        let session = SessionStore::in_memory();
        session.load_persisted();
        let mock = MockTransport::new();
        let client = client_for(&session, &mock);

        session.logout(&client).await;
        session.logout(&client).await;

        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_logout_before_load_still_notifies_server() {
        let storage = stored_session();
        let session = SessionStore::new(storage.clone());
        let mock = MockTransport::new();
        mock.respond(204, "");
        let client = client_for(&session, &mock);

        assert_eq!(session.status(), SessionStatus::Unknown);
        session.logout(&client).await;

        assert_eq!(mock.last_request().path, "/auth/logout");
        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert!(storage.get(TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn test_update_profile_keeps_token() {
        let storage = stored_session();
        let session = SessionStore::new(storage.clone());
        session.load_persisted();

        let mut user = sample_user();
        user.name = "Ada L.".to_string();
        session.update_profile(user);

        assert_eq!(session.status(), SessionStatus::Authenticated);
        assert_eq!(session.token().as_deref(), Some("t0"));
        assert_eq!(session.user().map(|u| u.name), Some("Ada L.".to_string()));
        assert!(storage.get(USER_KEY).unwrap().unwrap().contains("Ada L."));
    }

    #[test]
    fn test_update_profile_ignored_without_session() {
        let storage = Arc::new(MemoryStorage::new());
        let session = SessionStore::new(storage.clone());
        session.load_persisted();

        session.update_profile(sample_user());

        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert!(storage.get(USER_KEY).unwrap().is_none());
    }

    #[test]
    fn test_update_profile_storage_failure_keeps_old_user() {
        let user_json = serde_json::to_string(&sample_user()).unwrap();
        let session = SessionStore::new(FlakyStorage {
            inner: MemoryStorage::with_entries([(TOKEN_KEY, "t1"), (USER_KEY, user_json.as_str())]),
            fail_writes_to: Some(USER_KEY),
            ..Default::default()
        });
        session.load_persisted();

        let mut renamed = sample_user();
        renamed.name = "Changed".to_string();
        session.update_profile(renamed);

        assert_eq!(session.user().map(|u| u.name), Some("Ada".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_replaces_token_and_keeps_user() {
        let storage = stored_session();
        let session = SessionStore::new(storage.clone());
        session.load_persisted();
        let mock = MockTransport::new();
        mock.respond(200, r#"{"token":"t2"}"#);
        let client = client_for(&session, &mock);

        session.refresh(&client).await.unwrap();

        assert_eq!(session.token().as_deref(), Some("t2"));
        assert_eq!(session.user().map(|u| u.id), Some("u1".to_string()));
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("t2"));
        assert_eq!(mock.last_request().header("Authorization"), Some("Bearer t0"));
    }

    #[tokio::test]
    async fn test_refresh_requires_session() {
        let session = SessionStore::in_memory();
        session.load_persisted();
        let mock = MockTransport::new();
        let client = client_for(&session, &mock);

        let err = session.refresh(&client).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_observe_invalidation() {
        let session = SessionStore::new(stored_session());
        session.load_persisted();
        let mut rx = session.subscribe();
        rx.borrow_and_update();

        let mock = MockTransport::new();
        mock.respond(401, r#"{"message":"jwt expired"}"#);
        let client = client_for(&session, &mock);
        let _ = client.recipes().get("r1").await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status(), SessionStatus::Unauthenticated);
    }

    #[test]
    fn test_session_data_debug_redacts_token() {
        let data = SessionData {
            token: "secret-token".to_string(),
            user: sample_user(),
        };
        let debug = format!("{:?}", data);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("Ada"));
    }
}
