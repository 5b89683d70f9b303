//! Scripted transport and fixtures shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::error::TransportError;
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::auth::{SessionData, SessionStore};
use crate::models::User;

enum Scripted {
    Response(ApiResponse),
    Failure(TransportError),
}

/// Records every request and replays scripted outcomes in order.
/// Once the script runs out, requests fail as unreachable.
#[derive(Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    sent: Arc<Mutex<Vec<ApiRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, status: u16, body: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Response(ApiResponse {
                status,
                body: body.to_string(),
            }));
    }

    pub fn fail(&self, err: TransportError) {
        self.script.lock().unwrap().push_back(Scripted::Failure(err));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ApiRequest {
        self.sent.lock().unwrap().last().cloned().expect("no request sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.sent.lock().unwrap().push(request);
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Failure(err)) => Err(err),
            None => Err(TransportError::Unreachable("script exhausted".to_string())),
        }
    }
}

pub fn sample_user() -> User {
    serde_json::from_str(r#"{"id":"u1","name":"Ada","email":"ada@example.com"}"#)
        .expect("valid user json")
}

/// In-memory session already holding `token` and `sample_user()`.
pub fn sample_session(token: &str) -> SessionStore {
    let session = SessionStore::in_memory();
    session.load_persisted();
    session
        .establish(SessionData {
            token: token.to_string(),
            user: sample_user(),
        })
        .expect("memory storage never fails");
    session
}
