//! Shared test doubles for the posts API.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fresca::application::posts::PostsApi;
use fresca::domain::entities::PostId;
use fresca::infra::http::ApiError;
use fresca_api_types::PostPayload;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::sync::Notify;
use url::Url;

/// The canonical one-post listing used across tests.
pub fn fixture_posts() -> Value {
    json!([{"id": 1, "title": "hello", "desc": "test desc"}])
}

/// Scripted [`PostsApi`]: list calls pop responses front to back, mutations
/// echo their input and count invocations. An `Err(code)` entry surfaces as
/// an http status error.
pub struct StubPostsApi {
    responses: Mutex<VecDeque<Result<Value, u16>>>,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl StubPostsApi {
    pub fn new(responses: Vec<Result<Value, u16>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Make every list call wait for a [`Notify`] permit before responding.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Result<Value, ApiError> {
        let scripted = self
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Ok(json!([])));
        scripted.map_err(status_error)
    }
}

pub fn status_error(code: u16) -> ApiError {
    ApiError::Status {
        status: StatusCode::from_u16(code).expect("valid status code"),
        url: Url::parse("http://stub.local/posts").expect("stub url"),
    }
}

#[async_trait]
impl PostsApi for StubPostsApi {
    async fn list(&self) -> Result<Value, ApiError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.next_response()
    }

    async fn create(&self, payload: &PostPayload) -> Result<Value, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut created = payload.clone();
        if created.id.is_none() {
            created.id = Some(101);
        }
        Ok(serde_json::to_value(created).expect("payload encodes"))
    }

    async fn update(&self, id: PostId, payload: &PostPayload) -> Result<Value, ApiError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut updated = payload.clone();
        updated.id = Some(id);
        Ok(serde_json::to_value(updated).expect("payload encodes"))
    }

    async fn remove(&self, _id: PostId) -> Result<(), ApiError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
