//! Hand-rolled posts store: explicit actions, a pure reducer and thunk-style
//! refresh. Unlike the query cache it never caches across refreshes; every
//! call hits the transport.

use std::sync::{Arc, RwLock};

use metrics::counter;
use tracing::{debug, warn};

use crate::application::posts::{decode_posts, PostsApi};
use crate::cache::lock::{rw_read, rw_write};
use crate::cache::QueryError;
use crate::domain::collection::NormalizedCollection;
use crate::domain::entities::{PostId, PostRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Failed,
}

impl FetchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchStatus::Idle => "idle",
            FetchStatus::Loading => "loading",
            FetchStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostsAction {
    Pending,
    Fulfilled(Vec<PostRecord>),
    Rejected(String),
    /// Replace-by-merge without a request, for locally known data.
    Set(Vec<PostRecord>),
}

impl PostsAction {
    fn label(&self) -> &'static str {
        match self {
            PostsAction::Pending => "pending",
            PostsAction::Fulfilled(_) => "fulfilled",
            PostsAction::Rejected(_) => "rejected",
            PostsAction::Set(_) => "set",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostsState {
    pub posts: NormalizedCollection<PostRecord>,
    pub status: FetchStatus,
    pub error: Option<String>,
}

/// Pure transition function. Rejected keeps whatever entities were already
/// loaded; only the status and error change.
pub fn reduce(state: &mut PostsState, action: PostsAction) {
    match action {
        PostsAction::Pending => {
            state.status = FetchStatus::Loading;
            state.error = None;
        }
        PostsAction::Fulfilled(posts) => {
            state.posts.upsert_many(posts);
            state.status = FetchStatus::Idle;
            state.error = None;
        }
        PostsAction::Rejected(message) => {
            state.status = FetchStatus::Failed;
            state.error = Some(message);
        }
        PostsAction::Set(posts) => {
            state.posts.upsert_many(posts);
            state.status = FetchStatus::Idle;
        }
    }
}

pub struct PostsStore {
    api: Arc<dyn PostsApi>,
    state: RwLock<PostsState>,
}

impl PostsStore {
    pub fn new(api: Arc<dyn PostsApi>) -> Self {
        Self {
            api,
            state: RwLock::new(PostsState::default()),
        }
    }

    pub fn dispatch(&self, action: PostsAction) {
        debug!(action = action.label(), "posts store action");
        let mut state = rw_write(&self.state, "posts_store", "dispatch");
        reduce(&mut state, action);
    }

    /// Fetch the full list and merge it in. Always issues a request, even
    /// when the store already holds data.
    pub async fn refresh(&self) -> Result<usize, QueryError> {
        counter!("fresca_store_refresh_total").increment(1);
        self.dispatch(PostsAction::Pending);
        let raw = match self.api.list().await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "posts refresh failed");
                let err = QueryError::from(err);
                self.dispatch(PostsAction::Rejected(err.to_string()));
                return Err(err);
            }
        };
        let posts = match decode_posts(raw) {
            Ok(posts) => posts,
            Err(err) => {
                warn!(error = %err, "posts refresh returned an unusable body");
                self.dispatch(PostsAction::Rejected(err.to_string()));
                return Err(err);
            }
        };
        let count = posts.len();
        self.dispatch(PostsAction::Fulfilled(posts));
        Ok(count)
    }

    pub fn status(&self) -> FetchStatus {
        rw_read(&self.state, "posts_store", "status").status
    }

    pub fn error(&self) -> Option<String> {
        rw_read(&self.state, "posts_store", "error").error.clone()
    }

    pub fn select_all(&self) -> Vec<PostRecord> {
        let state = rw_read(&self.state, "posts_store", "select_all");
        state.posts.iter().cloned().collect()
    }

    pub fn select_ids(&self) -> Vec<PostId> {
        rw_read(&self.state, "posts_store", "select_ids")
            .posts
            .ids()
            .to_vec()
    }

    pub fn select_by_id(&self, id: PostId) -> Option<PostRecord> {
        rw_read(&self.state, "posts_store", "select_by_id")
            .posts
            .get(&id)
            .cloned()
    }

    pub fn select_total(&self) -> usize {
        rw_read(&self.state, "posts_store", "select_total").posts.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use fresca_api_types::PostPayload;
    use serde_json::{json, Value};

    use super::*;
    use crate::infra::http::ApiError;

    #[test]
    fn reducer_walks_the_documented_transitions() {
        let mut state = PostsState::default();
        assert_eq!(state.status, FetchStatus::Idle);

        reduce(&mut state, PostsAction::Pending);
        assert_eq!(state.status, FetchStatus::Loading);

        reduce(
            &mut state,
            PostsAction::Fulfilled(vec![PostRecord::new(1, "hello", "test desc")]),
        );
        assert_eq!(state.status, FetchStatus::Idle);
        assert_eq!(state.posts.ids(), &[1]);

        reduce(&mut state, PostsAction::Pending);
        reduce(&mut state, PostsAction::Rejected("boom".to_string()));
        assert_eq!(state.status, FetchStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("boom"));
        assert_eq!(state.posts.ids(), &[1], "rejection keeps loaded entities");
    }

    #[test]
    fn set_merges_without_touching_a_failure_message() {
        let mut state = PostsState::default();
        reduce(&mut state, PostsAction::Rejected("boom".to_string()));
        reduce(
            &mut state,
            PostsAction::Set(vec![PostRecord::new(2, "two", "")]),
        );
        assert_eq!(state.status, FetchStatus::Idle);
        assert_eq!(state.posts.ids(), &[2]);
        assert_eq!(
            state.error.as_deref(),
            Some("boom"),
            "direct sets do not clear a previous error"
        );
    }

    struct ScriptedApi {
        responses: Mutex<Vec<Result<Value, ApiError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(responses: Vec<Result<Value, ApiError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PostsApi for ScriptedApi {
        async fn list(&self) -> Result<Value, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses.lock().expect("responses lock").remove(0)
        }
        async fn create(&self, _payload: &PostPayload) -> Result<Value, ApiError> {
            unimplemented!("store only lists")
        }
        async fn update(&self, _id: PostId, _payload: &PostPayload) -> Result<Value, ApiError> {
            unimplemented!("store only lists")
        }
        async fn remove(&self, _id: PostId) -> Result<(), ApiError> {
            unimplemented!("store only lists")
        }
    }

    #[tokio::test]
    async fn refresh_always_issues_a_request() {
        let api = Arc::new(ScriptedApi::new(vec![
            Ok(json!([{"id": 1, "title": "hello", "desc": "test desc"}])),
            Ok(json!([
                {"id": 1, "title": "hello", "desc": "test desc"},
                {"id": 2, "title": "second", "desc": ""},
            ])),
        ]));
        let store = PostsStore::new(Arc::clone(&api) as Arc<dyn PostsApi>);

        assert_eq!(store.refresh().await.expect("first refresh"), 1);
        assert_eq!(store.refresh().await.expect("second refresh"), 2);
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.select_ids(), vec![1, 2]);
        assert_eq!(store.select_total(), 2);
        assert_eq!(
            store.select_by_id(2).map(|p| p.title),
            Some("second".to_string())
        );
        assert_eq!(store.status(), FetchStatus::Idle);
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_posts() {
        let api = Arc::new(ScriptedApi::new(vec![
            Ok(json!([{"id": 1, "title": "hello", "desc": "test desc"}])),
            Ok(json!("not a list")),
        ]));
        let store = PostsStore::new(Arc::clone(&api) as Arc<dyn PostsApi>);

        store.refresh().await.expect("first refresh");
        let err = store.refresh().await.expect_err("scalar body");
        assert!(matches!(err, QueryError::Transform(_)));
        assert_eq!(store.status(), FetchStatus::Failed);
        assert!(store.error().is_some());
        assert_eq!(store.select_ids(), vec![1], "stale data survives a failure");
    }
}
