//! Posts endpoints: the query and mutation definitions wired into the cache.
//!
//! `posts.list` provides the list tag plus one entity tag per returned post.
//! The create and update mutations invalidate what they touch; delete only
//! invalidates the entity tag of the removed post, so a cached list keeps
//! serving the stale id until something else invalidates it.

use std::sync::Arc;

use async_trait::async_trait;
use fresca_api_types::PostPayload;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::{EndpointRegistry, MutationDef, QueryDef, QueryError, Tag};
use crate::domain::collection::NormalizedCollection;
use crate::domain::entities::{PostId, PostRecord};
use crate::infra::http::ApiError;

/// Tag kind shared by the list tag and per-post entity tags.
pub const POST_TAG: &str = "post";

pub const LIST_POSTS: &str = "posts.list";
pub const CREATE_POST: &str = "posts.create";
pub const UPDATE_POST: &str = "posts.update";
pub const DELETE_POST: &str = "posts.delete";

/// Transport-facing posts API. The cache only sees raw JSON from here;
/// decoding and normalization happen in the endpoint transforms.
#[async_trait]
pub trait PostsApi: Send + Sync {
    async fn list(&self) -> Result<Value, ApiError>;
    async fn create(&self, payload: &PostPayload) -> Result<Value, ApiError>;
    async fn update(&self, id: PostId, payload: &PostPayload) -> Result<Value, ApiError>;
    async fn remove(&self, id: PostId) -> Result<(), ApiError>;
}

/// Decode a raw posts response into domain records. Malformed JSON is a
/// transform error; a post without an id is a validation error.
pub fn decode_posts(raw: Value) -> Result<Vec<PostRecord>, QueryError> {
    let payloads: Vec<PostPayload> =
        serde_json::from_value(raw).map_err(|err| QueryError::transform(err.to_string()))?;
    payloads
        .into_iter()
        .map(|payload| PostRecord::try_from(payload).map_err(QueryError::from))
        .collect()
}

pub fn normalize_posts(posts: Vec<PostRecord>) -> NormalizedCollection<PostRecord> {
    NormalizedCollection::from_items(posts)
}

/// The list tag plus one entity tag per post in the collection.
pub fn list_tags(posts: &NormalizedCollection<PostRecord>) -> Vec<Tag> {
    let mut tags = Vec::with_capacity(posts.len() + 1);
    tags.push(Tag::list(POST_TAG));
    tags.extend(posts.ids().iter().map(|id| Tag::entity(POST_TAG, id)));
    tags
}

fn decode_args<T: DeserializeOwned>(
    endpoint: &'static str,
    args: &Value,
) -> Result<T, QueryError> {
    serde_json::from_value(args.clone())
        .map_err(|err| QueryError::invalid_args(endpoint, err.to_string()))
}

/// Build the posts endpoint registry over a transport.
pub fn endpoints(api: Arc<dyn PostsApi>) -> EndpointRegistry<PostRecord> {
    let mut registry = EndpointRegistry::new();

    let list_api = Arc::clone(&api);
    registry.register_query(QueryDef {
        name: LIST_POSTS,
        fetch: Arc::new(move |_args| {
            let api = Arc::clone(&list_api);
            Box::pin(async move { Ok(api.list().await?) })
        }),
        transform: Arc::new(|raw| decode_posts(raw).map(normalize_posts)),
        provides: Arc::new(|_args, posts| list_tags(posts)),
    });

    let create_api = Arc::clone(&api);
    registry.register_mutation(MutationDef {
        name: CREATE_POST,
        execute: Arc::new(move |args| {
            let api = Arc::clone(&create_api);
            Box::pin(async move {
                let payload: PostPayload = decode_args(CREATE_POST, &args)?;
                Ok(api.create(&payload).await?)
            })
        }),
        invalidates: Arc::new(|_args| vec![Tag::list(POST_TAG)]),
    });

    let update_api = Arc::clone(&api);
    registry.register_mutation(MutationDef {
        name: UPDATE_POST,
        execute: Arc::new(move |args| {
            let api = Arc::clone(&update_api);
            Box::pin(async move {
                let payload: PostPayload = decode_args(UPDATE_POST, &args)?;
                let Some(id) = payload.id else {
                    return Err(QueryError::invalid_args(UPDATE_POST, "id is required"));
                };
                Ok(api.update(id, &payload).await?)
            })
        }),
        invalidates: Arc::new(|args| {
            match args.get("id").and_then(Value::as_i64) {
                Some(id) => vec![Tag::entity(POST_TAG, id)],
                None => Vec::new(),
            }
        }),
    });

    let delete_api = Arc::clone(&api);
    registry.register_mutation(MutationDef {
        name: DELETE_POST,
        execute: Arc::new(move |args| {
            let api = Arc::clone(&delete_api);
            Box::pin(async move {
                let Some(id) = args.as_i64() else {
                    return Err(QueryError::invalid_args(DELETE_POST, "expected a post id"));
                };
                api.remove(id).await?;
                Ok(Value::Null)
            })
        }),
        // Deliberately narrow: the list tag is not invalidated on delete.
        invalidates: Arc::new(|args| {
            match args.as_i64() {
                Some(id) => vec![Tag::entity(POST_TAG, id)],
                None => Vec::new(),
            }
        }),
    });

    registry
}
