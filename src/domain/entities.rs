//! Domain entities mirrored from the posts API.

use std::fmt;
use std::hash::Hash;

use fresca_api_types::PostPayload;
use serde::Serialize;

use crate::domain::error::DomainError;

pub type PostId = i64;

/// Identity contract for entities held in a normalized collection.
pub trait Keyed {
    type Id: Eq + Hash + Clone + fmt::Debug;

    fn key(&self) -> Self::Id;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    pub desc: String,
}

impl PostRecord {
    pub fn new(id: PostId, title: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            desc: desc.into(),
        }
    }
}

impl Keyed for PostRecord {
    type Id = PostId;

    fn key(&self) -> PostId {
        self.id
    }
}

impl TryFrom<PostPayload> for PostRecord {
    type Error = DomainError;

    fn try_from(payload: PostPayload) -> Result<Self, Self::Error> {
        let id = payload
            .id
            .ok_or_else(|| DomainError::validation("post payload is missing an id"))?;
        Ok(Self {
            id,
            title: payload.title,
            desc: payload.desc,
        })
    }
}

impl From<&PostRecord> for PostPayload {
    fn from(record: &PostRecord) -> Self {
        PostPayload::new(record.id, record.title.clone(), record.desc.clone())
    }
}
