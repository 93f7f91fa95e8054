//! Wire types for the posts REST API.
//!
//! These mirror the JSON the server actually speaks and deliberately carry no
//! domain logic; the main crate validates payloads into its own records.

use serde::{Deserialize, Serialize};

/// A post as it travels over the wire.
///
/// `id` is optional on the way in: servers assign ids on create and
/// hand-maintained fixtures sometimes omit them. Conversion into a domain
/// record enforces presence, so a missing id is reported as a validation
/// problem instead of a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub desc: String,
}

impl PostPayload {
    pub fn new(id: impl Into<Option<i64>>, title: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            desc: desc.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_a_full_post() {
        let payload: PostPayload =
            serde_json::from_value(json!({"id": 1, "title": "hello", "desc": "test desc"}))
                .expect("payload should decode");
        assert_eq!(payload, PostPayload::new(1, "hello", "test desc"));
    }

    #[test]
    fn missing_id_decodes_as_none() {
        let payload: PostPayload =
            serde_json::from_value(json!({"title": "hello", "desc": "test desc"}))
                .expect("payload without id should still decode");
        assert_eq!(payload.id, None);
    }

    #[test]
    fn missing_title_is_a_decode_error() {
        let result = serde_json::from_value::<PostPayload>(json!({"id": 1, "desc": "test desc"}));
        assert!(result.is_err());
    }

    #[test]
    fn absent_id_is_not_serialized() {
        let body = serde_json::to_value(PostPayload::new(None, "hello", "test desc"))
            .expect("payload should encode");
        assert_eq!(body, json!({"title": "hello", "desc": "test desc"}));
    }
}
