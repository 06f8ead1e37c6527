//! Wire-level types for the v2 API. Responses arrive wrapped in a common
//! envelope with `data`, `meta`, and `errors` members, any of which may be
//! absent.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct ApiResponse<T> {
    #[serde(default)]
    pub(crate) data: Option<T>,

    #[serde(default)]
    pub(crate) meta: Option<ResponseMeta>,

    /// Partial failures, e.g. a lookup for a user that does not exist comes
    /// back as HTTP 200 with an error object here and no `data`.
    #[serde(default)]
    pub(crate) errors: Vec<ApiErrorObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct User {
    pub(crate) id: String,

    #[allow(dead_code)]
    pub(crate) name: String,

    pub(crate) username: String,
}

/// A single post. Both the text and the creation timestamp are mandatory:
/// the request always asks for them, so their absence means the response is
/// not what this client understands.
#[derive(Debug, Deserialize)]
pub(crate) struct Tweet {
    pub(crate) id: String,

    pub(crate) text: String,

    pub(crate) created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMeta {
    #[serde(default)]
    pub(crate) result_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorObject {
    #[serde(default)]
    pub(crate) title: Option<String>,

    #[serde(default)]
    pub(crate) detail: Option<String>,
}

impl ApiErrorObject {
    pub(crate) fn message(&self) -> &str {
        self.detail
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or("unknown error")
    }
}
