//! Thin client for the Twitter v2 REST API, scoped to what the tweet feed
//! viewer needs: authenticate, resolve a username to a user id, and fetch the
//! account's most recent posts.

mod auth;
mod client;
mod config;
mod credentials;
mod error;
mod http;
mod model;
mod util;

pub use client::{FeedTweet, Session, DEFAULT_MAX_RESULTS};
pub use config::Config;
pub use credentials::Credentials;
pub use error::{FeedError, Result};
pub use http::HttpClientError;

mod prelude {
    pub(crate) use crate::http::prelude::*;
    pub(crate) use crate::util::prelude::*;

    #[allow(unused_imports)]
    pub(crate) use tracing::{debug, error, info, instrument, trace, warn};
}
