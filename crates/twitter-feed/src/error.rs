use crate::http::HttpClientError;

pub type Result<T, E = FeedError> = std::result::Result<T, E>;

/// Everything that can go wrong between "the user typed a username" and
/// "here are their tweets".
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("missing required Twitter API credentials ({missing})")]
    MissingCredentials { missing: String },

    /// The upstream service rejected the configured credentials. Distinct
    /// from [`FeedError::Connection`]: the network worked, the keys did not.
    #[error("Twitter API authentication failed, check the configured credentials")]
    Authentication { source: HttpClientError },

    #[error("could not establish a connection to the Twitter API")]
    Connection { source: HttpClientError },

    #[error("user {username} not found")]
    UserNotFound { username: String },

    #[error("Twitter API request failed")]
    Upstream { source: HttpClientError },
}

impl FeedError {
    /// Classifies an HTTP-layer failure observed while constructing a session.
    pub(crate) fn from_connect(source: HttpClientError) -> Self {
        if source.is_unauthorized() {
            Self::Authentication { source }
        } else {
            Self::Connection { source }
        }
    }

    /// Classifies an HTTP-layer failure observed after the session was
    /// established, i.e. while fetching a feed.
    pub(crate) fn from_fetch(source: HttpClientError) -> Self {
        if source.is_unauthorized() {
            Self::Authentication { source }
        } else {
            Self::Upstream { source }
        }
    }
}
