pub type Result<T = (), E = Error> = std::result::Result<T, E>;

/// Describes any possible error that may happen in the application lifetime.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Feed {
        #[from]
        source: twitter_feed::FeedError,
    },

    #[error(transparent)]
    Serve {
        #[from]
        source: crate::server::ServeError,
    },
}
