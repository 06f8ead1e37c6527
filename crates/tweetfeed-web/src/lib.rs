//! Web front end for the tweet feed viewer: a small axum server with an
//! index page and a fetch endpoint that proxies to the Twitter API through
//! the `twitter-feed` client.

mod config;
mod error;
mod observability;
mod server;
mod util;

pub use crate::error::*;
pub use config::*;
pub use observability::*;
pub use server::{find_available_port, ServeError};

mod prelude {
    pub(crate) use crate::util::prelude::*;

    #[allow(unused_imports)]
    pub(crate) use tracing::{debug, error, info, instrument, trace, warn};
}

/// Runs the web front end until the server exits.
pub async fn run(config: Config) -> Result {
    // A deployment without credentials must not come up at all, so probe
    // them before any socket is bound. Requests still re-read the
    // environment on every fetch.
    twitter_feed::Credentials::from_env()?;

    server::serve(config).await?;

    Ok(())
}
