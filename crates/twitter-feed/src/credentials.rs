use crate::prelude::*;
use crate::{FeedError, Result};
use serde::Deserialize;

const ENV_PREFIX: &str = "TWITTER_";

/// API credentials for the feed provider. Values are never logged, only
/// their presence is.
#[derive(Clone)]
pub struct Credentials {
    pub(crate) api_key: String,
    pub(crate) api_secret: String,
    pub(crate) access_token: Option<String>,
    pub(crate) access_token_secret: Option<String>,
    pub(crate) bearer_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    /// Honors the "values are never logged, only their presence is" contract:
    /// reports which fields are set without revealing any secret.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &true)
            .field("api_secret", &true)
            .field("access_token", &self.access_token.is_some())
            .field("access_token_secret", &self.access_token_secret.is_some())
            .field("bearer_token", &self.bearer_token.is_some())
            .finish()
    }
}

/// Raw deserialization target. Everything is optional here so that the
/// required-pair validation can produce a precise error message instead of
/// a generic deserialization failure.
#[derive(Default, Deserialize)]
struct RawCredentials {
    api_key: Option<String>,
    api_secret: Option<String>,
    access_token: Option<String>,
    access_token_secret: Option<String>,
    bearer_token: Option<String>,
}

impl Credentials {
    /// Reads credentials from `TWITTER_`-prefixed environment variables.
    ///
    /// Only the presence of the API key and secret is validated. Whether the
    /// values themselves are any good is decided by a live connection attempt.
    pub fn from_env() -> Result<Self> {
        // Cannot fail: every field of the raw struct is optional
        let raw = envy::prefixed(ENV_PREFIX)
            .from_env::<RawCredentials>()
            .unwrap_or_default();

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCredentials) -> Result<Self> {
        debug!(
            api_key = raw.api_key.is_some(),
            api_secret = raw.api_secret.is_some(),
            access_token = raw.access_token.is_some(),
            access_token_secret = raw.access_token_secret.is_some(),
            bearer_token = raw.bearer_token.is_some(),
            "checking Twitter credentials"
        );

        let (api_key, api_secret) = match (raw.api_key, raw.api_secret) {
            (Some(api_key), Some(api_secret)) => (api_key, api_secret),
            (api_key, api_secret) => {
                let mut missing = Vec::new();
                if api_key.is_none() {
                    missing.push("TWITTER_API_KEY");
                }
                if api_secret.is_none() {
                    missing.push("TWITTER_API_SECRET");
                }
                return Err(FeedError::MissingCredentials {
                    missing: missing.join(", "),
                });
            }
        };

        Ok(Self {
            api_key,
            api_secret,
            access_token: raw.access_token,
            access_token_secret: raw.access_token_secret,
            bearer_token: raw.bearer_token,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_iter<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw = envy::prefixed(ENV_PREFIX)
            .from_iter::<_, RawCredentials>(vars)
            .unwrap_or_default();

        Self::from_raw(raw)
    }
}
