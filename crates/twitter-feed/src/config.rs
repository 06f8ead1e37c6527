use serde::Deserialize;

/// Client configuration, loaded from `TWITTER_`-prefixed environment
/// variables by the application. The endpoint override exists so tests can
/// point the client at a local mock server.
#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.twitter.com".to_owned()
}
