use serde::{de::DeserializeOwned, Deserialize};
use std::net::{IpAddr, Ipv4Addr};

pub struct Config {
    pub(crate) http: HttpConfig,
    pub(crate) twitter: twitter_feed::Config,
}

impl Config {
    pub fn load_or_panic() -> Config {
        Self {
            http: from_env_or_panic("HTTP_"),
            twitter: from_env_or_panic("TWITTER_"),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct HttpConfig {
    #[serde(default = "default_host")]
    pub(crate) host: IpAddr,

    #[serde(default)]
    pub(crate) port_mode: PortMode,

    /// The port used in [`PortMode::Fixed`].
    #[serde(default = "default_port")]
    pub(crate) port: u16,

    /// Scan range bounds used in [`PortMode::Scan`]; the end is exclusive.
    #[serde(default = "default_port_scan_start")]
    pub(crate) port_scan_start: u16,

    #[serde(default = "default_port_scan_end")]
    pub(crate) port_scan_end: u16,
}

/// How the server chooses the port it listens on: either the configured
/// fixed port, or the first free one in the configured scan range.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PortMode {
    #[default]
    Fixed,
    Scan,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    5050
}

fn default_port_scan_start() -> u16 {
    5000
}

fn default_port_scan_end() -> u16 {
    9000
}

pub(crate) fn from_env_or_panic<T: DeserializeOwned>(prefix: &str) -> T {
    envy::prefixed(prefix).from_env().unwrap_or_else(|err| {
        panic!(
            "BUG: Couldn't load config from environment for {}: {:#?}",
            std::any::type_name::<T>(),
            err
        );
    })
}
