use crate::{
    args::Arguments,
    keys::{DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT, DEFAULT_KEY_URLS},
};
use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::{
    net::{Ipv4Addr, SocketAddr},
    path::Path,
    time::Duration,
};
use url::Url;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub keys: KeysConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3000)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeysConfig {
    /// Key set locations, tried in order.
    pub urls: Vec<Url>,
    pub cache_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            urls: DEFAULT_KEY_URLS
                .iter()
                .filter_map(|url| Url::parse(url).ok())
                .collect(),
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
        }
    }
}

impl KeysConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Config {
    /// Reads the config named by `args` (or the defaults), applies the
    /// command-line overrides, and validates the result.
    pub async fn load(args: &Arguments) -> Result<Self> {
        let mut config = match &args.config_path {
            Some(path) => read_config(path).await?,
            None => Self::default(),
        };

        config.apply_overrides(args);
        config.validate()?;

        Ok(config)
    }

    pub fn apply_overrides(&mut self, args: &Arguments) {
        if let Some(listen) = args.listen {
            self.server.listen = listen;
        }
        if let Some(port) = args.port {
            self.server.listen.set_port(port);
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.keys.urls.is_empty(), "keys.urls must not be empty");
        for url in &self.keys.urls {
            ensure!(
                matches!(url.scheme(), "http" | "https"),
                "key url must be http(s): {url}"
            );
        }
        ensure!(self.keys.cache_ttl_secs > 0, "keys.cache_ttl_secs must be positive");
        ensure!(
            self.keys.fetch_timeout_secs > 0,
            "keys.fetch_timeout_secs must be positive"
        );

        Ok(())
    }
}

async fn read_config(config_path: &Path) -> Result<Config> {
    let config_file = tokio::fs::read_to_string(config_path)
        .await
        .with_context(|| format!("failed to read config from path: {}", config_path.display()))?;

    toml::from_str(&config_file).with_context(|| "failed to parse valid config TOML from file")
}
