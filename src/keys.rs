//! AdMob verifier key acquisition and caching.

use crate::error::{KeyFetchError, KeyStoreError};
use serde::Deserialize;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{sync::RwLock, time::Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Published key locations, primary first.
pub const DEFAULT_KEY_URLS: [&str; 2] = [
    "https://www.gstatic.com/admob/reward/verifier-keys.json",
    "https://gstatic.com/admob/reward/verifier-keys.json",
];

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A single public key published by the ad network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierKey {
    pub key_id: String,
    pub pem: String,
}

/// The full set of currently published keys, unique by `key_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: Vec<VerifierKey>,
}

impl KeySet {
    /// Parses a `verifier-keys.json` document. Entries lacking an identifier
    /// or a PEM are skipped.
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        let document: KeysDocument = serde_json::from_slice(body)?;

        let keys: Self = document
            .keys
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<RawKey>(entry) {
                Ok(raw) => raw.into_key(),
                Err(err) => {
                    debug!("Skipping unreadable key entry: {err}");
                    None
                }
            })
            .collect();

        Ok(keys)
    }

    pub fn find(&self, key_id: &str) -> Option<&VerifierKey> {
        self.keys.iter().find(|key| key.key_id == key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<VerifierKey> for KeySet {
    fn from_iter<I: IntoIterator<Item = VerifierKey>>(iter: I) -> Self {
        let mut keys: Vec<VerifierKey> = Vec::new();
        for key in iter {
            if keys.iter().any(|existing| existing.key_id == key.key_id) {
                debug!("Ignoring duplicate key id: {}", key.key_id);
                continue;
            }
            keys.push(key);
        }

        Self { keys }
    }
}

#[derive(Deserialize)]
struct KeysDocument {
    keys: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawKey {
    #[serde(rename = "keyId")]
    key_id_camel: Option<KeyId>,
    key_id: Option<KeyId>,
    pem: Option<String>,
}

/// Key ids have been published both as strings and as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum KeyId {
    Text(String),
    Number(serde_json::Number),
}

impl KeyId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

impl RawKey {
    /// `keyId` takes precedence over `key_id`; empty values count as missing.
    fn into_key(self) -> Option<VerifierKey> {
        let key_id = [self.key_id_camel, self.key_id]
            .into_iter()
            .flatten()
            .map(KeyId::into_string)
            .find(|id| !id.is_empty())?;
        let pem = self.pem.filter(|pem| !pem.is_empty())?;

        Some(VerifierKey { key_id, pem })
    }
}

/// Somewhere a [`KeySet`] can be fetched from.
pub trait KeySource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<KeySet, KeyFetchError>> + Send;
}

/// Fetches the key set over HTTPS, trying each URL in order.
#[derive(Debug, Clone)]
pub struct HttpKeySource {
    client: reqwest::Client,
    urls: Vec<Url>,
}

impl HttpKeySource {
    /// Builds a source whose every request is bounded by `timeout`.
    pub fn new(urls: Vec<Url>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(crate::agent_string())
            .build()?;

        Ok(Self { client, urls })
    }

    async fn fetch_from(&self, url: &Url) -> anyhow::Result<KeySet> {
        let body = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(KeySet::from_json(&body)?)
    }
}

impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<KeySet, KeyFetchError> {
        let mut last = None;

        for url in &self.urls {
            match self.fetch_from(url).await {
                Ok(keys) => {
                    debug!("Fetched {} verifier keys from {url}", keys.len());
                    return Ok(keys);
                }
                Err(err) => {
                    warn!("Fetching verifier keys from {url} failed: {err:#}");
                    last = Some(err);
                }
            }
        }

        match last {
            Some(err) => Err(KeyFetchError::AllSourcesFailed {
                attempted: self.urls.len(),
                last: format!("{err:#}"),
            }),
            None => Err(KeyFetchError::NoSources),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedKeys {
    keys: Arc<KeySet>,
    fetched_at: Instant,
}

impl CachedKeys {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Process-wide key cache in front of a [`KeySource`].
///
/// The cached set is only ever replaced whole, so readers see either the
/// previous complete set or the new one. Concurrent misses may each fetch.
#[derive(Debug)]
pub struct KeyStore<S = HttpKeySource> {
    source: S,
    ttl: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl<S: KeySource> KeyStore<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: RwLock::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Resolves the PEM for `key_id`.
    ///
    /// A stale or empty cache is refreshed first. If the id is still
    /// missing, one forced refresh is made before giving up, to pick up
    /// rotated keys. A stale set served after a failed refresh is not
    /// refetched again within the same lookup.
    pub async fn get_key_pem(&self, key_id: &str) -> Result<String, KeyStoreError> {
        let cached = self.cache.read().await.clone();

        let (keys, serving_stale) = match cached {
            Some(cached) if cached.is_fresh(self.ttl) => (cached.keys, false),
            stale => match self.refresh().await {
                Ok(keys) => (keys, false),
                Err(err) => {
                    let Some(stale) = stale else {
                        return Err(err.into());
                    };
                    warn!("Serving stale verifier keys after refresh failure: {err}");
                    (stale.keys, true)
                }
            },
        };

        if let Some(key) = keys.find(key_id) {
            return Ok(key.pem.clone());
        }

        let not_found = || KeyStoreError::NotFound {
            key_id: key_id.to_owned(),
        };

        if serving_stale {
            return Err(not_found());
        }

        debug!("Key id {key_id:?} not in cache; forcing refresh");
        match self.refresh().await {
            Ok(keys) => keys
                .find(key_id)
                .map(|key| key.pem.clone())
                .ok_or_else(not_found),
            Err(err) => {
                warn!("Forced verifier key refresh failed: {err}");
                Err(not_found())
            }
        }
    }

    /// Fetches a fresh key set and replaces the cache with it.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, KeyFetchError> {
        let keys = Arc::new(self.source.fetch().await?);

        *self.cache.write().await = Some(CachedKeys {
            keys: Arc::clone(&keys),
            fetched_at: Instant::now(),
        });
        info!("Verifier key cache refreshed with {} keys", keys.len());

        Ok(keys)
    }
}
