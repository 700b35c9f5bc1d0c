#![allow(dead_code)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    routing,
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use p256::{
    ecdsa::{signature::Signer, Signature, SigningKey},
    pkcs8::{EncodePublicKey, LineEnding},
};
use serde_json::json;
use ssv_verifier::{
    keys::{HttpKeySource, KeyStore, DEFAULT_CACHE_TTL},
    routes,
    verifier::CallbackVerifier,
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

pub const KEYS_PATH: &str = "/admob/reward/verifier-keys.json";

pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).unwrap()
}

pub fn pem(key: &SigningKey) -> String {
    key.verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap()
}

/// A `verifier-keys.json` body publishing the given keys.
pub fn keys_json(keys: &[(&str, &SigningKey)]) -> String {
    let keys: Vec<_> = keys
        .iter()
        .map(|(id, key)| json!({ "keyId": id, "pem": pem(key) }))
        .collect();

    json!({ "keys": keys }).to_string()
}

pub fn sign(key: &SigningKey, message: &str) -> Vec<u8> {
    let signature: Signature = key.sign(message.as_bytes());
    signature.to_der().as_bytes().to_vec()
}

/// Appends a URL-safe signature of `message` the way AdMob does.
pub fn signed_query(key: &SigningKey, message: &str) -> String {
    let signature = URL_SAFE_NO_PAD.encode(sign(key, message));
    format!("{message}&signature={signature}")
}

type Published = Arc<Mutex<(StatusCode, String)>>;

/// Local stand-in for the key distribution host.
pub struct KeyServer {
    pub url: Url,
    hits: Arc<AtomicUsize>,
    published: Published,
}

impl KeyServer {
    pub async fn start(status: StatusCode, body: impl Into<String>) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let published = Arc::new(Mutex::new((status, body.into())));

        let app = Router::new()
            .route(KEYS_PATH, routing::get(serve_keys))
            .with_state((Arc::clone(&hits), Arc::clone(&published)));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Self {
            url: Url::parse(&format!("http://{addr}{KEYS_PATH}")).unwrap(),
            hits,
            published,
        }
    }

    pub async fn serving(keys: &[(&str, &SigningKey)]) -> Self {
        Self::start(StatusCode::OK, keys_json(keys)).await
    }

    pub fn publish(&self, status: StatusCode, body: impl Into<String>) {
        *self.published.lock().unwrap() = (status, body.into());
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn serve_keys(
    State((hits, published)): State<(Arc<AtomicUsize>, Published)>,
) -> (StatusCode, String) {
    hits.fetch_add(1, Ordering::SeqCst);
    published.lock().unwrap().clone()
}

/// A URL on which nothing is listening.
pub async fn dead_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    Url::parse(&format!("http://{addr}{KEYS_PATH}")).unwrap()
}

pub fn http_source(urls: Vec<Url>) -> HttpKeySource {
    HttpKeySource::new(urls, Duration::from_secs(5)).unwrap()
}

pub fn app(urls: Vec<Url>) -> Router {
    let keys = Arc::new(KeyStore::new(http_source(urls), DEFAULT_CACHE_TTL));
    routes::build(Arc::new(CallbackVerifier::new(keys)))
}

pub async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-proto", "https")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let (status, _, body) = send(app, "GET", uri).await;
    (status, body)
}
