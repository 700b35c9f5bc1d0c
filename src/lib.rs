//! Server-side verification of AdMob rewarded-ad callbacks.

pub mod args;
pub mod canonical;
pub mod config;
pub mod error;
pub mod keys;
pub mod routes;
pub mod signature;
pub mod verifier;

pub fn agent_string() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))
}
