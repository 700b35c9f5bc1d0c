//! Error types for the verification pipeline.

use thiserror::Error;

/// Failure to obtain a key set from any configured source.
#[derive(Error, Debug)]
pub enum KeyFetchError {
    /// Every source was tried and none produced a usable key set.
    #[error("all {attempted} key sources failed; last error: {last}")]
    AllSourcesFailed { attempted: usize, last: String },

    /// No sources were configured.
    #[error("no key sources configured")]
    NoSources,
}

/// Failure to resolve a public key for a `key_id`.
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// Key set is available but does not contain the identifier.
    #[error("no public key with id {key_id:?}")]
    NotFound { key_id: String },

    /// No key set has ever been fetched and fetching failed.
    #[error("key set unavailable: {0}")]
    Fetch(#[from] KeyFetchError),
}

/// Failure to verify a signature.
#[derive(Error, Debug)]
pub enum SignatureError {
    /// Signature was not valid URL-safe base64.
    #[error("signature is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    /// Decoded bytes are not a DER-encoded ECDSA signature.
    #[error("signature is not a DER-encoded ECDSA signature")]
    InvalidSignature,

    /// PEM could not be parsed as a P-256 public key.
    #[error("public key is not a P-256 SubjectPublicKeyInfo PEM: {0}")]
    InvalidKey(String),

    /// The signature does not match the message.
    #[error("signature does not match message")]
    Mismatch,
}

impl SignatureError {
    /// Whether this failure points at bad key material rather than a bad request.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InvalidKey(_))
    }
}

/// Why a callback was rejected.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error(transparent)]
    Key(#[from] KeyStoreError),

    /// There was no query string to reconstruct the signed message from.
    #[error("request has no signed message")]
    MalformedRequest,

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

impl VerifyError {
    /// Only malformed key material warrants operator attention.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Signature(err) if err.is_internal())
    }
}
