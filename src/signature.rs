//! ECDSA P-256 / SHA-256 verification of callback signatures.

use crate::error::SignatureError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use p256::{
    ecdsa::{signature::Verifier, Signature, VerifyingKey},
    pkcs8::DecodePublicKey,
};
use std::borrow::Cow;

/// Converts URL-safe base64 into padded standard base64.
pub fn to_standard_base64(url_safe: &str) -> Cow<'_, str> {
    let needs_padding = url_safe.len() % 4 != 0;
    if !needs_padding && !url_safe.contains(['-', '_']) {
        return Cow::Borrowed(url_safe);
    }

    let mut standard = url_safe.replace('-', "+").replace('_', "/");
    while standard.len() % 4 != 0 {
        standard.push('=');
    }

    Cow::Owned(standard)
}

/// Decodes a URL-safe, possibly unpadded, base64 signature into raw bytes.
pub fn decode_url_safe(url_safe: &str) -> Result<Vec<u8>, SignatureError> {
    Ok(STANDARD.decode(to_standard_base64(url_safe).as_bytes())?)
}

/// Parses a SubjectPublicKeyInfo PEM into a P-256 verifying key.
pub fn parse_public_key(pem: &str) -> Result<VerifyingKey, SignatureError> {
    VerifyingKey::from_public_key_pem(pem.trim())
        .map_err(|err| SignatureError::InvalidKey(err.to_string()))
}

/// Verifies `signature_url_safe` over `message`, reporting why it failed.
pub fn try_verify(
    message: &[u8],
    signature_url_safe: &str,
    pem: &str,
) -> Result<(), SignatureError> {
    let signature_der = decode_url_safe(signature_url_safe)?;
    let signature =
        Signature::from_der(&signature_der).map_err(|_| SignatureError::InvalidSignature)?;
    let verifying_key = parse_public_key(pem)?;

    verifying_key
        .verify(message, &signature)
        .map_err(|_| SignatureError::Mismatch)
}

/// Returns `true` only if the signature is a valid ECDSA-SHA256 signature
/// over `message` by the key in `pem`.
pub fn verify(message: &[u8], signature_url_safe: &str, pem: &str) -> bool {
    try_verify(message, signature_url_safe, pem).is_ok()
}
