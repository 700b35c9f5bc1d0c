//! Reconstruction of the signed message from a callback query string.
//!
//! AdMob signs the query string exactly as it is sent, so the message is
//! rebuilt from the raw bytes on the wire. Parameters are never decoded and
//! re-encoded here.

use std::borrow::Cow;

/// Name of the query parameter carrying the signature.
pub const SIGNATURE_PARAM: &str = "signature";

/// Rebuilds the signed message from the raw query string.
///
/// Every `&`-separated token whose form-decoded name is exactly `signature`
/// is dropped, matching how parameters are looked up on the request;
/// the rest are rejoined in their original order and encoding. Returns an
/// empty vector when there is no query string at all.
pub fn canonicalize(raw_query: Option<&str>) -> Vec<u8> {
    let Some(query) = raw_query else {
        return Vec::new();
    };

    query
        .split('&')
        .filter(|token| param_name(token) != SIGNATURE_PARAM)
        .collect::<Vec<_>>()
        .join("&")
        .into_bytes()
}

fn param_name(token: &str) -> Cow<'_, str> {
    let raw = token.split_once('=').map_or(token, |(name, _)| name);
    url::form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(name, _)| name)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(query: &str) -> String {
        String::from_utf8(canonicalize(Some(query))).unwrap()
    }

    #[test]
    fn strips_trailing_signature() {
        assert_eq!(
            canonical("ad_network=x&key_id=K1&signature=SIG1"),
            "ad_network=x&key_id=K1"
        );
    }

    #[test]
    fn strips_signature_anywhere_and_keeps_order() {
        assert_eq!(
            canonical("b=2&signature=abc&a=1&key_id=9"),
            "b=2&a=1&key_id=9"
        );
        assert_eq!(canonical("signature=abc&z=1&y=2"), "z=1&y=2");
    }

    #[test]
    fn keeps_original_percent_encoding() {
        assert_eq!(
            canonical("custom_data=a%20b%2Bc&user_id=%E4%BD%A0&signature=x"),
            "custom_data=a%20b%2Bc&user_id=%E4%BD%A0"
        );
    }

    #[test]
    fn only_exact_name_is_removed() {
        assert_eq!(
            canonical("signatures=1&my_signature=2&signature=3&signature"),
            "signatures=1&my_signature=2"
        );
    }

    #[test]
    fn encoded_signature_name_is_removed() {
        assert_eq!(canonical("a=1&signatur%65=abc&b=2"), "a=1&b=2");
        assert_eq!(canonical("a=1&%73ignature=abc"), "a=1");
    }

    #[test]
    fn value_named_signature_is_kept() {
        assert_eq!(canonical("x=signature&signature=abc"), "x=signature");
    }

    #[test]
    fn removes_every_signature_token() {
        assert_eq!(canonical("signature=a&k=v&signature=b"), "k=v");
    }

    #[test]
    fn empty_inputs() {
        assert!(canonicalize(None).is_empty());
        assert!(canonicalize(Some("")).is_empty());
        assert!(canonicalize(Some("signature=abc")).is_empty());
    }
}
