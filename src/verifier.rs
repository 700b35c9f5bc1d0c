//! Verification of a single reward callback against the published keys.

use crate::{
    canonical::{canonicalize, SIGNATURE_PARAM},
    error::VerifyError,
    keys::{HttpKeySource, KeySource, KeyStore},
    signature,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Name of the query parameter selecting the signing key.
pub const KEY_ID_PARAM: &str = "key_id";

/// Query parameters of an inbound callback, as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackRequest {
    params: Vec<(String, String)>,
    raw_query: Option<String>,
}

impl CallbackRequest {
    pub fn new(params: Vec<(String, String)>, raw_query: Option<String>) -> Self {
        Self { params, raw_query }
    }

    /// Decodes parameters for lookup while keeping the raw query untouched.
    pub fn from_raw_query(raw_query: Option<String>) -> Self {
        let params = raw_query
            .as_deref()
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        Self { params, raw_query }
    }

    /// First value of `name`. Empty values count as absent.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }
}

/// Result of verifying a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Signature is valid for the published key.
    Accepted,
    /// Signature is invalid or could not be checked.
    Rejected,
    /// No `key_id` or `signature`: a console connectivity probe, not a reward.
    Indeterminate,
}

/// Checks callbacks against a shared [`KeyStore`].
#[derive(Debug)]
pub struct CallbackVerifier<S = HttpKeySource> {
    keys: Arc<KeyStore<S>>,
}

impl<S> Clone for CallbackVerifier<S> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
        }
    }
}

impl<S: KeySource> CallbackVerifier<S> {
    pub fn new(keys: Arc<KeyStore<S>>) -> Self {
        Self { keys }
    }

    pub async fn verify(&self, request: &CallbackRequest) -> VerificationOutcome {
        let (Some(key_id), Some(signature)) =
            (request.param(KEY_ID_PARAM), request.param(SIGNATURE_PARAM))
        else {
            debug!("Callback without key_id or signature; treating as probe");
            return VerificationOutcome::Indeterminate;
        };

        match self.check(request, key_id, signature).await {
            Ok(()) => VerificationOutcome::Accepted,
            Err(err) if err.is_internal() => {
                error!("Callback verification failed with key {key_id:?}: {err}");
                VerificationOutcome::Rejected
            }
            Err(err) => {
                info!("Rejected callback signed with key {key_id:?}: {err}");
                VerificationOutcome::Rejected
            }
        }
    }

    async fn check(
        &self,
        request: &CallbackRequest,
        key_id: &str,
        signature: &str,
    ) -> Result<(), VerifyError> {
        let pem = self.keys.get_key_pem(key_id).await?;

        let message = canonicalize(request.raw_query());
        if message.is_empty() {
            return Err(VerifyError::MalformedRequest);
        }

        signature::try_verify(&message, signature, &pem)?;

        Ok(())
    }
}
