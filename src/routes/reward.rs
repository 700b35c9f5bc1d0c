//! AdMob server-side verification callback endpoint.

use crate::{
    keys::KeySource,
    verifier::{CallbackRequest, CallbackVerifier, VerificationOutcome},
};
use axum::{
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, Router},
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const VERIFY_REWARD_PATH: &str = "/verify-reward";

pub fn build<S: KeySource + 'static>(verifier: Arc<CallbackVerifier<S>>) -> Router {
    Router::new()
        .route(
            VERIFY_REWARD_PATH,
            get(verify_reward::<S>).head(reachable).post(redirect),
        )
        .with_state(verifier)
}

async fn verify_reward<S: KeySource + 'static>(
    State(verifier): State<Arc<CallbackVerifier<S>>>,
    headers: HeaderMap,
    RawQuery(raw_query): RawQuery,
) -> impl IntoResponse {
    let forwarded_proto = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok());
    if forwarded_proto != Some("https") {
        warn!("Received reward callback over plain HTTP");
    }

    let request = CallbackRequest::from_raw_query(raw_query);

    // Panics while verifying are answered with a 500 instead of a dropped connection.
    let task = tokio::spawn(async move {
        let outcome = verifier.verify(&request).await;
        (outcome, request)
    });

    match task.await {
        Ok((VerificationOutcome::Accepted, request)) => {
            grant_reward(&request);
            (StatusCode::OK, "OK")
        }
        Ok((VerificationOutcome::Indeterminate, _)) => (StatusCode::OK, "OK"),
        Ok((VerificationOutcome::Rejected, _)) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
        Err(err) => {
            error!("Reward callback verification task failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// Hook for reward fulfilment once a callback is known to be authentic.
fn grant_reward(request: &CallbackRequest) {
    info!(
        transaction_id = request.param("transaction_id").unwrap_or_default(),
        user_id = request.param("user_id").unwrap_or_default(),
        reward_item = request.param("reward_item").unwrap_or_default(),
        reward_amount = request.param("reward_amount").unwrap_or_default(),
        "Verified reward callback"
    );
}

async fn reachable() -> StatusCode {
    StatusCode::OK
}

async fn redirect() -> Redirect {
    Redirect::temporary(VERIFY_REWARD_PATH)
}
