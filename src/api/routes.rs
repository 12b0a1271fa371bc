use crate::api::api_error::APIError;
use crate::api::model::{ChallengeRequest, ChallengeResult};
use crate::api::server::AppState;
use crate::error::Error;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::str::FromStr;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use trust_dns_client::rr::Name;

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/present", post(present))
        .route("/cleanup", post(clean_up))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn present(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ChallengeRequest>, APIError>,
) -> Result<Json<ChallengeResult>, APIError> {
    // The literal fqdn is stored as supplied; it only has to parse as a name.
    Name::from_str(&payload.fqdn).map_err(Error::DNSError)?;
    if let Err(err) = payload.valid_dns01() {
        tracing::warn!(
            "token presented for \"{}\" is not a DNS-01 challenge response: {err}",
            payload.fqdn
        );
    }
    state.presenter.present(&payload.fqdn, &payload.txt).await?;
    tracing::info!("presented record for \"{}\"", payload.fqdn);
    Ok(Json(ChallengeResult { txt: payload.txt }))
}

async fn clean_up(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ChallengeRequest>, APIError>,
) -> Result<Json<serde_json::Value>, APIError> {
    Name::from_str(&payload.fqdn).map_err(Error::DNSError)?;
    state
        .presenter
        .clean_up(&payload.fqdn, &payload.txt)
        .await?;
    tracing::info!("cleaned up record for \"{}\"", payload.fqdn);
    Ok(Json(json!({})))
}
