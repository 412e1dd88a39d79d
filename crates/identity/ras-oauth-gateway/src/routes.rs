//! axum routes for the exchange and validation endpoints.

use crate::error::GatewayError;
use crate::gateway::CodeExchangeGateway;
use crate::validator::ProviderTokenValidator;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use ras_oauth_core::{ErrorBody, ExchangeRequest, TokenBundle, ValidateResponse};
use std::sync::Arc;
use tracing::{info, warn};

pub const CALLBACK_PATH: &str = "/api/auth/callback";
pub const VALIDATE_PATH: &str = "/api/auth/validate";

/// State shared by the auth handlers
#[derive(Clone)]
pub struct GatewayState {
    pub gateway: Arc<CodeExchangeGateway>,
    pub validator: ProviderTokenValidator,
}

impl GatewayState {
    pub fn new(gateway: CodeExchangeGateway) -> Self {
        let validator = ProviderTokenValidator::new(gateway.provider().clone());
        Self {
            gateway: Arc::new(gateway),
            validator,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.reason().to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Router exposing `POST /api/auth/callback` and `POST /api/auth/validate`.
pub fn auth_router(state: GatewayState) -> Router {
    Router::new()
        .route(CALLBACK_PATH, post(callback_handler))
        .route(VALIDATE_PATH, post(validate_handler))
        .with_state(state)
}

async fn callback_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Result<Json<ExchangeRequest>, JsonRejection>,
) -> Result<Json<TokenBundle>, GatewayError> {
    // An unreadable body carries no code or state.
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected callback body: {}", rejection);
            return Err(GatewayError::MissingParameters);
        }
    };

    let bundle = state.gateway.exchange(&request, &headers).await?;
    Ok(Json(bundle))
}

async fn validate_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> (StatusCode, Json<ValidateResponse>) {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or_default();

    match state.validator.validate_profile(token).await {
        Ok(user) => {
            info!("Validated bearer token");
            (StatusCode::OK, Json(ValidateResponse::valid(user)))
        }
        Err(e) => (e.status_code(), Json(ValidateResponse::invalid(e.reason()))),
    }
}
