use crate::error::RegistryError;
use crate::push as push_service;
use crate::state;
use crate::types::subscription::RawSubscription;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Serialize)]
pub(crate) struct RegisterResponse {
    pub(crate) ok: bool,
    pub(crate) stored: &'static str,
    pub(crate) path: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) reason: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct RegisterErrorResponse {
    pub(crate) ok: bool,
    pub(crate) error: String,
}

/// Malformed bodies get the same `{ok: false, error}` shape as invalid
/// subscriptions.
pub(crate) async fn register(
    State(state): State<state::AppState>,
    payload: Result<Json<RawSubscription>, JsonRejection>,
) -> Result<Json<RegisterResponse>, (StatusCode, Json<RegisterErrorResponse>)> {
    let Json(raw) = payload.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(RegisterErrorResponse {
                ok: false,
                error: rejection.body_text(),
            }),
        )
    })?;
    match state.registry.register(raw).await {
        Ok(result) => {
            info!(
                stored = result.outcome.as_str(),
                reason = result.reason.as_deref().unwrap_or_default(),
                "subscription registered"
            );
            Ok(Json(RegisterResponse {
                ok: true,
                stored: result.outcome.backend(),
                path: result.outcome.as_str(),
                reason: result.reason,
            }))
        }
        Err(err @ RegistryError::InvalidSubscription(_)) => Err((
            StatusCode::BAD_REQUEST,
            Json(RegisterErrorResponse {
                ok: false,
                error: err.to_string(),
            }),
        )),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BroadcastRequest {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) body: Option<String>,
    #[serde(default)]
    pub(crate) url: Option<String>,
}

/// An empty body broadcasts the default message.
pub(crate) async fn broadcast(
    State(state): State<state::AppState>,
    body: Bytes,
) -> Result<Json<push_service::BroadcastResult>, (StatusCode, Json<ErrorResponse>)> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        BroadcastRequest::default()
    } else {
        serde_json::from_slice::<BroadcastRequest>(&body).map_err(|err| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("invalid broadcast request: {err}"),
                }),
            )
        })?
    };
    let message = push_service::BroadcastMessage::new(request.title, request.body, request.url);

    match push_service::broadcast(&state.config, state.registry.as_ref(), &message).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => {
            error!(error = %err, "broadcast aborted");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            ))
        }
    }
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, (StatusCode, Json<ErrorResponse>)> {
    match push_service::load_vapid_config(&state.config) {
        push_service::VapidConfigStatus::Ready(vapid) => Ok(Json(PublicKeyResponse {
            public_key: vapid.public_key,
        })),
        push_service::VapidConfigStatus::Incomplete | push_service::VapidConfigStatus::Missing => {
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "Push notifications are not configured.".to_string(),
                }),
            ))
        }
    }
}
