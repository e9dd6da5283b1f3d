//! Custom Axum extractor for webhook authentication.
//!
//! [`VerifiedWebhook<T>`] captures the raw request body, checks the
//! `X-Shopify-Hmac-Sha256` signature over those exact bytes, and only then
//! deserializes the JSON payload. The verification itself lives in
//! [`shoptab_core::signature`].

use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use shoptab_core::signature::{self, SIGNATURE_HEADER};

use crate::state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// An Axum extractor that authenticates and deserializes a webhook body.
///
/// The signature must cover the body bytes exactly as received; the JSON is
/// decoded only after verification succeeds, so a request is rejected
/// before its contents are even looked at.
pub struct VerifiedWebhook<T>(pub T);

/// Errors that can occur during webhook extraction.
///
/// 401 is reserved exclusively for signature failure; everything else that
/// goes wrong with the request itself is a 400.
#[derive(Debug, thiserror::Error)]
pub enum WebhookRejection {
    #[error("missing or invalid webhook signature")]
    Unauthorized,
    #[error("failed to read request body")]
    BodyRead,
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        match self {
            WebhookRejection::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            WebhookRejection::BodyRead => {
                (StatusCode::BAD_REQUEST, "failed to read request body").into_response()
            }
            WebhookRejection::Json(_) => {
                (StatusCode::BAD_REQUEST, "invalid JSON body").into_response()
            }
        }
    }
}

impl<T: DeserializeOwned + Send> FromRequest<AppState> for VerifiedWebhook<T> {
    type Rejection = WebhookRejection;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let signature_header = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|_| WebhookRejection::BodyRead)?;

        if !signature::verify(&body, signature_header.as_deref(), &state.webhook_secret) {
            tracing::warn!("webhook signature verification failed");
            return Err(WebhookRejection::Unauthorized);
        }

        let payload = serde_json::from_slice(&body)?;
        Ok(Self(payload))
    }
}
