//! Webhook API handlers.
//!
//! Both endpoints require a valid `X-Shopify-Hmac-Sha256` signature over
//! the raw request body, enforced by the [`VerifiedWebhook`] extractor
//! before anything else happens.
//!
//! # Endpoints
//!
//! - `POST /webhook/orders`       – ingest an order-creation webhook
//! - `POST /webhook/fulfillments` – mark an order as shipped

pub mod extractors;
mod webhooks;

use axum::{Router, http::StatusCode, response::IntoResponse, routing::post};
use serde::Serialize;
use shoptab_core::reconciler::ReconcileError;

use crate::state::AppState;

/// Build the webhook API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(webhooks::orders))
        .route("/fulfillments", post(webhooks::fulfillments))
}

/// Outcome tag returned to the webhook sender.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in webhook handlers, after authentication.
#[derive(Debug)]
enum WebhookApiError {
    /// A required order field was missing or unparsable.
    Malformed(ReconcileError),
    /// A call to the remote store failed.
    Store(ReconcileError),
}

impl From<ReconcileError> for WebhookApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Store(_) => Self::Store(err),
            _ => Self::Malformed(err),
        }
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            WebhookApiError::Malformed(e) => {
                tracing::warn!(error = %e, "malformed webhook payload");
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            WebhookApiError::Store(e) => {
                tracing::error!(error = %e, "remote store call failed");
                (StatusCode::BAD_GATEWAY, "remote store error").into_response()
            }
        }
    }
}
