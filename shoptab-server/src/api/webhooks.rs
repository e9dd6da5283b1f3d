//! Webhook handlers.

use axum::{Json, extract::State, response::IntoResponse};
use shoptab_core::payload::{FulfillmentPayload, OrderPayload};
use shoptab_core::reconciler::{FulfillmentOutcome, IngestOutcome};

use super::{StatusResponse, WebhookApiError};
use crate::api::extractors::VerifiedWebhook;
use crate::state::AppState;

/// Shipping status applied for every fulfillment event. The event's own
/// status field is never read, so partial and cancelled fulfillments land
/// here too.
const FULFILLMENT_SHIPPING_STATUS: &str = "Shipped";

/// `POST /webhook/orders` — ingest an order-creation webhook.
pub(super) async fn orders(
    State(state): State<AppState>,
    VerifiedWebhook(order): VerifiedWebhook<OrderPayload>,
) -> Result<impl IntoResponse, WebhookApiError> {
    let outcome = state.reconciler.ingest_order(&order).await?;
    let status = match outcome {
        IngestOutcome::Created => "created",
        IngestOutcome::DuplicateSkipped => "skipped",
        IngestOutcome::CustomerFailed => "customer failed",
    };
    Ok(Json(StatusResponse { status }))
}

/// `POST /webhook/fulfillments` — mark an order as shipped.
pub(super) async fn fulfillments(
    State(state): State<AppState>,
    VerifiedWebhook(event): VerifiedWebhook<FulfillmentPayload>,
) -> Result<impl IntoResponse, WebhookApiError> {
    let Some(order_id) = event.order_id else {
        tracing::warn!("fulfillment event without an order id");
        return Ok(Json(StatusResponse {
            status: "no order id",
        }));
    };

    let outcome = state
        .reconciler
        .record_fulfillment(&order_id.to_string(), FULFILLMENT_SHIPPING_STATUS)
        .await?;
    let status = match outcome {
        FulfillmentOutcome::Updated => "shipped",
        FulfillmentOutcome::NotFound => "not found",
    };
    Ok(Json(StatusResponse { status }))
}
