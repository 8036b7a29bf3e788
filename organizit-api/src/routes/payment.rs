/// Pro upgrade endpoints
///
/// # Endpoints
///
/// - `POST /api/payment/initialize` - Open a checkout session (JWT)
/// - `GET /api/payment/verify` - Confirm a payment and upgrade (JWT)
/// - `POST /api/payment/webhook` - Processor notification (signature header)
///
/// The webhook always answers `200 OK`; the processor retries anything else
/// and a retry can never change the outcome.

use crate::{app::AppState, error::ApiResult, routes::current_user};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Extension, Json,
};
use organizit_shared::{
    auth::middleware::AuthContext,
    payments::upgrade::{UpgradeSession, UpgradeVerified, VerifyRequest},
    payments::webhook::SIGNATURE_HEADER,
};
use serde::Serialize;

/// Webhook acknowledgement body
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// `"success"` or `"received"`
    pub status: String,

    pub message: String,
}

/// Initialize upgrade
///
/// # Endpoint
///
/// ```text
/// POST /api/payment/initialize
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "reference": "PAY_7GQ2K9D1XZ0B4M8R",
///   "redirect_url": "https://checkout.flutterwave.com/v3/hosted/pay/...",
///   "amount": 2000.0,
///   "currency": "NGN",
///   "description": "Upgrade to Pro Plan - Unlimited Tasks",
///   "status": "pending"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request` (`already_upgraded`): User is already pro
/// - `500 Internal Server Error` (`upgrade_init_failed`): Processor unavailable
pub async fn initialize(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UpgradeSession>> {
    let user = current_user(&state, &auth).await?;
    let session = state.upgrades.initialize(&user).await?;
    Ok(Json(session))
}

/// Verify payment
///
/// # Endpoint
///
/// ```text
/// GET /api/payment/verify?reference=PAY_...&transaction_id=123456
/// Authorization: Bearer <jwt_token>
/// ```
///
/// `transaction_id` wins when both are given.
///
/// # Response
///
/// ```json
/// {
///   "plan": "pro",
///   "is_pro": true,
///   "task_limit": null,
///   "message": "Payment successful! You have been upgraded to Pro."
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: `missing_identifier`, `already_upgraded`, or
///   `verification_failed` (with the transaction `status`)
/// - `500 Internal Server Error` (`verification_error`): Processor unavailable
pub async fn verify(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(request): Query<VerifyRequest>,
) -> ApiResult<Json<UpgradeVerified>> {
    let user = current_user(&state, &auth).await?;
    let verified = state.upgrades.verify(&user, request).await?;
    Ok(Json(verified))
}

/// Payment webhook
///
/// Takes the raw body so a malformed payload is still acknowledged.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookResponse> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state.webhooks.handle(&body, signature).await;
    tracing::debug!(outcome = ?outcome, "Webhook handled");

    let ack = outcome.ack();
    Json(WebhookResponse {
        status: ack.as_str().to_string(),
        message: ack.message().to_string(),
    })
}
