//! Payment processor webhooks
//!
//! Flutterwave calls the webhook directly, outside any user session. The
//! handler authenticates the call with the shared `verif-hash` secret, then
//! upgrades the user named in the payment metadata.
//!
//! The processor always gets a 200: `"received"` when the payload was not
//! acted on (bad signature, malformed, not a success), `"success"` once a
//! successful payment was processed, including idempotent redeliveries.

use super::processor::TRANSACTION_SUCCESSFUL;
use crate::store::{Store, UpgradeOutcome};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the shared secret hash
pub const SIGNATURE_HEADER: &str = "verif-hash";

/// Why a webhook signature was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Webhook secret hash is not configured")]
    NotConfigured,

    #[error("Webhook signature header missing")]
    Missing,

    #[error("Webhook signature mismatch")]
    Mismatch,
}

/// Checks the `verif-hash` header against the configured secret
///
/// Fails closed: with no secret configured every call is refused.
pub struct WebhookVerifier {
    secret_hash: Option<String>,
    compare_key: [u8; 32],
}

impl WebhookVerifier {
    pub fn new(secret_hash: Option<String>) -> Self {
        let mut compare_key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut compare_key);

        Self {
            secret_hash: secret_hash.filter(|s| !s.is_empty()),
            compare_key,
        }
    }

    pub fn verify(&self, signature: Option<&str>) -> Result<(), SignatureError> {
        let expected = self.secret_hash.as_deref().ok_or(SignatureError::NotConfigured)?;
        let provided = signature.ok_or(SignatureError::Missing)?;

        if self.constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    /// Compares MACs of both values so timing leaks neither content nor length
    fn constant_time_eq(&self, a: &[u8], b: &[u8]) -> bool {
        let (Ok(mut mac_a), Ok(mut mac_b)) = (
            HmacSha256::new_from_slice(&self.compare_key),
            HmacSha256::new_from_slice(&self.compare_key),
        ) else {
            return false;
        };

        mac_a.update(a);
        mac_b.update(b);
        let tag = mac_a.finalize().into_bytes();

        mac_b.verify_slice(&tag).is_ok()
    }
}

/// Acknowledgement body status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookAck {
    /// Payload not acted on
    Received,

    /// Successful payment processed
    Success,
}

impl WebhookAck {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookAck::Received => "received",
            WebhookAck::Success => "success",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            WebhookAck::Received => "Webhook processed",
            WebhookAck::Success => "Webhook processed successfully",
        }
    }
}

/// What the handler did with a delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Signature refused, nothing done
    Unauthenticated(SignatureError),

    /// Body unparseable or missing `tx_ref` / `status`
    Malformed,

    /// Payment status other than successful
    NotSuccessful { status: String },

    /// No usable user id in the metadata
    UnresolvedUser,

    /// Paid amount below the plan price
    Underpaid,

    /// User id does not exist
    UserNotFound(Uuid),

    /// Redelivery for a user already on pro
    AlreadyPro(Uuid),

    /// Plan flipped by this delivery
    Upgraded(Uuid),

    /// Local write failed
    StoreFailed,
}

impl WebhookOutcome {
    pub fn ack(&self) -> WebhookAck {
        match self {
            WebhookOutcome::Unauthenticated(_)
            | WebhookOutcome::Malformed
            | WebhookOutcome::NotSuccessful { .. }
            | WebhookOutcome::StoreFailed => WebhookAck::Received,
            WebhookOutcome::UnresolvedUser
            | WebhookOutcome::Underpaid
            | WebhookOutcome::UserNotFound(_)
            | WebhookOutcome::AlreadyPro(_)
            | WebhookOutcome::Upgraded(_) => WebhookAck::Success,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WebhookMeta {
    #[serde(default)]
    user_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    #[serde(default)]
    tx_ref: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    meta: Option<WebhookMeta>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Option<WebhookData>,
    #[serde(default)]
    meta_data: Option<WebhookMeta>,
}

/// Accepts a user id as a UUID string
fn parse_user_id(value: Option<&serde_json::Value>) -> Option<Uuid> {
    match value? {
        serde_json::Value::String(s) => Uuid::parse_str(s.trim()).ok(),
        _ => None,
    }
}

/// Processes webhook deliveries
pub struct WebhookHandler {
    store: Arc<dyn Store>,
    verifier: WebhookVerifier,
    expected_amount: Decimal,
}

impl WebhookHandler {
    pub fn new(store: Arc<dyn Store>, verifier: WebhookVerifier, expected_amount: Decimal) -> Self {
        Self {
            store,
            verifier,
            expected_amount,
        }
    }

    /// Authenticates and applies one delivery
    pub async fn handle(&self, body: &[u8], signature: Option<&str>) -> WebhookOutcome {
        if let Err(e) = self.verifier.verify(signature) {
            warn!(reason = %e, "Rejected webhook signature");
            return WebhookOutcome::Unauthenticated(e);
        }

        let payload: WebhookPayload = match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Malformed webhook payload");
                return WebhookOutcome::Malformed;
            }
        };

        let Some(data) = payload.data else {
            warn!("Webhook payload missing data");
            return WebhookOutcome::Malformed;
        };
        let (Some(tx_ref), Some(status)) = (data.tx_ref, data.status) else {
            warn!("Webhook payload missing tx_ref or status");
            return WebhookOutcome::Malformed;
        };

        info!(tx_ref = %tx_ref, status = %status, event = ?payload.event, "Webhook received");

        if status != TRANSACTION_SUCCESSFUL {
            debug!(tx_ref = %tx_ref, status = %status, "Ignoring unsuccessful payment");
            return WebhookOutcome::NotSuccessful { status };
        }

        let user_id = parse_user_id(data.meta.as_ref().and_then(|m| m.user_id.as_ref()))
            .or_else(|| parse_user_id(payload.meta_data.as_ref().and_then(|m| m.user_id.as_ref())));
        let Some(user_id) = user_id else {
            warn!(tx_ref = %tx_ref, "Webhook has no resolvable user id");
            return WebhookOutcome::UnresolvedUser;
        };

        if let Some(amount) = data.amount {
            if amount < self.expected_amount {
                warn!(
                    user_id = %user_id,
                    tx_ref = %tx_ref,
                    amount = %amount,
                    expected = %self.expected_amount,
                    "Webhook payment below plan price"
                );
                return WebhookOutcome::Underpaid;
            }
        }

        match self.store.upgrade_to_pro(user_id).await {
            Ok(UpgradeOutcome::Upgraded(_)) => {
                if let Err(e) = self.store.consume_pending_upgrades(user_id).await {
                    error!(user_id = %user_id, error = %e, "Failed to consume pending upgrades");
                }
                info!(user_id = %user_id, tx_ref = %tx_ref, "User upgraded to pro via webhook");
                WebhookOutcome::Upgraded(user_id)
            }
            Ok(UpgradeOutcome::AlreadyPro(_)) => {
                debug!(user_id = %user_id, tx_ref = %tx_ref, "User already pro");
                WebhookOutcome::AlreadyPro(user_id)
            }
            Ok(UpgradeOutcome::NotFound) => {
                warn!(user_id = %user_id, tx_ref = %tx_ref, "User not found for webhook upgrade");
                WebhookOutcome::UserNotFound(user_id)
            }
            Err(e) => {
                error!(user_id = %user_id, tx_ref = %tx_ref, error = %e, "Webhook upgrade failed");
                WebhookOutcome::StoreFailed
            }
        }
    }
}
