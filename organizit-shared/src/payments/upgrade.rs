/// Upgrade transaction: Initialize and Verify
///
/// Moves a user from `free` to `pro` through the payment processor.
///
/// # State machine
///
/// ```text
/// NONE ──initialize──▶ INITIALIZED ──verify──▶ VERIFIED
///   ▲                       │
///   └──────── FAILED ◀──────┘
///
/// webhook: NONE | INITIALIZED ──▶ VERIFIED
/// ```
///
/// A verdict only counts for the user the paid reference was issued to:
/// the processor's `tx_ref` must resolve to a live, unconsumed pending
/// upgrade owned by the caller. References are consumed on upgrade, so one
/// payment upgrades one user once.
///
/// The processor call always completes before any local write. The plan
/// flip itself is a single conditional update, so Verify racing a webhook
/// upgrades the user exactly once; the loser of the race reports
/// [`UpgradeError::AlreadyUpgraded`].
///
/// # Example
///
/// ```no_run
/// use organizit_shared::payments::upgrade::{UpgradeService, UpgradeSettings, VerifyRequest};
/// use organizit_shared::payments::mock::MockProcessor;
/// use organizit_shared::store::{MemoryStore, Store};
/// use std::sync::Arc;
/// # use organizit_shared::models::user::User;
///
/// # async fn example(user: User) -> Result<(), Box<dyn std::error::Error>> {
/// let service = UpgradeService::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(MockProcessor::new()),
///     UpgradeSettings::default(),
/// );
///
/// let session = service.initialize(&user).await?;
/// // ... browser pays at session.redirect_url ...
/// let verified = service
///     .verify(&user, VerifyRequest::by_reference(session.reference))
///     .await?;
/// assert!(verified.is_pro);
/// # Ok(())
/// # }
/// ```

use super::error::UpgradeError;
use super::processor::{
    Customer, Customizations, PaymentMeta, PaymentProcessor, PaymentRequest,
    TransactionVerification, VerificationId,
};
use super::reference::generate_reference;
use crate::models::pending_upgrade::PendingUpgrade;
use crate::models::user::{Plan, User};
use crate::store::{Store, UpgradeOutcome};
use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Status on a fresh payment session
pub const PENDING_STATUS: &str = "pending";

/// Message returned after a successful upgrade
pub const UPGRADE_SUCCESS_MESSAGE: &str = "Payment successful! You have been upgraded to Pro.";

/// Product and flow settings
#[derive(Debug, Clone)]
pub struct UpgradeSettings {
    /// Fixed price of the pro plan
    pub price: Decimal,

    pub currency: String,

    /// Browser lands on `{frontend_url}/payment/success?reference=...`
    pub frontend_url: String,

    /// Lifetime of a pending reference
    pub reference_ttl: Duration,

    /// Checkout title
    pub title: String,

    /// Checkout description
    pub description: String,
}

impl Default for UpgradeSettings {
    fn default() -> Self {
        Self {
            price: Decimal::from(2000),
            currency: "NGN".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            reference_ttl: Duration::minutes(30),
            title: "Organizit Pro Upgrade".to_string(),
            description: "Upgrade to Pro Plan - Unlimited Tasks".to_string(),
        }
    }
}

impl UpgradeSettings {
    /// Where the processor sends the browser for `reference`
    pub fn redirect_url(&self, reference: &str) -> String {
        format!(
            "{}/payment/success?reference={}",
            self.frontend_url.trim_end_matches('/'),
            reference
        )
    }
}

/// Result of a successful Initialize
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeSession {
    pub reference: String,

    /// Hosted checkout URL to send the browser to
    pub redirect_url: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    pub currency: String,

    pub description: String,

    /// Always `"pending"`
    pub status: String,
}

/// Identifiers supplied to Verify
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub reference: Option<String>,

    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl VerifyRequest {
    pub fn by_reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            transaction_id: None,
        }
    }

    pub fn by_transaction_id(transaction_id: impl Into<String>) -> Self {
        Self {
            reference: None,
            transaction_id: Some(transaction_id.into()),
        }
    }
}

/// Result of a successful Verify
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeVerified {
    pub plan: Plan,
    pub is_pro: bool,

    /// `null` for pro
    pub task_limit: Option<u32>,

    pub message: String,
}

impl UpgradeVerified {
    fn for_user(user: &User) -> Self {
        Self {
            plan: user.plan,
            is_pro: user.is_pro(),
            task_limit: user.plan.task_limit(),
            message: UPGRADE_SUCCESS_MESSAGE.to_string(),
        }
    }
}

/// Drives Initialize and Verify against a store and a processor
#[derive(Clone)]
pub struct UpgradeService {
    store: Arc<dyn Store>,
    processor: Arc<dyn PaymentProcessor>,
    settings: UpgradeSettings,
}

impl UpgradeService {
    pub fn new(
        store: Arc<dyn Store>,
        processor: Arc<dyn PaymentProcessor>,
        settings: UpgradeSettings,
    ) -> Self {
        Self {
            store,
            processor,
            settings,
        }
    }

    pub fn settings(&self) -> &UpgradeSettings {
        &self.settings
    }

    /// Opens a payment session for `user`
    ///
    /// # Errors
    ///
    /// - [`UpgradeError::AlreadyUpgraded`] if the user is pro (no external call)
    /// - [`UpgradeError::UpgradeInitFailed`] if the processor fails; nothing
    ///   is persisted in that case
    pub async fn initialize(&self, user: &User) -> Result<UpgradeSession, UpgradeError> {
        if user.is_pro() {
            return Err(UpgradeError::AlreadyUpgraded);
        }

        let reference = generate_reference();
        let request = PaymentRequest {
            tx_ref: reference.clone(),
            amount: self.settings.price,
            currency: self.settings.currency.clone(),
            redirect_url: self.settings.redirect_url(&reference),
            customer: Customer {
                email: user.email.clone(),
                name: user.name.clone(),
            },
            customizations: Customizations {
                title: self.settings.title.clone(),
                description: self.settings.description.clone(),
            },
            meta: PaymentMeta {
                user_id: user.id,
                plan: Plan::Pro.as_str().to_string(),
            },
        };

        let session = self.processor.create_payment(&request).await.map_err(|e| {
            error!(
                user_id = %user.id,
                reference = %reference,
                processor = self.processor.name(),
                error = %e,
                "Payment initialization failed"
            );
            UpgradeError::UpgradeInitFailed(e)
        })?;

        let pending = PendingUpgrade::new(reference.clone(), user.id, self.settings.reference_ttl);
        self.store.save_pending_upgrade(&pending).await?;

        info!(user_id = %user.id, reference = %reference, "Payment initialized");

        Ok(UpgradeSession {
            reference,
            redirect_url: session.link,
            amount: self.settings.price,
            currency: self.settings.currency.clone(),
            description: self.settings.description.clone(),
            status: PENDING_STATUS.to_string(),
        })
    }

    /// Confirms payment with the processor and flips `user` to pro
    ///
    /// A transaction id takes precedence over a reference.
    ///
    /// # Errors
    ///
    /// - [`UpgradeError::MissingIdentifier`] when neither identifier is given
    /// - [`UpgradeError::AlreadyUpgraded`] when the user is (or just became) pro
    /// - [`UpgradeError::VerificationFailed`] on a negative verdict, or an
    ///   unknown, expired or foreign reference (checked both for the
    ///   requested reference and for the `tx_ref` the processor reports)
    /// - [`UpgradeError::VerificationError`] when the processor is unreachable
    pub async fn verify(
        &self,
        user: &User,
        request: VerifyRequest,
    ) -> Result<UpgradeVerified, UpgradeError> {
        let id = VerificationId::select(
            request.transaction_id.as_deref(),
            request.reference.as_deref(),
        )
        .ok_or(UpgradeError::MissingIdentifier)?;

        if user.is_pro() {
            return Err(UpgradeError::AlreadyUpgraded);
        }

        if let VerificationId::Reference(reference) = &id {
            self.owned_reference(user.id, reference, "unknown_reference").await?;
        }

        let verdict = self.processor.verify_transaction(&id).await.map_err(|e| {
            error!(
                user_id = %user.id,
                identifier = %id,
                processor = self.processor.name(),
                error = %e,
                "Payment verification error"
            );
            UpgradeError::VerificationError(e)
        })?;

        self.check_verdict(user.id, &id, &verdict)?;

        let Some(tx_ref) = verdict.tx_ref() else {
            warn!(user_id = %user.id, identifier = %id, "Verified transaction carries no reference");
            return Err(UpgradeError::verification_failed("unknown_reference"));
        };
        self.owned_reference(user.id, tx_ref, "reference_mismatch").await?;

        match self.store.upgrade_to_pro(user.id).await? {
            UpgradeOutcome::Upgraded(upgraded) => {
                if let Err(e) = self.store.consume_pending_upgrades(user.id).await {
                    error!(user_id = %user.id, tx_ref = %tx_ref, error = %e, "Failed to consume pending upgrades");
                }
                info!(user_id = %user.id, identifier = %id, tx_ref = %tx_ref, "User upgraded to pro via verify");
                Ok(UpgradeVerified::for_user(&upgraded))
            }
            UpgradeOutcome::AlreadyPro(_) => {
                info!(user_id = %user.id, identifier = %id, "Verify lost race, user already pro");
                Err(UpgradeError::AlreadyUpgraded)
            }
            UpgradeOutcome::NotFound => Err(UpgradeError::Store(
                crate::store::StoreError::NotFound(format!("user {}", user.id)),
            )),
        }
    }

    /// Resolves `reference` to a live, unconsumed record issued to `user_id`
    ///
    /// A record owned by someone else fails with `foreign_status`. A consumed
    /// record of the caller means the upgrade already went through.
    async fn owned_reference(
        &self,
        user_id: Uuid,
        reference: &str,
        foreign_status: &str,
    ) -> Result<(), UpgradeError> {
        let Some(pending) = self.store.find_pending_upgrade(reference).await? else {
            warn!(user_id = %user_id, reference = %reference, "Unknown payment reference");
            return Err(UpgradeError::verification_failed("unknown_reference"));
        };

        if pending.user_id != user_id {
            warn!(
                user_id = %user_id,
                owner_id = %pending.user_id,
                reference = %reference,
                "Payment reference belongs to another user"
            );
            return Err(UpgradeError::verification_failed(foreign_status));
        }

        if pending.is_consumed() {
            info!(user_id = %user_id, reference = %reference, "Payment reference already redeemed");
            return Err(UpgradeError::AlreadyUpgraded);
        }

        if pending.is_expired() {
            self.store.delete_pending_upgrade(reference).await?;
            warn!(user_id = %user_id, reference = %reference, "Payment reference expired");
            return Err(UpgradeError::verification_failed("expired_reference"));
        }

        Ok(())
    }

    /// The processor's answer must describe a full, successful payment for
    /// the reference that was asked about
    fn check_verdict(
        &self,
        user_id: Uuid,
        id: &VerificationId,
        verdict: &TransactionVerification,
    ) -> Result<(), UpgradeError> {
        if let (VerificationId::Reference(reference), Some(tx_ref)) = (id, verdict.tx_ref()) {
            if tx_ref != reference {
                warn!(user_id = %user_id, reference = %reference, tx_ref = %tx_ref, "Processor returned a different reference");
                return Err(UpgradeError::verification_failed("reference_mismatch"));
            }
        }

        if !verdict.is_successful(self.settings.price) {
            warn!(
                user_id = %user_id,
                identifier = %id,
                status = %verdict.status,
                transaction_status = verdict.transaction_status(),
                "Payment not successful"
            );
            return Err(UpgradeError::verification_failed(verdict.transaction_status()));
        }

        Ok(())
    }
}
