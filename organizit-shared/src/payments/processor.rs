/// Payment processor contract
///
/// The upgrade flow talks to the processor through [`PaymentProcessor`]:
/// one call to open a hosted payment session, one call to fetch the
/// authoritative status of a transaction. Payload shapes follow the
/// Flutterwave v3 API.
///
/// # Verification verdict
///
/// ```text
/// status == "success"
///   ∧ data.status == "successful"
///   ∧ data.amount >= expected price
///   ⇒ commit
/// ```
///
/// # Example
///
/// ```
/// use organizit_shared::payments::processor::TransactionVerification;
/// use rust_decimal::Decimal;
///
/// let verdict = TransactionVerification::successful("PAY_ABC", Decimal::from(2000));
/// assert!(verdict.is_successful(Decimal::from(2000)));
/// assert!(!verdict.is_successful(Decimal::from(5000)));
/// ```

use super::error::ProcessorError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Processor's overall "call succeeded" status
pub const STATUS_SUCCESS: &str = "success";

/// Processor's "transaction paid" status
pub const TRANSACTION_SUCCESSFUL: &str = "successful";

/// Buyer contact info
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub email: String,
    pub name: String,
}

/// Hosted checkout branding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customizations {
    pub title: String,
    pub description: String,
}

/// Metadata echoed back by the processor in webhooks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMeta {
    pub user_id: Uuid,
    pub plan: String,
}

/// Request to open a payment session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRequest {
    /// Our reference for this attempt
    pub tx_ref: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    pub currency: String,

    /// Where the processor sends the browser afterwards
    pub redirect_url: String,

    pub customer: Customer,

    pub customizations: Customizations,

    pub meta: PaymentMeta,
}

/// Opened payment session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Hosted checkout URL
    pub link: String,
}

/// How to look a transaction up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationId {
    /// Processor-assigned transaction id
    TransactionId(String),

    /// Our `tx_ref`
    Reference(String),
}

impl VerificationId {
    /// Picks the identifier to verify with
    ///
    /// A non-empty transaction id wins over a reference. Blank strings count
    /// as absent.
    pub fn select(transaction_id: Option<&str>, reference: Option<&str>) -> Option<Self> {
        fn present(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }

        if let Some(id) = present(transaction_id) {
            return Some(VerificationId::TransactionId(id.to_string()));
        }
        present(reference).map(|r| VerificationId::Reference(r.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            VerificationId::TransactionId(id) | VerificationId::Reference(id) => id,
        }
    }
}

impl fmt::Display for VerificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationId::TransactionId(id) => write!(f, "transaction_id={}", id),
            VerificationId::Reference(r) => write!(f, "reference={}", r),
        }
    }
}

/// Transaction details from the processor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionData {
    #[serde(default)]
    pub id: Option<serde_json::Value>,

    #[serde(default)]
    pub tx_ref: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub amount: Option<Decimal>,

    #[serde(default)]
    pub currency: Option<String>,
}

/// Processor's answer to a verification lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionVerification {
    /// Overall call status (`"success"` / `"error"`)
    pub status: String,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub data: Option<TransactionData>,
}

impl TransactionVerification {
    /// A paid transaction
    pub fn successful(tx_ref: impl Into<String>, amount: Decimal) -> Self {
        Self::with_status(tx_ref, TRANSACTION_SUCCESSFUL, amount)
    }

    /// A transaction in an arbitrary state
    pub fn with_status(tx_ref: impl Into<String>, status: impl Into<String>, amount: Decimal) -> Self {
        TransactionVerification {
            status: STATUS_SUCCESS.to_string(),
            message: None,
            data: Some(TransactionData {
                id: None,
                tx_ref: Some(tx_ref.into()),
                status: Some(status.into()),
                amount: Some(amount),
                currency: None,
            }),
        }
    }

    /// All three commit conditions hold
    pub fn is_successful(&self, expected_amount: Decimal) -> bool {
        let Some(data) = &self.data else {
            return false;
        };

        self.status == STATUS_SUCCESS
            && data.status.as_deref() == Some(TRANSACTION_SUCCESSFUL)
            && data.amount.is_some_and(|amount| amount >= expected_amount)
    }

    /// Transaction status for diagnostics (`"unknown"` if absent)
    pub fn transaction_status(&self) -> &str {
        self.data
            .as_ref()
            .and_then(|d| d.status.as_deref())
            .unwrap_or("unknown")
    }

    pub fn tx_ref(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.tx_ref.as_deref())
    }
}

/// External payment processor
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Processor name for logs
    fn name(&self) -> &str;

    /// Opens a hosted payment session
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentSession, ProcessorError>;

    /// Fetches the authoritative transaction status
    async fn verify_transaction(
        &self,
        id: &VerificationId,
    ) -> Result<TransactionVerification, ProcessorError>;
}
