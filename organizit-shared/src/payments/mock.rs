/// Scripted payment processor for tests and local runs
///
/// The mock answers from a table of canned verdicts and records every call,
/// so tests can assert that a code path made no external call at all.
///
/// # Behaviour
///
/// - `create_payment` returns a link under `https://checkout.mock/` unless a
///   failure has been scripted with [`MockProcessor::fail_create_with`]
/// - `verify_transaction` looks the identifier up in the scripted verdicts;
///   unknown identifiers get a 404 `Rejected` error
/// - [`MockProcessor::fail_verify_with`] makes every verify fail
///
/// # Example
///
/// ```
/// use organizit_shared::payments::mock::MockProcessor;
/// use organizit_shared::payments::processor::TransactionVerification;
/// use rust_decimal::Decimal;
///
/// let processor = MockProcessor::new();
/// processor.script_verification(
///     "288200108",
///     TransactionVerification::successful("PAY_ABC", Decimal::from(2000)),
/// );
/// assert_eq!(processor.verify_calls(), 0);
/// ```

use super::error::ProcessorError;
use super::processor::{
    PaymentProcessor, PaymentRequest, PaymentSession, TransactionVerification, VerificationId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Script {
    create_failure: Option<ProcessorError>,
    verify_failure: Option<ProcessorError>,
    verdicts: HashMap<String, TransactionVerification>,
    requests: Vec<PaymentRequest>,
}

/// In-process [`PaymentProcessor`] with scripted answers
#[derive(Default)]
pub struct MockProcessor {
    script: Mutex<Script>,
    create_calls: AtomicUsize,
    verify_calls: AtomicUsize,
}

impl MockProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers verification of `identifier` (transaction id or reference) with `verdict`
    pub fn script_verification(&self, identifier: impl Into<String>, verdict: TransactionVerification) {
        if let Ok(mut script) = self.script.lock() {
            script.verdicts.insert(identifier.into(), verdict);
        }
    }

    /// Makes every `create_payment` fail with `error`
    pub fn fail_create_with(&self, error: ProcessorError) {
        if let Ok(mut script) = self.script.lock() {
            script.create_failure = Some(error);
        }
    }

    /// Makes every `verify_transaction` fail with `error`
    pub fn fail_verify_with(&self, error: ProcessorError) {
        if let Ok(mut script) = self.script.lock() {
            script.verify_failure = Some(error);
        }
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    /// Every payment request received, oldest first
    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.script
            .lock()
            .map(|script| script.requests.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Script>, ProcessorError> {
        self.script
            .lock()
            .map_err(|_| ProcessorError::Transport("mock processor poisoned".to_string()))
    }
}

#[async_trait]
impl PaymentProcessor for MockProcessor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentSession, ProcessorError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.lock()?;
        script.requests.push(request.clone());

        if let Some(error) = &script.create_failure {
            return Err(error.clone());
        }

        Ok(PaymentSession {
            link: format!("https://checkout.mock/pay/{}", request.tx_ref),
        })
    }

    async fn verify_transaction(
        &self,
        id: &VerificationId,
    ) -> Result<TransactionVerification, ProcessorError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.lock()?;

        if let Some(error) = &script.verify_failure {
            return Err(error.clone());
        }

        script
            .verdicts
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ProcessorError::Rejected {
                status: 404,
                message: "No transaction was found for this id".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::processor::{Customer, Customizations, PaymentMeta};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn request() -> PaymentRequest {
        PaymentRequest {
            tx_ref: "PAY_TEST".to_string(),
            amount: Decimal::from(2000),
            currency: "NGN".to_string(),
            redirect_url: "http://localhost/payment/success?reference=PAY_TEST".to_string(),
            customer: Customer {
                email: "ada@example.com".to_string(),
                name: "Ada".to_string(),
            },
            customizations: Customizations {
                title: "t".to_string(),
                description: "d".to_string(),
            },
            meta: PaymentMeta {
                user_id: Uuid::new_v4(),
                plan: "pro".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_create_payment_records_request() {
        let mock = MockProcessor::new();
        let session = mock.create_payment(&request()).await.unwrap();

        assert_eq!(session.link, "https://checkout.mock/pay/PAY_TEST");
        assert_eq!(mock.create_calls(), 1);
        assert_eq!(mock.requests()[0].tx_ref, "PAY_TEST");
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let mock = MockProcessor::new();
        mock.fail_create_with(ProcessorError::Timeout);
        mock.fail_verify_with(ProcessorError::Timeout);

        assert_eq!(mock.create_payment(&request()).await, Err(ProcessorError::Timeout));
        assert_eq!(
            mock.verify_transaction(&VerificationId::Reference("PAY_TEST".to_string()))
                .await,
            Err(ProcessorError::Timeout)
        );
    }

    #[tokio::test]
    async fn test_unknown_transaction_is_rejected() {
        let mock = MockProcessor::new();
        mock.script_verification(
            "42",
            TransactionVerification::successful("PAY_TEST", Decimal::from(2000)),
        );

        assert!(mock
            .verify_transaction(&VerificationId::TransactionId("42".to_string()))
            .await
            .is_ok());
        assert!(matches!(
            mock.verify_transaction(&VerificationId::TransactionId("43".to_string()))
                .await,
            Err(ProcessorError::Rejected { status: 404, .. })
        ));
        assert_eq!(mock.verify_calls(), 2);
    }
}
