/// Payment upgrade flow
///
/// # Modules
///
/// - `processor`: the [`PaymentProcessor`] contract and wire types
/// - `flutterwave`: production processor over HTTPS
/// - `mock`: scripted processor for tests
/// - `reference`: `PAY_` reference generation
/// - `upgrade`: Initialize and Verify
/// - `webhook`: signature check and asynchronous confirmation
/// - `error`: error types
///
/// # Flow
///
/// ```text
/// client ──POST /payment/initialize──▶ UpgradeService::initialize ──▶ processor
///   │                                                 (PendingUpgrade saved)
///   ▼
/// browser pays, lands on /payment/success?reference=...
///   │
///   ├──GET /payment/verify──▶ UpgradeService::verify ──▶ processor ──▶ plan = pro
///   │
/// processor ──POST /payment/webhook──▶ WebhookHandler::handle ──▶ plan = pro
/// ```

pub mod error;
pub mod flutterwave;
pub mod mock;
pub mod processor;
pub mod reference;
pub mod upgrade;
pub mod webhook;

pub use error::{ProcessorError, UpgradeError};
pub use processor::{PaymentProcessor, VerificationId};
pub use upgrade::{UpgradeService, UpgradeSettings};
pub use webhook::{WebhookHandler, WebhookVerifier};
