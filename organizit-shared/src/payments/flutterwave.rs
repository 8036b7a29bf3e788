/// Flutterwave v3 client
///
/// # Endpoints
///
/// | Call | Request |
/// |---|---|
/// | create payment | `POST {base}/v3/payments` |
/// | verify by id | `GET {base}/v3/transactions/{id}/verify` |
/// | verify by reference | `GET {base}/v3/transactions/verify_by_reference?tx_ref=` |
///
/// Every request carries `Authorization: Bearer {secret_key}` and is bounded
/// by the client timeout. Timeouts surface as [`ProcessorError::Timeout`].
///
/// # Example
///
/// ```no_run
/// use organizit_shared::payments::flutterwave::{FlutterwaveClient, FlutterwaveConfig};
/// use organizit_shared::payments::processor::{PaymentProcessor, VerificationId};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = FlutterwaveClient::new(FlutterwaveConfig {
///     secret_key: std::env::var("FLW_SECRET_KEY")?,
///     ..Default::default()
/// })?;
///
/// let verdict = client
///     .verify_transaction(&VerificationId::TransactionId("288200108".to_string()))
///     .await?;
/// println!("{}", verdict.transaction_status());
/// # Ok(())
/// # }
/// ```

use super::error::ProcessorError;
use super::processor::{
    PaymentProcessor, PaymentRequest, PaymentSession, TransactionData, TransactionVerification,
    VerificationId, STATUS_SUCCESS,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Production API host
pub const DEFAULT_BASE_URL: &str = "https://api.flutterwave.com";

/// Client configuration
#[derive(Debug, Clone)]
pub struct FlutterwaveConfig {
    /// Secret key (`FLWSECK-...`)
    pub secret_key: String,

    /// API host, overridable for sandboxes and tests
    pub base_url: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for FlutterwaveConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Standard Flutterwave response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// Payment processor backed by the Flutterwave REST API
pub struct FlutterwaveClient {
    http: Client,
    base_url: Url,
    secret_key: String,
}

impl FlutterwaveClient {
    /// Builds a client with the configured timeout
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::Config`] if the secret key is empty or the
    /// base URL cannot be parsed.
    pub fn new(config: FlutterwaveConfig) -> Result<Self, ProcessorError> {
        if config.secret_key.trim().is_empty() {
            return Err(ProcessorError::Config("secret key is empty".to_string()));
        }

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ProcessorError::Config(format!("invalid base url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProcessorError::Config(format!(
                "base url cannot be a base: {}",
                config.base_url
            )));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProcessorError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            secret_key: config.secret_key,
        })
    }

    /// Joins path segments onto the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProcessorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProcessorError::Config("base url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Envelope<T>, ProcessorError> {
        let response = request.bearer_auth(&self.secret_key).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<Envelope<serde_json::Value>>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| "Unknown error".to_string());

            warn!(status = status.as_u16(), message = %message, "Flutterwave request rejected");

            return Err(ProcessorError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Envelope<T>>().await?)
    }
}

#[derive(Debug, Deserialize)]
struct CreatedPayment {
    link: String,
}

#[async_trait]
impl PaymentProcessor for FlutterwaveClient {
    fn name(&self) -> &str {
        "flutterwave"
    }

    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentSession, ProcessorError> {
        let url = self.endpoint(&["v3", "payments"])?;
        debug!(tx_ref = %request.tx_ref, "Creating Flutterwave payment");

        let envelope: Envelope<CreatedPayment> = self.send(self.http.post(url).json(request)).await?;

        if envelope.status != STATUS_SUCCESS {
            return Err(ProcessorError::InvalidResponse(
                envelope
                    .message
                    .unwrap_or_else(|| format!("unexpected status {}", envelope.status)),
            ));
        }

        envelope
            .data
            .map(|data| PaymentSession { link: data.link })
            .ok_or_else(|| ProcessorError::InvalidResponse("missing payment link".to_string()))
    }

    async fn verify_transaction(
        &self,
        id: &VerificationId,
    ) -> Result<TransactionVerification, ProcessorError> {
        let request = match id {
            VerificationId::TransactionId(transaction_id) => {
                let url = self.endpoint(&["v3", "transactions", transaction_id.as_str(), "verify"])?;
                self.http.get(url)
            }
            VerificationId::Reference(reference) => {
                let url = self.endpoint(&["v3", "transactions", "verify_by_reference"])?;
                self.http.get(url).query(&[("tx_ref", reference.as_str())])
            }
        };

        debug!(identifier = %id, "Verifying Flutterwave transaction");

        let envelope: Envelope<TransactionData> = self.send(request).await?;

        Ok(TransactionVerification {
            status: envelope.status,
            message: envelope.message,
            data: envelope.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> FlutterwaveClient {
        FlutterwaveClient::new(FlutterwaveConfig {
            secret_key: "FLWSECK_TEST-abc".to_string(),
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_empty_secret_key() {
        let result = FlutterwaveClient::new(FlutterwaveConfig::default());
        assert!(matches!(result, Err(ProcessorError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let result = FlutterwaveClient::new(FlutterwaveConfig {
            secret_key: "key".to_string(),
            base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(ProcessorError::Config(_))));
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let url = client("https://api.flutterwave.com")
            .endpoint(&["v3", "transactions", "123", "verify"])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.flutterwave.com/v3/transactions/123/verify");

        let url = client("http://localhost:9000/")
            .endpoint(&["v3", "payments"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/v3/payments");
    }

    #[test]
    fn test_endpoint_encodes_identifier() {
        let url = client("https://api.flutterwave.com")
            .endpoint(&["v3", "transactions", "../admin", "verify"])
            .unwrap();
        assert!(!url.path().contains("/../"));
        assert!(url.path().ends_with("/verify"));
    }

    #[test]
    fn test_envelope_without_data() {
        let body = r#"{"status":"error","message":"Invalid tx_ref"}"#;
        let envelope: Envelope<CreatedPayment> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.status, "error");
        assert_eq!(envelope.message.as_deref(), Some("Invalid tx_ref"));
        assert!(envelope.data.is_none());

        let body = r#"{"status":"success","data":{"link":"https://checkout.flutterwave.com/v3/hosted/pay/abc"}}"#;
        let envelope: Envelope<CreatedPayment> = serde_json::from_str(body).unwrap();
        assert!(envelope.message.is_none());
        assert_eq!(
            envelope.data.map(|d| d.link).as_deref(),
            Some("https://checkout.flutterwave.com/v3/hosted/pay/abc")
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let result = client("http://127.0.0.1:9")
            .verify_transaction(&VerificationId::TransactionId("1".to_string()))
            .await;

        assert!(matches!(
            result,
            Err(ProcessorError::Transport(_)) | Err(ProcessorError::Timeout)
        ));
    }
}
