use chrono::{DateTime, Duration, Utc};
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Documented lifetime of a gateway bearer token. Used when the auth
/// response carries no parseable expiry.
const TOKEN_LIFETIME_MINUTES: i64 = 5;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Gateway rejected request: {0}")]
    Rejected(String),
    #[error("Invalid response from gateway: {0}")]
    InvalidResponse(String),
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

/// Short-lived bearer token for gateway calls. Never persisted; callers
/// receive an owned value and must tolerate acquiring a fresh one.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub valid_until: DateTime<Utc>,
}

impl Credential {
    pub fn is_expired(&self) -> bool {
        self.valid_until <= Utc::now()
    }
}

/// Normalized payment status, translated from the gateway's free-text
/// status descriptions so the orchestrator never sees gateway vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentVerdict {
    Completed,
    Failed,
    Pending,
}

impl PaymentVerdict {
    /// Maps a `payment_status_description` value. Unrecognized vocabulary
    /// maps to `Pending` so no terminal state is ever committed on a
    /// description this client does not understand.
    pub fn from_description(description: &str) -> Self {
        match description.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => PaymentVerdict::Completed,
            "FAILED" | "INVALID" | "REVERSED" => PaymentVerdict::Failed,
            _ => PaymentVerdict::Pending,
        }
    }
}

/// Fields required to submit an order to the gateway.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub merchant_reference: String,
    pub amount: f64,
    pub description: String,
    pub callback_url: String,
    pub notification_id: String,
    pub payer_email: String,
    pub payer_first_name: String,
    pub payer_last_name: String,
    pub payer_phone: String,
}

/// Result of a successful order submission.
#[derive(Debug, Clone)]
pub struct OrderSubmission {
    pub tracking_id: String,
    pub redirect_url: String,
}

/// Result of a successful notification-endpoint registration.
#[derive(Debug, Clone)]
pub struct IpnRegistration {
    pub ipn_id: String,
}

// Gateway responses carry a body-level status ("200" on success) and an
// error object that is null, or all-null, when the call succeeded.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_type: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: Option<String>,
    #[serde(rename = "expiryDate")]
    expiry_date: Option<String>,
    error: Option<ErrorBody>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterIpnResponse {
    ipn_id: Option<String>,
    error: Option<ErrorBody>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitOrderResponse {
    order_tracking_id: Option<String>,
    redirect_url: Option<String>,
    error: Option<ErrorBody>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionStatusResponse {
    payment_status_description: Option<String>,
    error: Option<ErrorBody>,
    status: Option<String>,
}

fn check_envelope(status: &Option<String>, error: &Option<ErrorBody>) -> Result<(), GatewayError> {
    if let Some(err) = error {
        if let Some(reason) = err
            .message
            .clone()
            .or_else(|| err.code.clone())
            .or_else(|| err.error_type.clone())
        {
            return Err(GatewayError::Rejected(reason));
        }
    }

    if let Some(code) = status {
        if code != "200" {
            return Err(GatewayError::Rejected(format!("gateway status {}", code)));
        }
    }

    Ok(())
}

fn credential_from_auth(response: AuthResponse) -> Result<Credential, GatewayError> {
    check_envelope(&response.status, &response.error)?;

    let token = match response.token {
        Some(token) if !token.is_empty() => token,
        _ => {
            return Err(GatewayError::InvalidResponse(
                "auth response carried no token".to_string(),
            ));
        }
    };

    let valid_until = response
        .expiry_date
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc::now() + Duration::minutes(TOKEN_LIFETIME_MINUTES));

    Ok(Credential { token, valid_until })
}

/// HTTP client for the payment gateway's V3 API.
///
/// Stateless with respect to transactions; it never touches the store.
/// All calls run through a circuit breaker so a flapping gateway fails
/// fast instead of tying up request handlers.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl GatewayClient {
    pub fn new(base_url: String, consumer_key: String, consumer_secret: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            std::time::Duration::from_secs(60),
            std::time::Duration::from_secs(120),
        );
        let policy = failure_policy::consecutive_failures(3, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        GatewayClient {
            client,
            base_url,
            consumer_key,
            consumer_secret,
            circuit_breaker,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Requests a fresh bearer token with the configured identity material.
    pub async fn acquire_credential(&self) -> Result<Credential, GatewayError> {
        let url = self.endpoint("/Auth/RequestToken");
        let client = self.client.clone();
        let payload = json!({
            "consumer_key": self.consumer_key,
            "consumer_secret": self.consumer_secret,
        });

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.post(&url).json(&payload).send().await?;

                if !response.status().is_success() {
                    return Err(GatewayError::Rejected(format!(
                        "authentication returned {}",
                        response.status()
                    )));
                }

                let body = response.json::<AuthResponse>().await?;
                credential_from_auth(body)
            })
            .await;

        unwrap_breaker(result)
    }

    /// Registers the URL the gateway should deliver payment notifications
    /// to. Not idempotent gateway-side; called once per deployment, never
    /// per transaction.
    pub async fn register_ipn(
        &self,
        credential: &Credential,
        callback_url: &str,
    ) -> Result<IpnRegistration, GatewayError> {
        let url = self.endpoint("/URLSetup/RegisterIPN");
        let client = self.client.clone();
        let token = credential.token.clone();
        let payload = json!({
            "url": callback_url,
            "ipn_notification_type": "GET",
        });

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .bearer_auth(token)
                    .json(&payload)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(GatewayError::Rejected(format!(
                        "IPN registration returned {}",
                        response.status()
                    )));
                }

                let body = response.json::<RegisterIpnResponse>().await?;
                check_envelope(&body.status, &body.error)?;

                let ipn_id = body.ipn_id.ok_or_else(|| {
                    GatewayError::InvalidResponse(
                        "IPN registration response carried no ipn_id".to_string(),
                    )
                })?;

                Ok(IpnRegistration { ipn_id })
            })
            .await;

        unwrap_breaker(result)
    }

    /// Submits a payment order. The merchant reference rides along as the
    /// order id so the gateway echoes it in notifications. Callers must not
    /// retry on failure: a transport error does not prove the gateway did
    /// not create the order.
    pub async fn submit_order(
        &self,
        credential: &Credential,
        order: &OrderRequest,
    ) -> Result<OrderSubmission, GatewayError> {
        let url = self.endpoint("/Transactions/SubmitOrderRequest");
        let client = self.client.clone();
        let token = credential.token.clone();
        let payload = json!({
            "id": order.merchant_reference,
            "currency": "KES",
            "amount": order.amount,
            "description": order.description,
            "callback_url": order.callback_url,
            "notification_id": order.notification_id,
            "billing_address": {
                "email_address": order.payer_email,
                "first_name": order.payer_first_name,
                "last_name": order.payer_last_name,
                "phone_number": order.payer_phone,
            },
        });

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .bearer_auth(token)
                    .json(&payload)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(GatewayError::Rejected(format!(
                        "order submission returned {}",
                        response.status()
                    )));
                }

                let body = response.json::<SubmitOrderResponse>().await?;
                check_envelope(&body.status, &body.error)?;

                match (body.order_tracking_id, body.redirect_url) {
                    (Some(tracking_id), Some(redirect_url)) => Ok(OrderSubmission {
                        tracking_id,
                        redirect_url,
                    }),
                    _ => Err(GatewayError::InvalidResponse(
                        "order submission response missing tracking id or redirect url"
                            .to_string(),
                    )),
                }
            })
            .await;

        unwrap_breaker(result)
    }

    /// Queries the authoritative payment status for a submitted order.
    /// Pure read; safe to retry freely.
    pub async fn query_status(
        &self,
        credential: &Credential,
        tracking_id: &str,
    ) -> Result<PaymentVerdict, GatewayError> {
        let url = format!(
            "{}?orderTrackingId={}",
            self.endpoint("/Transactions/GetTransactionStatus"),
            tracking_id
        );
        let client = self.client.clone();
        let token = credential.token.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.get(&url).bearer_auth(token).send().await?;

                if !response.status().is_success() {
                    return Err(GatewayError::Rejected(format!(
                        "status query returned {}",
                        response.status()
                    )));
                }

                let body = response.json::<TransactionStatusResponse>().await?;
                check_envelope(&body.status, &body.error)?;

                let description = body.payment_status_description.ok_or_else(|| {
                    GatewayError::InvalidResponse(
                        "status response carried no payment_status_description".to_string(),
                    )
                })?;

                Ok(PaymentVerdict::from_description(&description))
            })
            .await;

        unwrap_breaker(result)
    }
}

fn unwrap_breaker<T>(result: Result<T, FailsafeError<GatewayError>>) -> Result<T, GatewayError> {
    match result {
        Ok(value) => Ok(value),
        Err(FailsafeError::Rejected) => Err(GatewayError::CircuitBreakerOpen(
            "payment gateway circuit breaker is open".to_string(),
        )),
        Err(FailsafeError::Inner(e)) => Err(e),
    }
}
