//! Wire DTOs for the inbound HTTP surface.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Transaction;

/// What the client app sends to initiate a payment.
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: BigDecimal,
    pub phone: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// What the server sends back: the reference to reconcile with later and
/// the gateway page to redirect the payer to.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub reference: String,
    pub redirect_url: String,
    pub status: String,
}

/// Gateway IPN callback, delivered as a GET with query parameters.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(rename = "OrderTrackingId")]
    pub order_tracking_id: String,
    #[serde(rename = "OrderMerchantReference")]
    pub order_merchant_reference: String,
    #[serde(rename = "OrderNotificationType")]
    pub order_notification_type: Option<String>,
}

/// Acknowledgment envelope the gateway expects back from an IPN delivery.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    #[serde(rename = "orderNotificationType")]
    pub order_notification_type: String,
    #[serde(rename = "orderTrackingId")]
    pub order_tracking_id: String,
    #[serde(rename = "orderMerchantReference")]
    pub order_merchant_reference: String,
    pub status: u16,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub reference: String,
    pub status: String,
}

/// History view of a past transaction.
#[derive(Debug, Serialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub amount: BigDecimal,
    pub phone: String,
    pub reference: String,
    pub tracking_id: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionRecord {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            amount: tx.amount,
            phone: tx.payer_phone,
            reference: tx.merchant_reference,
            tracking_id: tx.gateway_tracking_id,
            status: tx.status.to_string(),
            created_at: tx.created_at,
        }
    }
}
