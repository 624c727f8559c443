//! Transaction domain entity.
//! Framework-agnostic representation of a payment transaction and its
//! status state machine.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of a transaction.
///
/// `Pending` is the initial state. `Submitted` means the gateway accepted
/// the order and issued a tracking id. `Completed` and `Failed` are
/// terminal; no transition leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Submitted,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Submitted => "SUBMITTED",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(TransactionStatus::Pending),
            "SUBMITTED" => Ok(TransactionStatus::Submitted),
            "COMPLETED" => Ok(TransactionStatus::Completed),
            "FAILED" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status: {}", other)),
        }
    }
}

/// Domain entity representing a payment transaction.
///
/// Created once, mutated only by the orchestrator through the store's
/// conditional updates, never deleted.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub merchant_reference: String,
    pub amount: BigDecimal,
    pub payer_phone: String,
    pub payer_email: String,
    pub payer_first_name: String,
    pub payer_last_name: String,
    pub gateway_tracking_id: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Draft of a transaction before the store assigns `id` and `created_at`.
///
/// The merchant reference is generated by the orchestrator before any
/// persistence or gateway call and is never mutated afterwards.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub merchant_reference: String,
    pub amount: BigDecimal,
    pub payer_phone: String,
    pub payer_email: String,
    pub payer_first_name: String,
    pub payer_last_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Submitted.is_terminal());
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Submitted,
            TransactionStatus::Completed,
            TransactionStatus::Failed,
        ] {
            let parsed: TransactionStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("REFUNDED".parse::<TransactionStatus>().is_err());
    }
}
