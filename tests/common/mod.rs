#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use farpay_core::domain::{NewTransaction, Transaction, TransactionStatus};
use farpay_core::ports::{StoreError, StoreResult, TransactionStore};

/// In-memory TransactionStore with the same conditional-update semantics
/// as the Postgres adapter. A single mutex stands in for row-level
/// atomicity; `applied_terminal_writes` counts how many terminal writes
/// actually landed, which is what the race tests assert on.
#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<Transaction>>,
    pub applied_terminal_writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, tx: Transaction) {
        self.rows.lock().unwrap().push(tx);
    }

    pub fn snapshot(&self, reference: &str) -> Option<Transaction> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|tx| tx.merchant_reference == reference)
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<Transaction> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn create(&self, draft: &NewTransaction) -> StoreResult<Transaction> {
        let mut rows = self.rows.lock().unwrap();

        if rows
            .iter()
            .any(|tx| tx.merchant_reference == draft.merchant_reference)
        {
            return Err(StoreError::Corrupt(format!(
                "duplicate merchant reference {}",
                draft.merchant_reference
            )));
        }

        let tx = Transaction {
            id: Uuid::new_v4(),
            merchant_reference: draft.merchant_reference.clone(),
            amount: draft.amount.clone(),
            payer_phone: draft.payer_phone.clone(),
            payer_email: draft.payer_email.clone(),
            payer_first_name: draft.payer_first_name.clone(),
            payer_last_name: draft.payer_last_name.clone(),
            gateway_tracking_id: None,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        };
        rows.push(tx.clone());

        Ok(tx)
    }

    async fn find_by_merchant_reference(&self, reference: &str) -> StoreResult<Transaction> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|tx| tx.merchant_reference == reference)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("transaction with reference {}", reference)))
    }

    async fn mark_submitted(&self, id: Uuid) -> StoreResult<bool> {
        let mut rows = self.rows.lock().unwrap();

        match rows.iter_mut().find(|tx| tx.id == id) {
            Some(tx) if tx.status == TransactionStatus::Pending => {
                tx.status = TransactionStatus::Submitted;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn finish_if_active(&self, id: Uuid, status: TransactionStatus) -> StoreResult<bool> {
        if !status.is_terminal() {
            return Err(StoreError::Corrupt(format!(
                "finish_if_active called with non-terminal status {}",
                status
            )));
        }

        let mut rows = self.rows.lock().unwrap();

        match rows.iter_mut().find(|tx| tx.id == id) {
            Some(tx) if !tx.status.is_terminal() => {
                tx.status = status;
                self.applied_terminal_writes.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_gateway_tracking_id(&self, id: Uuid, tracking_id: &str) -> StoreResult<()> {
        let mut rows = self.rows.lock().unwrap();

        if let Some(tx) = rows.iter_mut().find(|tx| tx.id == id) {
            if tx.gateway_tracking_id.is_none() {
                tx.gateway_tracking_id = Some(tracking_id.to_string());
            }
        }

        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<Transaction>> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

/// Builds a stored transaction in an arbitrary state for reconciliation
/// tests.
pub fn stored_transaction(
    reference: &str,
    status: TransactionStatus,
    tracking_id: Option<&str>,
) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        merchant_reference: reference.to_string(),
        amount: BigDecimal::from_str("100").unwrap(),
        payer_phone: "0700000000".to_string(),
        payer_email: "a@b.com".to_string(),
        payer_first_name: "A".to_string(),
        payer_last_name: "B".to_string(),
        gateway_tracking_id: tracking_id.map(str::to_string),
        status,
        created_at: Utc::now(),
    }
}
