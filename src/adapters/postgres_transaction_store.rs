//! Postgres implementation of TransactionStore.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction, TransactionStatus};
use crate::ports::{StoreError, StoreResult, TransactionStore};

/// Postgres-backed transaction store.
#[derive(Clone)]
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn create(&self, draft: &NewTransaction) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (
                id, merchant_reference, amount, payer_phone, payer_email,
                payer_first_name, payer_last_name, gateway_tracking_id, status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, $8, $9)
            RETURNING id, merchant_reference, amount, payer_phone, payer_email,
                payer_first_name, payer_last_name, gateway_tracking_id, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&draft.merchant_reference)
        .bind(&draft.amount)
        .bind(&draft.payer_phone)
        .bind(&draft.payer_email)
        .bind(&draft.payer_first_name)
        .bind(&draft.payer_last_name)
        .bind(TransactionStatus::Pending.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)?;

        row.into_domain()
    }

    async fn find_by_merchant_reference(&self, reference: &str) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE merchant_reference = $1",
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        match row {
            Some(row) => row.into_domain(),
            None => Err(StoreError::NotFound(format!(
                "transaction with reference {}",
                reference
            ))),
        }
    }

    async fn mark_submitted(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE transactions SET status = 'SUBMITTED' WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn finish_if_active(&self, id: Uuid, status: TransactionStatus) -> StoreResult<bool> {
        if !status.is_terminal() {
            return Err(StoreError::Corrupt(format!(
                "finish_if_active called with non-terminal status {}",
                status
            )));
        }

        // The tie-break primitive: whichever reconciler lands this row-level
        // conditional update first wins; the loser sees rows_affected == 0.
        let result = sqlx::query(
            r#"
            UPDATE transactions SET status = $2
            WHERE id = $1 AND status NOT IN ('COMPLETED', 'FAILED')
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_gateway_tracking_id(&self, id: Uuid, tracking_id: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE transactions SET gateway_tracking_id = $2
            WHERE id = $1 AND gateway_tracking_id IS NULL
            "#,
        )
        .bind(id)
        .bind(tracking_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    merchant_reference: String,
    amount: bigdecimal::BigDecimal,
    payer_phone: String,
    payer_email: String,
    payer_first_name: String,
    payer_last_name: String,
    gateway_tracking_id: Option<String>,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> StoreResult<Transaction> {
        let status = self
            .status
            .parse::<TransactionStatus>()
            .map_err(StoreError::Corrupt)?;

        Ok(Transaction {
            id: self.id,
            merchant_reference: self.merchant_reference,
            amount: self.amount,
            payer_phone: self.payer_phone,
            payer_email: self.payer_email,
            payer_first_name: self.payer_first_name,
            payer_last_name: self.payer_last_name,
            gateway_tracking_id: self.gateway_tracking_id,
            status,
            created_at: self.created_at,
        })
    }
}
