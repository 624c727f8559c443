//! Payment orchestrator.
//!
//! Owns the transaction state machine: initiates transactions, submits
//! them to the gateway, and converges the notification- and poll-driven
//! reconciliation paths onto one authoritative record. Races between the
//! two paths are settled by the store's conditional updates, not by any
//! in-process lock.

use bigdecimal::{BigDecimal, ToPrimitive};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{NewTransaction, Transaction, TransactionStatus};
use crate::error::AppError;
use crate::gateway::{GatewayClient, OrderRequest, PaymentVerdict};
use crate::ports::TransactionStore;
use crate::validation::{sanitize_string, validate_amount, validate_payer_field};

const ORDER_DESCRIPTION: &str = "Payment for FarPay order";

/// Input for initiating a payment.
#[derive(Debug)]
pub struct InitiatePayment {
    pub amount: BigDecimal,
    pub phone: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Outcome of a successful initiation: the caller redirects the payer to
/// `redirect_url` and later reconciles using `reference`.
#[derive(Debug)]
pub struct PaymentInitiated {
    pub reference: String,
    pub redirect_url: String,
    pub status: TransactionStatus,
}

pub struct PaymentOrchestrator {
    store: Arc<dyn TransactionStore>,
    gateway: GatewayClient,
    callback_url: String,
    notification_id: String,
}

impl PaymentOrchestrator {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        gateway: GatewayClient,
        callback_url: String,
        notification_id: String,
    ) -> Self {
        Self {
            store,
            gateway,
            callback_url,
            notification_id,
        }
    }

    /// Creates a `PENDING` transaction and immediately submits it to the
    /// gateway. On submission failure the transaction is marked `FAILED`
    /// and the failure surfaces to the caller; another attempt means a new
    /// transaction with a new reference, since the gateway-side outcome of
    /// this one is unknown. Never retried automatically.
    pub async fn initiate(&self, input: InitiatePayment) -> Result<PaymentInitiated, AppError> {
        validate_amount(&input.amount)?;

        let phone = sanitize_string(&input.phone);
        let email = sanitize_string(&input.email);
        let first_name = sanitize_string(&input.first_name);
        let last_name = sanitize_string(&input.last_name);

        validate_payer_field("phone", &phone)?;
        validate_payer_field("email", &email)?;
        validate_payer_field("first_name", &first_name)?;
        validate_payer_field("last_name", &last_name)?;

        let order_amount = input.amount.to_f64().ok_or_else(|| {
            AppError::Validation("amount: not representable as a decimal number".to_string())
        })?;

        let reference = Uuid::new_v4().to_string();
        let draft = NewTransaction {
            merchant_reference: reference.clone(),
            amount: input.amount,
            payer_phone: phone.clone(),
            payer_email: email.clone(),
            payer_first_name: first_name.clone(),
            payer_last_name: last_name.clone(),
        };

        let tx = self.store.create(&draft).await?;
        tracing::info!(reference = %reference, id = %tx.id, "transaction created");

        let credential = match self.gateway.acquire_credential().await {
            Ok(credential) => credential,
            Err(e) => {
                self.mark_failed(tx.id, &reference).await?;
                return Err(AppError::GatewayUnavailable(e.to_string()));
            }
        };

        let order = OrderRequest {
            merchant_reference: reference.clone(),
            amount: order_amount,
            description: ORDER_DESCRIPTION.to_string(),
            callback_url: self.callback_url.clone(),
            notification_id: self.notification_id.clone(),
            payer_email: email,
            payer_first_name: first_name,
            payer_last_name: last_name,
            payer_phone: phone,
        };

        let submission = match self.gateway.submit_order(&credential, &order).await {
            Ok(submission) => submission,
            Err(e) => {
                self.mark_failed(tx.id, &reference).await?;
                return Err(AppError::GatewayUnavailable(e.to_string()));
            }
        };

        self.store
            .set_gateway_tracking_id(tx.id, &submission.tracking_id)
            .await?;

        if !self.store.mark_submitted(tx.id).await? {
            // Only possible if a reconciler raced the submission itself.
            tracing::warn!(reference = %reference, "transaction left PENDING before submission completed");
        }

        tracing::info!(
            reference = %reference,
            tracking_id = %submission.tracking_id,
            "order submitted to gateway"
        );

        Ok(PaymentInitiated {
            reference,
            redirect_url: submission.redirect_url,
            status: TransactionStatus::Submitted,
        })
    }

    /// Reconciles a gateway notification. The notification is only a
    /// trigger: the authoritative status is re-queried from the gateway
    /// before any terminal write. Duplicate notifications on an already
    /// terminal transaction are acknowledged without touching the store.
    pub async fn handle_notification(
        &self,
        reference: &str,
        tracking_id: &str,
    ) -> Result<TransactionStatus, AppError> {
        let tx = self.store.find_by_merchant_reference(reference).await?;

        if tx.status.is_terminal() {
            tracing::info!(reference = %reference, status = %tx.status, "duplicate notification ignored");
            return Ok(tx.status);
        }

        if tx.status == TransactionStatus::Pending {
            // No tracking id to verify against yet; nothing to reconcile.
            return Ok(tx.status);
        }

        let tracking_id = tx.gateway_tracking_id.as_deref().unwrap_or(tracking_id);

        let credential = self
            .gateway
            .acquire_credential()
            .await
            .map_err(|e| AppError::GatewayUnavailable(e.to_string()))?;

        let verdict = self
            .gateway
            .query_status(&credential, tracking_id)
            .await
            .map_err(|e| AppError::GatewayUnavailable(e.to_string()))?;

        let terminal = match verdict {
            PaymentVerdict::Completed => TransactionStatus::Completed,
            PaymentVerdict::Failed => TransactionStatus::Failed,
            PaymentVerdict::Pending => return Ok(tx.status),
        };

        if self.store.finish_if_active(tx.id, terminal).await? {
            tracing::info!(reference = %reference, status = %terminal, "transaction reconciled");
            return Ok(terminal);
        }

        // A concurrent reconciler won the terminal write. Surface whatever
        // landed; a non-terminal row here would be a store defect.
        let current = self.store.find_by_merchant_reference(reference).await?;
        if current.status.is_terminal() {
            tracing::info!(reference = %reference, status = %current.status, "lost reconciliation race");
        } else {
            tracing::error!(
                reference = %reference,
                status = %current.status,
                "conditional terminal write was refused on a non-terminal row"
            );
        }

        Ok(current.status)
    }

    /// Poll path: returns the stored transaction without contacting the
    /// gateway. Repeated polls are cheap and never regress a terminal
    /// state; liveness transitions belong to the notification path.
    pub async fn query_status(&self, reference: &str) -> Result<Transaction, AppError> {
        Ok(self.store.find_by_merchant_reference(reference).await?)
    }

    pub async fn list_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(self.store.list_all().await?)
    }

    async fn mark_failed(&self, id: Uuid, reference: &str) -> Result<(), AppError> {
        if self
            .store
            .finish_if_active(id, TransactionStatus::Failed)
            .await?
        {
            tracing::warn!(reference = %reference, "transaction marked FAILED after gateway failure");
        } else {
            tracing::error!(
                reference = %reference,
                "transaction already terminal while submission was in flight"
            );
        }

        Ok(())
    }
}
