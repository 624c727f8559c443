use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::error::AppError;
use crate::schemas::{
    CallbackAck, CallbackParams, PaymentRequest, PaymentResponse, StatusResponse,
    TransactionRecord,
};
use crate::services::InitiatePayment;

pub async fn initiate_payment(
    State(state): State<AppState>,
    Json(payload): Json<PaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let initiated = state
        .orchestrator
        .initiate(InitiatePayment {
            amount: payload.amount,
            phone: payload.phone,
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            reference: initiated.reference,
            redirect_url: initiated.redirect_url,
            status: initiated.status.to_string(),
        }),
    ))
}

/// IPN endpoint the gateway was registered against. The gateway retries
/// deliveries it does not see acknowledged, so duplicates are expected
/// and must stay idempotent.
pub async fn ipn_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, AppError> {
    let status = state
        .orchestrator
        .handle_notification(&params.order_merchant_reference, &params.order_tracking_id)
        .await?;

    tracing::info!(
        reference = %params.order_merchant_reference,
        status = %status,
        "IPN acknowledged"
    );

    Ok(Json(CallbackAck {
        order_notification_type: params
            .order_notification_type
            .unwrap_or_else(|| "IPNCHANGE".to_string()),
        order_tracking_id: params.order_tracking_id,
        order_merchant_reference: params.order_merchant_reference,
        status: 200,
    }))
}

pub async fn payment_status(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state.orchestrator.query_status(&reference).await?;

    Ok(Json(StatusResponse {
        reference: tx.merchant_reference,
        status: tx.status.to_string(),
    }))
}

pub async fn list_payments(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let records: Vec<TransactionRecord> = state
        .orchestrator
        .list_transactions()
        .await?
        .into_iter()
        .map(TransactionRecord::from)
        .collect();

    Ok(Json(records))
}
