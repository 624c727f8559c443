pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod ports;
pub mod schemas;
pub mod services;
pub mod validation;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::services::PaymentOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PaymentOrchestrator>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/payments/initiate",
            post(handlers::payments::initiate_payment),
        )
        .route(
            "/api/v1/payments/callback",
            get(handlers::payments::ipn_callback),
        )
        .route(
            "/api/v1/payments/status/:reference",
            get(handlers::payments::payment_status),
        )
        .route("/api/v1/payments", get(handlers::payments::list_payments))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
