mod orchestrator;

pub use orchestrator::{InitiatePayment, PaymentInitiated, PaymentOrchestrator};
