mod client;

pub use client::{
    Credential, GatewayClient, GatewayError, IpnRegistration, OrderRequest, OrderSubmission,
    PaymentVerdict,
};
