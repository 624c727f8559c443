use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub pesapal_base_url: String,
    pub pesapal_consumer_key: String,
    pub pesapal_consumer_secret: String,
    /// Set once the IPN endpoint has been registered; when absent, the
    /// service registers one at startup.
    pub pesapal_ipn_id: Option<String>,
    /// Publicly reachable base URL of this service; the gateway redirects
    /// payers back here and delivers IPNs to it.
    pub public_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            pesapal_base_url: env::var("PESAPAL_BASE_URL")
                .unwrap_or_else(|_| "https://cybqa.pesapal.com/pesapalv3/api".to_string()),
            pesapal_consumer_key: env::var("PESAPAL_CONSUMER_KEY")?,
            pesapal_consumer_secret: env::var("PESAPAL_CONSUMER_SECRET")?,
            pesapal_ipn_id: env::var("PESAPAL_IPN_ID").ok(),
            public_base_url: env::var("PUBLIC_BASE_URL")?,
        })
    }

    pub fn ipn_callback_url(&self) -> String {
        format!(
            "{}/api/v1/payments/callback",
            self.public_base_url.trim_end_matches('/')
        )
    }
}
