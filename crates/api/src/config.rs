use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Externally reachable base URL of this service. Providers post
    /// lifecycle webhooks to `{public_url}/api/v1/webhooks/{provider}`.
    pub public_url: String,
    /// Shared secret for the scheduler trigger endpoint. When set, callers
    /// must present it as `Authorization: Bearer <secret>`.
    pub cron_secret: Option<String>,
    /// Which provider adapter to use (`twilio` or `telnyx`).
    pub provider: String,
    /// Recipients per dispatch batch -- the provider-imposed concurrency
    /// ceiling.
    pub dispatch_batch_size: usize,
    /// Pause between dispatch batches, in milliseconds.
    pub dispatch_batch_delay_ms: u64,
    /// How often the reconciliation sweep runs, in seconds.
    pub sweep_interval_secs: u64,
    /// How long a recipient may sit in `sent` before the sweep polls the
    /// provider for ground truth, in seconds.
    pub sweep_stuck_after_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                    |
    /// |---------------------------|----------------------------|
    /// | `HOST`                    | `0.0.0.0`                  |
    /// | `PORT`                    | `3000`                     |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                       |
    /// | `PUBLIC_URL`              | `http://localhost:3000`    |
    /// | `CRON_SECRET`             | unset (guard disabled)     |
    /// | `PROVIDER`                | `twilio`                   |
    /// | `DISPATCH_BATCH_SIZE`     | `20`                       |
    /// | `DISPATCH_BATCH_DELAY_MS` | `100`                      |
    /// | `SWEEP_INTERVAL_SECS`     | `60`                       |
    /// | `SWEEP_STUCK_AFTER_SECS`  | `300`                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let public_url = std::env::var("PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let cron_secret = std::env::var("CRON_SECRET").ok().filter(|s| !s.is_empty());

        let provider = std::env::var("PROVIDER").unwrap_or_else(|_| "twilio".into());

        let dispatch_batch_size: usize = std::env::var("DISPATCH_BATCH_SIZE")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("DISPATCH_BATCH_SIZE must be a valid usize");

        let dispatch_batch_delay_ms: u64 = std::env::var("DISPATCH_BATCH_DELAY_MS")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("DISPATCH_BATCH_DELAY_MS must be a valid u64");

        let sweep_interval_secs: u64 = std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("SWEEP_INTERVAL_SECS must be a valid u64");

        let sweep_stuck_after_secs: u64 = std::env::var("SWEEP_STUCK_AFTER_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("SWEEP_STUCK_AFTER_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            public_url,
            cron_secret,
            provider,
            dispatch_batch_size: dispatch_batch_size.max(1),
            dispatch_batch_delay_ms,
            sweep_interval_secs,
            sweep_stuck_after_secs,
        }
    }

    /// The pause inserted between dispatch batches.
    pub fn dispatch_batch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_batch_delay_ms)
    }

    /// Webhook callback URL handed to the provider when initiating calls.
    pub fn webhook_callback_url(&self, provider_name: &str) -> String {
        format!("{}/api/v1/webhooks/{provider_name}", self.public_url)
    }
}
