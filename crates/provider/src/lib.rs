//! Provider adapter layer.
//!
//! Normalizes "send message" / "initiate call" operations and raw webhook
//! payloads across telephony providers into a single internal vocabulary
//! ([`bullhorn_core::event::ProviderEvent`]). The rest of the system never
//! sees a provider-specific field.

pub mod telnyx;
pub mod twilio;

use std::sync::Arc;

use async_trait::async_trait;
use bullhorn_core::event::CallEventStatus;

/// Errors from the provider REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status with an error payload.
    #[error("Provider API error ({code}): {message}", code = .code.as_deref().unwrap_or("unknown"))]
    Api {
        /// Provider error code, when the response carried one.
        code: Option<String>,
        message: String,
    },

    /// A required environment variable is missing.
    #[error("Provider is not configured: {0} is not set")]
    MissingConfig(&'static str),

    /// The provider's API has no equivalent for the requested operation.
    #[error("Unsupported provider operation: {0}")]
    Unsupported(&'static str),
}

/// Provider-side ground truth about a call, as returned by a direct status
/// poll (used by the reconciliation sweep, not the webhook path).
#[derive(Debug, Clone)]
pub struct CallSnapshot {
    pub status: CallEventStatus,
    pub duration_seconds: i32,
}

/// A telephony provider capable of sending messages and initiating calls.
///
/// Implementations must be cheap to share (`Arc<dyn ProviderAdapter>`) and
/// safe to call concurrently; the dispatcher issues a full batch of sends
/// at once.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short provider name for logs ("twilio", "telnyx").
    fn name(&self) -> &'static str;

    /// Send an SMS. Returns the provider-assigned message id.
    async fn send_message(&self, to: &str, body: &str) -> Result<String, ProviderError>;

    /// Start an outbound call that plays `audio_url`, reporting lifecycle
    /// events to `callback_url`. Returns the provider-assigned call id.
    async fn initiate_call(
        &self,
        to: &str,
        audio_url: &str,
        callback_url: &str,
    ) -> Result<String, ProviderError>;

    /// Poll the provider for the current state of a call.
    async fn call_snapshot(&self, call_id: &str) -> Result<CallSnapshot, ProviderError>;
}

/// Build the configured provider adapter from environment variables.
///
/// `name` is the `PROVIDER` setting; unknown names are rejected rather
/// than silently defaulted.
pub fn adapter_from_env(name: &str) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
    match name {
        "twilio" => Ok(Arc::new(twilio::TwilioAdapter::from_env()?)),
        "telnyx" => Ok(Arc::new(telnyx::TelnyxAdapter::from_env()?)),
        _ => Err(ProviderError::Unsupported("unknown PROVIDER name")),
    }
}
