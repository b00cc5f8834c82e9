//! Telnyx adapter: REST client and webhook normalization.
//!
//! Telnyx's v2 API is JSON with bearer auth. Call lifecycle arrives as
//! `call.*` events; the hangup cause plus `call_duration_secs` is
//! normalized onto the same terminal vocabulary Twilio uses.

use bullhorn_core::error::CoreError;
use bullhorn_core::event::{CallEventStatus, MessageEventStatus, ProviderEvent};
use serde::Deserialize;
use serde_json::json;

use crate::{CallSnapshot, ProviderAdapter, ProviderError};

const TELNYX_BASE_URL: &str = "https://api.telnyx.com/v2";

/// Telnyx REST adapter.
pub struct TelnyxAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    phone_number: String,
    connection_id: String,
}

#[derive(Debug, Deserialize)]
struct MessageCreated {
    data: MessageData,
}

#[derive(Debug, Deserialize)]
struct MessageData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CallCreated {
    data: CallData,
}

#[derive(Debug, Deserialize)]
struct CallData {
    call_control_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    errors: Option<Vec<TelnyxError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelnyxError {
    pub code: Option<String>,
    pub title: Option<String>,
    pub detail: Option<String>,
}

impl TelnyxAdapter {
    /// Build the adapter from `TELNYX_API_KEY`, `TELNYX_PHONE_NUMBER`,
    /// and `TELNYX_CONNECTION_ID`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("TELNYX_API_KEY")
            .map_err(|_| ProviderError::MissingConfig("TELNYX_API_KEY"))?;
        let phone_number = std::env::var("TELNYX_PHONE_NUMBER")
            .map_err(|_| ProviderError::MissingConfig("TELNYX_PHONE_NUMBER"))?;
        let connection_id = std::env::var("TELNYX_CONNECTION_ID")
            .map_err(|_| ProviderError::MissingConfig("TELNYX_CONNECTION_ID"))?;
        Ok(Self::new(
            TELNYX_BASE_URL.to_string(),
            api_key,
            phone_number,
            connection_id,
        ))
    }

    pub fn new(
        base_url: String,
        api_key: String,
        phone_number: String,
        connection_id: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            phone_number,
            connection_id,
        }
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response
                .json()
                .await
                .unwrap_or(ErrorBody { errors: None });
            let first = body.errors.and_then(|e| e.into_iter().next());
            return Err(ProviderError::Api {
                code: first.as_ref().and_then(|e| e.code.clone()),
                message: first
                    .and_then(|e| e.detail.or(e.title))
                    .unwrap_or_else(|| format!("Telnyx returned HTTP {status}")),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for TelnyxAdapter {
    fn name(&self) -> &'static str {
        "telnyx"
    }

    async fn send_message(&self, to: &str, body: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.phone_number,
                "to": to,
                "text": body,
            }))
            .send()
            .await?;

        let created: MessageCreated = Self::parse_response(response).await?;
        Ok(created.data.id)
    }

    async fn initiate_call(
        &self,
        to: &str,
        audio_url: &str,
        callback_url: &str,
    ) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/calls", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "connection_id": self.connection_id,
                "to": to,
                "from": self.phone_number,
                "webhook_url": callback_url,
                "webhook_url_method": "POST",
                "audio_url": audio_url,
            }))
            .send()
            .await?;

        let created: CallCreated = Self::parse_response(response).await?;
        Ok(created.data.call_control_id)
    }

    /// Telnyx's call-retrieve endpoint reports liveness but not the final
    /// duration, so there is no ground-truth poll to build a snapshot
    /// from. The sweep logs and skips these recipients.
    async fn call_snapshot(&self, _call_id: &str) -> Result<CallSnapshot, ProviderError> {
        Err(ProviderError::Unsupported(
            "Telnyx does not expose a post-call status poll",
        ))
    }
}

// ---------------------------------------------------------------------------
// Webhook normalization
// ---------------------------------------------------------------------------

/// JSON webhook envelope Telnyx posts: a top-level event type plus a data
/// object whose fields vary by event.
#[derive(Debug, Deserialize)]
pub struct TelnyxWebhook {
    pub event_type: Option<String>,
    pub data: Option<TelnyxEventData>,
}

/// Union of the event-data fields this service consumes.
#[derive(Debug, Default, Deserialize)]
pub struct TelnyxEventData {
    /// Message id (message.* events).
    pub id: Option<String>,
    /// Call id (call.* events).
    pub call_control_id: Option<String>,
    pub to: Option<String>,
    pub call_duration_secs: Option<i32>,
    pub hangup_cause: Option<String>,
    /// AMD result on call.machine.detection.ended: human | machine |
    /// not_sure.
    pub result: Option<String>,
    pub errors: Option<Vec<TelnyxError>>,
}

/// Map a hangup cause onto the terminal call vocabulary.
fn parse_hangup_cause(cause: Option<&str>) -> CallEventStatus {
    match cause {
        Some("user_busy") => CallEventStatus::Busy,
        Some("call_rejected") => CallEventStatus::Failed,
        Some("no_answer") | Some("timeout") => CallEventStatus::NoAnswer,
        Some("originator_cancel") => CallEventStatus::Canceled,
        // normal_clearing and anything unrecognized: the call ran to its
        // end; duration decides the outcome.
        _ => CallEventStatus::Completed,
    }
}

/// Normalize a Telnyx webhook into a [`ProviderEvent`].
///
/// Returns `Ok(None)` for event types that carry no state transition
/// (e.g. `call.playback.ended`). An envelope missing `event_type` or
/// `data` is malformed.
pub fn parse_webhook(payload: &TelnyxWebhook) -> Result<Option<ProviderEvent>, CoreError> {
    let event_type = payload
        .event_type
        .as_deref()
        .ok_or_else(|| CoreError::Validation("Missing event_type".into()))?;
    let data = payload
        .data
        .as_ref()
        .ok_or_else(|| CoreError::Validation("Missing event data".into()))?;

    let message_event = |status, reason: Option<String>| -> Result<Option<ProviderEvent>, CoreError> {
        let message_id = data
            .id
            .clone()
            .ok_or_else(|| CoreError::Validation("Missing message id".into()))?;
        Ok(Some(ProviderEvent::Message {
            message_id,
            to: data.to.clone().unwrap_or_default(),
            status,
            reason,
        }))
    };

    let call_event = |status, duration_seconds, machine_answered| -> Result<Option<ProviderEvent>, CoreError> {
        let call_id = data
            .call_control_id
            .clone()
            .ok_or_else(|| CoreError::Validation("Missing call_control_id".into()))?;
        Ok(Some(ProviderEvent::Call {
            call_id,
            to: data.to.clone().unwrap_or_default(),
            status,
            duration_seconds,
            machine_answered,
        }))
    };

    match event_type {
        "message.sent" => message_event(MessageEventStatus::Sent, None),
        "message.delivered" => message_event(MessageEventStatus::Delivered, None),
        "message.sending_failed" | "message.delivery_failed" => {
            let reason = data
                .errors
                .as_ref()
                .and_then(|e| e.first())
                .and_then(|e| e.detail.clone().or_else(|| e.title.clone()))
                .unwrap_or_else(|| "Message delivery failed".to_string());
            message_event(MessageEventStatus::Failed, Some(reason))
        }
        "call.initiated" => call_event(CallEventStatus::Initiated, 0, false),
        // Answered is not delivery: an immediately declined call also
        // fires this. The hangup duration decides the outcome.
        "call.answered" => call_event(CallEventStatus::InProgress, 0, false),
        "call.hangup" => call_event(
            parse_hangup_cause(data.hangup_cause.as_deref()),
            data.call_duration_secs.unwrap_or(0),
            false,
        ),
        "call.machine.detection.ended" => {
            if data.result.as_deref() == Some("machine") {
                call_event(CallEventStatus::InProgress, 0, true)
            } else {
                Ok(None)
            }
        }
        _ => {
            tracing::debug!(event_type, "Unhandled Telnyx event type");
            Ok(None)
        }
    }
}
