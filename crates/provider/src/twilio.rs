//! Twilio adapter: REST client and webhook normalization.
//!
//! Twilio's API is form-encoded with HTTP basic auth. Voice calls play the
//! campaign audio via inline TwiML and report lifecycle events to our
//! webhook through `StatusCallback`.

use bullhorn_core::error::CoreError;
use bullhorn_core::event::{CallEventStatus, MessageEventStatus, ProviderEvent};
use serde::Deserialize;

use crate::{CallSnapshot, ProviderAdapter, ProviderError};

const TWILIO_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

/// Twilio REST adapter.
pub struct TwilioAdapter {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    phone_number: String,
}

/// Successful create response (`Messages.json` / `Calls.json`).
#[derive(Debug, Deserialize)]
struct CreateResponse {
    sid: String,
}

/// Call resource as returned by `GET Calls/{sid}.json`.
///
/// `duration` is a decimal string in Twilio's API, absent while the call
/// is still live.
#[derive(Debug, Deserialize)]
struct CallResource {
    status: String,
    duration: Option<String>,
}

/// Error body Twilio returns on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

impl TwilioAdapter {
    /// Build the adapter from `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`,
    /// and `TWILIO_PHONE_NUMBER`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let account_sid = std::env::var("TWILIO_ACCOUNT_SID")
            .map_err(|_| ProviderError::MissingConfig("TWILIO_ACCOUNT_SID"))?;
        let auth_token = std::env::var("TWILIO_AUTH_TOKEN")
            .map_err(|_| ProviderError::MissingConfig("TWILIO_AUTH_TOKEN"))?;
        let phone_number = std::env::var("TWILIO_PHONE_NUMBER")
            .map_err(|_| ProviderError::MissingConfig("TWILIO_PHONE_NUMBER"))?;
        Ok(Self::new(
            TWILIO_BASE_URL.to_string(),
            account_sid,
            auth_token,
            phone_number,
        ))
    }

    pub fn new(
        base_url: String,
        account_sid: String,
        auth_token: String,
        phone_number: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            account_sid,
            auth_token,
            phone_number,
        }
    }

    fn account_url(&self, resource: &str) -> String {
        format!(
            "{}/Accounts/{}/{resource}",
            self.base_url, self.account_sid
        )
    }

    /// Parse a successful JSON body, or surface Twilio's error payload.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or(ErrorBody {
                code: None,
                message: None,
            });
            return Err(ProviderError::Api {
                code: body.code.map(|c| c.to_string()),
                message: body
                    .message
                    .unwrap_or_else(|| format!("Twilio returned HTTP {status}")),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for TwilioAdapter {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn send_message(&self, to: &str, body: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.account_url("Messages.json"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.phone_number.as_str()), ("Body", body)])
            .send()
            .await?;

        let created: CreateResponse = Self::parse_response(response).await?;
        Ok(created.sid)
    }

    async fn initiate_call(
        &self,
        to: &str,
        audio_url: &str,
        callback_url: &str,
    ) -> Result<String, ProviderError> {
        let twiml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Response><Play>{audio_url}</Play></Response>"
        );

        // Repeated StatusCallbackEvent keys subscribe us to the full call
        // lifecycle.
        let form: Vec<(&str, &str)> = vec![
            ("To", to),
            ("From", self.phone_number.as_str()),
            ("Twiml", twiml.as_str()),
            ("StatusCallback", callback_url),
            ("StatusCallbackMethod", "POST"),
            ("StatusCallbackEvent", "initiated"),
            ("StatusCallbackEvent", "ringing"),
            ("StatusCallbackEvent", "answered"),
            ("StatusCallbackEvent", "completed"),
        ];

        let response = self
            .client
            .post(self.account_url("Calls.json"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let created: CreateResponse = Self::parse_response(response).await?;
        Ok(created.sid)
    }

    async fn call_snapshot(&self, call_id: &str) -> Result<CallSnapshot, ProviderError> {
        let response = self
            .client
            .get(self.account_url(&format!("Calls/{call_id}.json")))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await?;

        let call: CallResource = Self::parse_response(response).await?;
        let status = parse_call_status(&call.status).ok_or(ProviderError::Api {
            code: None,
            message: format!("Unrecognized Twilio call status: {}", call.status),
        })?;
        let duration_seconds = call
            .duration
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(0);

        Ok(CallSnapshot {
            status,
            duration_seconds,
        })
    }
}

// ---------------------------------------------------------------------------
// Webhook normalization
// ---------------------------------------------------------------------------

/// Form-encoded webhook payload Twilio posts for both voice and SMS status
/// callbacks. Only the fields this service consumes are modeled.
#[derive(Debug, Default, Deserialize)]
pub struct TwilioWebhook {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
    #[serde(rename = "MessageStatus")]
    pub message_status: Option<String>,
    /// Decimal string, present on terminal voice events.
    #[serde(rename = "CallDuration")]
    pub call_duration: Option<String>,
    /// AMD classifier: human, machine_start, machine_end_beep,
    /// machine_end_silence, fax, unknown.
    #[serde(rename = "AnsweredBy")]
    pub answered_by: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
}

/// Map a Twilio call status string onto the internal vocabulary.
fn parse_call_status(status: &str) -> Option<CallEventStatus> {
    Some(match status {
        "queued" | "initiated" => CallEventStatus::Initiated,
        "ringing" => CallEventStatus::Ringing,
        // in-progress fires even for calls that are immediately declined;
        // the completed event's duration decides the outcome.
        "in-progress" | "answered" => CallEventStatus::InProgress,
        "completed" => CallEventStatus::Completed,
        "busy" => CallEventStatus::Busy,
        "failed" => CallEventStatus::Failed,
        "no-answer" => CallEventStatus::NoAnswer,
        "canceled" => CallEventStatus::Canceled,
        _ => return None,
    })
}

/// Normalize a Twilio webhook into a [`ProviderEvent`].
///
/// Returns `Ok(None)` for statuses that carry no state transition (e.g.
/// `queued` SMS progress updates), which the ingress acknowledges without
/// touching the store. A payload with neither `CallSid` nor `MessageSid`
/// is malformed.
pub fn parse_webhook(payload: &TwilioWebhook) -> Result<Option<ProviderEvent>, CoreError> {
    if let Some(call_sid) = &payload.call_sid {
        let raw_status = payload
            .call_status
            .as_deref()
            .ok_or_else(|| CoreError::Validation("Missing CallStatus".into()))?;
        let Some(status) = parse_call_status(raw_status) else {
            tracing::debug!(call_sid = %call_sid, status = raw_status, "Unhandled Twilio call status");
            return Ok(None);
        };
        let machine_answered = payload
            .answered_by
            .as_deref()
            .is_some_and(|a| a.starts_with("machine"));
        let duration_seconds = payload
            .call_duration
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(0);

        return Ok(Some(ProviderEvent::Call {
            call_id: call_sid.clone(),
            to: payload.to.clone().unwrap_or_default(),
            status,
            duration_seconds,
            machine_answered,
        }));
    }

    if let Some(message_sid) = &payload.message_sid {
        let raw_status = payload
            .message_status
            .as_deref()
            .ok_or_else(|| CoreError::Validation("Missing MessageStatus".into()))?;
        let (status, reason) = match raw_status {
            "sent" => (MessageEventStatus::Sent, None),
            "delivered" => (MessageEventStatus::Delivered, None),
            "undelivered" | "failed" => (
                MessageEventStatus::Failed,
                Some(format!("SMS {raw_status}")),
            ),
            // queued / sending / accepted carry no transition.
            _ => return Ok(None),
        };

        return Ok(Some(ProviderEvent::Message {
            message_id: message_sid.clone(),
            to: payload.to.clone().unwrap_or_default(),
            status,
            reason,
        }));
    }

    Err(CoreError::Validation(
        "Missing CallSid or MessageSid".into(),
    ))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn call_payload(status: &str) -> TwilioWebhook {
        TwilioWebhook {
            call_sid: Some("CA001".into()),
            call_status: Some(status.into()),
            to: Some("+12025550101".into()),
            ..Default::default()
        }
    }

    #[test]
    fn completed_call_carries_duration() {
        let mut payload = call_payload("completed");
        payload.call_duration = Some("12".into());

        let event = parse_webhook(&payload).unwrap().unwrap();
        assert_matches!(
            event,
            ProviderEvent::Call {
                status: CallEventStatus::Completed,
                duration_seconds: 12,
                machine_answered: false,
                ..
            }
        );
    }

    #[test]
    fn answered_by_machine_sets_the_flag() {
        let mut payload = call_payload("in-progress");
        payload.answered_by = Some("machine_end_beep".into());

        let event = parse_webhook(&payload).unwrap().unwrap();
        assert_matches!(event, ProviderEvent::Call { machine_answered: true, .. });
    }

    #[test]
    fn answered_by_human_does_not_set_the_flag() {
        let mut payload = call_payload("in-progress");
        payload.answered_by = Some("human".into());

        let event = parse_webhook(&payload).unwrap().unwrap();
        assert_matches!(event, ProviderEvent::Call { machine_answered: false, .. });
    }

    #[test]
    fn sms_statuses_normalize() {
        let payload = TwilioWebhook {
            message_sid: Some("SM001".into()),
            message_status: Some("undelivered".into()),
            to: Some("+12025550101".into()),
            ..Default::default()
        };

        let event = parse_webhook(&payload).unwrap().unwrap();
        assert_matches!(
            event,
            ProviderEvent::Message {
                status: MessageEventStatus::Failed,
                ref reason,
                ..
            } if reason.as_deref() == Some("SMS undelivered")
        );
    }

    #[test]
    fn progress_only_sms_status_is_acknowledged_without_event() {
        let payload = TwilioWebhook {
            message_sid: Some("SM001".into()),
            message_status: Some("queued".into()),
            ..Default::default()
        };
        assert!(parse_webhook(&payload).unwrap().is_none());
    }

    #[test]
    fn missing_both_sids_is_malformed() {
        let payload = TwilioWebhook::default();
        assert_matches!(parse_webhook(&payload), Err(CoreError::Validation(_)));
    }
}
