//! Normalized provider-event vocabulary.
//!
//! Every webhook payload, regardless of provider, is parsed at the adapter
//! boundary into one of these variants before it reaches the reconciler.
//! Untyped provider fields never flow past this point.

use serde::Serialize;

/// Lifecycle status of a voice call as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallEventStatus {
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Busy,
    Failed,
    NoAnswer,
    Canceled,
}

impl CallEventStatus {
    /// Whether this status ends the call's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Busy | Self::Failed | Self::NoAnswer | Self::Canceled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Ringing => "ringing",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Busy => "busy",
            Self::Failed => "failed",
            Self::NoAnswer => "no-answer",
            Self::Canceled => "canceled",
        }
    }
}

/// Delivery status of an outbound message (SMS) as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageEventStatus {
    Sent,
    Delivered,
    Failed,
}

/// A provider lifecycle event, normalized across providers.
#[derive(Debug, Clone, Serialize)]
pub enum ProviderEvent {
    /// Voice call lifecycle update.
    Call {
        /// Provider-assigned call identifier (Twilio CallSid, Telnyx
        /// call_control_id).
        call_id: String,
        /// Destination number in E.164.
        to: String,
        status: CallEventStatus,
        /// Total call duration; only meaningful on terminal events.
        duration_seconds: i32,
        /// Provider answering-machine detection classified the callee as a
        /// machine/voicemail. Takes priority over `status`.
        machine_answered: bool,
    },
    /// Message delivery update.
    Message {
        /// Provider-assigned message identifier.
        message_id: String,
        /// Destination number in E.164.
        to: String,
        status: MessageEventStatus,
        /// Provider-supplied failure reason, when there is one.
        reason: Option<String>,
    },
}

impl ProviderEvent {
    /// The provider identifier the event is keyed by.
    pub fn provider_id(&self) -> &str {
        match self {
            Self::Call { call_id, .. } => call_id,
            Self::Message { message_id, .. } => message_id,
        }
    }

    /// Destination phone number the event refers to.
    pub fn destination(&self) -> &str {
        match self {
            Self::Call { to, .. } => to,
            Self::Message { to, .. } => to,
        }
    }
}
