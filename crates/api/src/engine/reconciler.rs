//! Delivery-status reconciler.
//!
//! Consumes normalized provider lifecycle events and advances call-log and
//! recipient state. Providers deliver events out of order and more than
//! once, so every transition is terminal-protected: once a call log or
//! recipient reaches a terminal status, later events for it are no-ops.

use std::sync::Arc;

use bullhorn_core::delivery::call_was_answered;
use bullhorn_core::event::{CallEventStatus, MessageEventStatus, ProviderEvent};
use bullhorn_core::phone::normalize_phone;
use bullhorn_core::types::DbId;
use bullhorn_db::models::call_log::{CallLogEntry, NewCallLog};
use bullhorn_db::models::status::{CallStatus, RecipientStatus};

use crate::engine::store::{DeliveryStore, StoreError};

/// What handling an event amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// State was updated.
    Applied,
    /// The event was recognized but changed nothing -- a duplicate, or a
    /// progress update for an already-terminal call.
    Ignored,
    /// The event referenced no resolvable delivery record and was
    /// acknowledged without mutation.
    Dropped,
}

/// Webhook-triggered state machine over the delivery store.
///
/// Stateless per call: safe to invoke concurrently for unrelated provider
/// identifiers.
pub struct Reconciler {
    store: Arc<dyn DeliveryStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn DeliveryStore>) -> Self {
        Self { store }
    }

    /// Apply one provider event.
    ///
    /// Store failures propagate so the webhook ingress can answer non-2xx
    /// and let the provider redeliver; redelivery is safe because terminal
    /// states are never overwritten.
    pub async fn handle_event(
        &self,
        event: &ProviderEvent,
    ) -> Result<ReconcileOutcome, StoreError> {
        match event {
            ProviderEvent::Call {
                call_id,
                to,
                status,
                duration_seconds,
                machine_answered,
            } => {
                self.handle_call(call_id, to, *status, *duration_seconds, *machine_answered)
                    .await
            }
            ProviderEvent::Message {
                message_id,
                to,
                status,
                reason,
            } => {
                self.handle_message(message_id, to, *status, reason.as_deref())
                    .await
            }
        }
    }

    async fn handle_call(
        &self,
        call_id: &str,
        to: &str,
        status: CallEventStatus,
        duration_seconds: i32,
        machine_answered: bool,
    ) -> Result<ReconcileOutcome, StoreError> {
        let log = match self.store.call_log(call_id).await? {
            Some(log) => log,
            None => match self.self_heal(call_id, to).await? {
                Some(log) => log,
                None => return Ok(ReconcileOutcome::Dropped),
            },
        };

        // Terminal call logs accept no further events. This is the
        // monotonicity guarantee: a late Ringing retry cannot reopen a
        // completed call, and duplicate terminal events are idempotent.
        if CallStatus::from_id(log.status_id).is_some_and(CallStatus::is_terminal) {
            tracing::debug!(call_id, "Event for terminal call ignored");
            return Ok(ReconcileOutcome::Ignored);
        }

        // Answering-machine detection wins over whatever status came with
        // the event, including a later Completed with a long duration.
        if machine_answered {
            self.store
                .close_call(call_id, CallStatus::MachineDetected, false, 0)
                .await?;
            self.fail_recipient(log.campaign_id, log.contact_id, "Voicemail detected")
                .await?;
            tracing::info!(call_id, "Voicemail detected; call closed");
            return Ok(ReconcileOutcome::Applied);
        }

        match status {
            CallEventStatus::Initiated | CallEventStatus::Ringing | CallEventStatus::InProgress => {
                // Progress only -- the recipient stays `sent` until the
                // terminal event's duration decides the outcome.
                let changed = self.store.update_call_status(call_id, status.into()).await?;
                Ok(if changed > 0 {
                    ReconcileOutcome::Applied
                } else {
                    ReconcileOutcome::Ignored
                })
            }
            CallEventStatus::Completed => {
                let answered = call_was_answered(duration_seconds);
                let changed = self
                    .store
                    .close_call(call_id, CallStatus::Completed, answered, duration_seconds)
                    .await?;
                if changed == 0 {
                    return Ok(ReconcileOutcome::Ignored);
                }
                if answered {
                    self.deliver_recipient(log.campaign_id, log.contact_id).await?;
                } else {
                    self.fail_recipient(
                        log.campaign_id,
                        log.contact_id,
                        "Call declined or not answered",
                    )
                    .await?;
                }
                tracing::info!(call_id, duration_seconds, answered, "Call completed");
                Ok(ReconcileOutcome::Applied)
            }
            CallEventStatus::Busy
            | CallEventStatus::Failed
            | CallEventStatus::NoAnswer
            | CallEventStatus::Canceled => {
                let changed = self
                    .store
                    .close_call(call_id, status.into(), false, duration_seconds)
                    .await?;
                if changed == 0 {
                    return Ok(ReconcileOutcome::Ignored);
                }
                self.fail_recipient(log.campaign_id, log.contact_id, failure_reason(status))
                    .await?;
                tracing::info!(call_id, status = status.as_str(), "Call ended without answer");
                Ok(ReconcileOutcome::Applied)
            }
        }
    }

    async fn handle_message(
        &self,
        message_id: &str,
        to: &str,
        status: MessageEventStatus,
        reason: Option<&str>,
    ) -> Result<ReconcileOutcome, StoreError> {
        let (recipient_status, error) = match status {
            MessageEventStatus::Sent => (RecipientStatus::Sent, None),
            MessageEventStatus::Delivered => (RecipientStatus::Delivered, None),
            MessageEventStatus::Failed => (
                RecipientStatus::Failed,
                Some(reason.unwrap_or("Message delivery failed")),
            ),
        };

        let changed = self
            .store
            .update_recipient_by_message_id(message_id, recipient_status, error)
            .await?;
        if changed > 0 {
            tracing::debug!(message_id, "Message event applied");
            return Ok(ReconcileOutcome::Applied);
        }

        // Unknown message id, or a duplicate against a terminal recipient.
        // Try the same phone-number lookup the call path uses; a terminal
        // recipient is no longer pending/sent, so duplicates fall through
        // to Dropped without mutation.
        let candidates = self
            .store
            .active_recipients_by_phone(&normalize_phone(to))
            .await?;
        match candidates.as_slice() {
            [candidate] => {
                tracing::info!(
                    message_id,
                    recipient_id = candidate.id,
                    "Message event resolved by phone lookup",
                );
                match recipient_status {
                    RecipientStatus::Sent => {
                        self.store
                            .mark_recipient_sent(candidate.id, Some(message_id))
                            .await?;
                    }
                    _ => {
                        self.store
                            .update_recipient_by_campaign_contact(
                                candidate.campaign_id,
                                candidate.contact_id,
                                recipient_status,
                                error,
                            )
                            .await?;
                    }
                }
                Ok(ReconcileOutcome::Applied)
            }
            [] => {
                tracing::warn!(message_id, "Message event matches no delivery record; dropped");
                Ok(ReconcileOutcome::Dropped)
            }
            multiple => {
                tracing::warn!(
                    message_id,
                    candidates = multiple.len(),
                    "Message event matches multiple recipients; dropped",
                );
                Ok(ReconcileOutcome::Dropped)
            }
        }
    }

    /// Lazily create a call log for an event that arrived before the
    /// dispatcher's own write, locating the recipient by destination number.
    ///
    /// Only an unambiguous match heals; with zero or several candidates the
    /// event is dropped. Known limitation: a contact who is a pending
    /// recipient in two concurrently sending campaigns is ambiguous by
    /// construction, and events for them drop until one campaign's record
    /// resolves.
    async fn self_heal(
        &self,
        call_id: &str,
        to: &str,
    ) -> Result<Option<CallLogEntry>, StoreError> {
        if to.is_empty() {
            tracing::warn!(call_id, "Unknown call id with no destination; dropped");
            return Ok(None);
        }

        let candidates = self
            .store
            .active_recipients_by_phone(&normalize_phone(to))
            .await?;
        match candidates.as_slice() {
            [candidate] => {
                let log = self
                    .store
                    .insert_call_log(&NewCallLog {
                        campaign_id: candidate.campaign_id,
                        contact_id: candidate.contact_id,
                        provider_call_id: call_id.to_string(),
                        status_id: CallStatus::Initiated.id(),
                    })
                    .await?;
                tracing::info!(
                    call_id,
                    campaign_id = candidate.campaign_id,
                    contact_id = candidate.contact_id,
                    "Created missing call log from webhook event",
                );
                Ok(Some(log))
            }
            [] => {
                tracing::warn!(call_id, to, "Unknown call id matches no active recipient; dropped");
                Ok(None)
            }
            multiple => {
                tracing::warn!(
                    call_id,
                    to,
                    candidates = multiple.len(),
                    "Unknown call id matches multiple active recipients; dropped",
                );
                Ok(None)
            }
        }
    }

    async fn deliver_recipient(&self, campaign_id: DbId, contact_id: DbId) -> Result<(), StoreError> {
        let changed = self
            .store
            .update_recipient_by_campaign_contact(
                campaign_id,
                contact_id,
                RecipientStatus::Delivered,
                None,
            )
            .await?;
        if changed == 0 {
            tracing::debug!(campaign_id, contact_id, "Recipient already terminal");
        }
        Ok(())
    }

    async fn fail_recipient(
        &self,
        campaign_id: DbId,
        contact_id: DbId,
        reason: &str,
    ) -> Result<(), StoreError> {
        let changed = self
            .store
            .update_recipient_by_campaign_contact(
                campaign_id,
                contact_id,
                RecipientStatus::Failed,
                Some(reason),
            )
            .await?;
        if changed == 0 {
            tracing::debug!(campaign_id, contact_id, "Recipient already terminal");
        }
        Ok(())
    }
}

/// Human-readable recipient error for a deterministic terminal call status.
fn failure_reason(status: CallEventStatus) -> &'static str {
    match status {
        CallEventStatus::Busy => "Line busy",
        CallEventStatus::Failed => "Call failed",
        CallEventStatus::NoAnswer => "No answer",
        CallEventStatus::Canceled => "Call canceled",
        // Non-terminal statuses never reach this mapping.
        _ => "Call did not connect",
    }
}
