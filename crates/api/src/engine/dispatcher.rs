//! Campaign dispatch engine.
//!
//! Fans a campaign's pending recipients out to the provider in fixed-size
//! batches: batches run sequentially with a short pause between them, sends
//! within a batch run concurrently, and every recipient's outcome is
//! isolated -- one failed send never aborts its siblings.

use std::sync::Arc;
use std::time::Duration;

use bullhorn_core::phone;
use bullhorn_core::types::DbId;
use bullhorn_db::models::call_log::NewCallLog;
use bullhorn_db::models::campaign::Campaign;
use bullhorn_db::models::recipient::RecipientContact;
use bullhorn_db::models::status::{CallStatus, CampaignStatus, ChannelKind};
use bullhorn_provider::ProviderAdapter;
use futures::future::join_all;
use serde::Serialize;

use crate::config::ServerConfig;
use crate::engine::store::{DeliveryStore, StoreError};

/// Aggregate outcome of one dispatch run. Per-recipient errors are recorded
/// on the recipient rows, not carried here.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DispatchSummary {
    pub total: usize,
    pub success_count: usize,
    pub fail_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Campaign {0} not found")]
    NotFound(DbId),

    /// The precondition check-and-set refused: the campaign is already
    /// sending or completed. Protects against double-triggering.
    #[error("Campaign {0} is already sending or completed")]
    AlreadyRunning(DbId),

    /// A fatal store failure -- e.g. the recipient list could not be
    /// enumerated at all. The run aborts without attempting any send.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the provider handed back for a successful send.
enum SendReceipt {
    Message(String),
    Call(String),
}

/// Campaign dispatch engine.
pub struct Dispatcher {
    store: Arc<dyn DeliveryStore>,
    provider: Arc<dyn ProviderAdapter>,
    batch_size: usize,
    batch_delay: Duration,
    callback_url: String,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn DeliveryStore>,
        provider: Arc<dyn ProviderAdapter>,
        config: &ServerConfig,
    ) -> Self {
        let callback_url = config.webhook_callback_url(provider.name());
        Self {
            store,
            provider,
            batch_size: config.dispatch_batch_size.max(1),
            batch_delay: config.dispatch_batch_delay(),
            callback_url,
        }
    }

    /// Run a campaign to completion: claim it, send to every pending
    /// recipient, and record the final status.
    ///
    /// The campaign ends `failed` only when every recipient failed;
    /// otherwise `completed`. Recipient rows are updated incrementally as
    /// sends finish, so concurrent readers observe partial progress.
    pub async fn dispatch(&self, campaign_id: DbId) -> Result<DispatchSummary, DispatchError> {
        let campaign = self
            .store
            .campaign(campaign_id)
            .await?
            .ok_or(DispatchError::NotFound(campaign_id))?;

        if !self.store.try_begin_sending(campaign_id).await? {
            return Err(DispatchError::AlreadyRunning(campaign_id));
        }

        let recipients = self.store.pending_recipients(campaign_id).await?;
        let total = recipients.len();

        if total == 0 {
            tracing::info!(campaign_id, "Campaign has no pending recipients");
            self.store
                .finish_campaign(campaign_id, CampaignStatus::Completed)
                .await?;
            return Ok(DispatchSummary {
                total: 0,
                success_count: 0,
                fail_count: 0,
            });
        }

        let batch_count = total.div_ceil(self.batch_size);
        tracing::info!(
            campaign_id,
            total,
            batch_size = self.batch_size,
            batch_count,
            "Campaign dispatch started",
        );

        let mut success_count = 0;
        let mut fail_count = 0;

        for (index, batch) in recipients.chunks(self.batch_size).enumerate() {
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|recipient| self.send_one(&campaign, recipient)),
            )
            .await;

            for sent in outcomes {
                if sent {
                    success_count += 1;
                } else {
                    fail_count += 1;
                }
            }

            tracing::debug!(
                campaign_id,
                batch = index + 1,
                batch_count,
                "Dispatch batch complete",
            );

            // Smooth provider-side rate limiting between batches.
            if index + 1 < batch_count {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        let final_status = if fail_count == total {
            CampaignStatus::Failed
        } else {
            CampaignStatus::Completed
        };
        self.store.finish_campaign(campaign_id, final_status).await?;

        tracing::info!(
            campaign_id,
            success_count,
            fail_count,
            failed = final_status == CampaignStatus::Failed,
            "Campaign dispatch finished",
        );

        Ok(DispatchSummary {
            total,
            success_count,
            fail_count,
        })
    }

    /// Send to one recipient and record the outcome. Returns whether the
    /// send succeeded; all errors stay inside this recipient.
    async fn send_one(&self, campaign: &Campaign, recipient: &RecipientContact) -> bool {
        match self.attempt_send(campaign, recipient).await {
            Ok(receipt) => {
                if let Err(e) = self.record_success(campaign, recipient, &receipt).await {
                    tracing::error!(
                        campaign_id = campaign.id,
                        recipient_id = recipient.id,
                        error = %e,
                        "Send succeeded but recording it failed",
                    );
                }
                true
            }
            Err(message) => {
                tracing::warn!(
                    campaign_id = campaign.id,
                    recipient_id = recipient.id,
                    error = %message,
                    "Recipient send failed",
                );
                if let Err(e) = self
                    .store
                    .mark_recipient_failed(recipient.id, &message)
                    .await
                {
                    tracing::error!(
                        recipient_id = recipient.id,
                        error = %e,
                        "Failed to record recipient failure",
                    );
                }
                false
            }
        }
    }

    /// Validate the channel payload, then call the provider. No retry: a
    /// failed send is terminal for this recipient within this run.
    async fn attempt_send(
        &self,
        campaign: &Campaign,
        recipient: &RecipientContact,
    ) -> Result<SendReceipt, String> {
        phone::validate_phone(&recipient.phone_number).map_err(|e| e.to_string())?;

        match ChannelKind::from_id(campaign.kind_id) {
            Some(ChannelKind::Sms) => {
                let body = campaign
                    .message
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .ok_or_else(|| "SMS campaign has no message body".to_string())?;
                let message_id = self
                    .provider
                    .send_message(&recipient.phone_number, body)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(SendReceipt::Message(message_id))
            }
            Some(ChannelKind::Voice) => {
                let audio_url = campaign
                    .audio_url
                    .as_deref()
                    .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
                    .ok_or_else(|| "Voice campaign has no resolvable audio URL".to_string())?;
                let call_id = self
                    .provider
                    .initiate_call(&recipient.phone_number, audio_url, &self.callback_url)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(SendReceipt::Call(call_id))
            }
            Some(ChannelKind::Whatsapp) => Err("WhatsApp sending is not yet supported".into()),
            None => Err(format!("Unknown channel kind: {}", campaign.kind_id)),
        }
    }

    /// Mark the recipient sent and, for voice, create the `initiated` call
    /// log row keyed by the provider call id.
    async fn record_success(
        &self,
        campaign: &Campaign,
        recipient: &RecipientContact,
        receipt: &SendReceipt,
    ) -> Result<(), StoreError> {
        match receipt {
            SendReceipt::Message(message_id) => {
                self.store
                    .mark_recipient_sent(recipient.id, Some(message_id))
                    .await
            }
            SendReceipt::Call(call_id) => {
                self.store.mark_recipient_sent(recipient.id, None).await?;
                self.store
                    .insert_call_log(&NewCallLog {
                        campaign_id: campaign.id,
                        contact_id: recipient.contact_id,
                        provider_call_id: call_id.clone(),
                        status_id: CallStatus::Initiated.id(),
                    })
                    .await?;
                Ok(())
            }
        }
    }
}
