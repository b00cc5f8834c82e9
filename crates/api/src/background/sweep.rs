//! Reconciliation sweep: recovery for lost provider callbacks.
//!
//! A recipient whose webhook was lost sits in `sent` forever. This periodic
//! task polls the provider for ground truth on any recipient `sent` longer
//! than the configured threshold and feeds the answer through the same
//! reconciler transitions the webhook path uses, so applying it is
//! idempotent and terminal-protected.

use std::sync::Arc;
use std::time::Duration;

use bullhorn_core::event::ProviderEvent;
use bullhorn_db::models::recipient::Recipient;
use bullhorn_provider::ProviderAdapter;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::engine::reconciler::{ReconcileOutcome, Reconciler};
use crate::engine::store::DeliveryStore;

pub struct ReconciliationSweep {
    store: Arc<dyn DeliveryStore>,
    provider: Arc<dyn ProviderAdapter>,
    interval: Duration,
    stuck_after: chrono::Duration,
}

impl ReconciliationSweep {
    pub fn new(
        store: Arc<dyn DeliveryStore>,
        provider: Arc<dyn ProviderAdapter>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            store,
            provider,
            interval: Duration::from_secs(config.sweep_interval_secs),
            stuck_after: chrono::Duration::seconds(config.sweep_stuck_after_secs as i64),
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            stuck_after_secs = self.stuck_after.num_seconds(),
            "Reconciliation sweep started",
        );

        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Reconciliation sweep stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(resolved) if resolved > 0 => {
                            tracing::info!(resolved, "Sweep resolved stuck recipients");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Sweep cycle failed");
                        }
                    }
                }
            }
        }
    }

    /// One sweep cycle. Returns how many stuck recipients were resolved.
    /// Per-recipient failures are logged and do not stop the cycle.
    pub async fn sweep_once(&self) -> anyhow::Result<usize> {
        let cutoff = Utc::now() - self.stuck_after;
        let stuck = self.store.stuck_recipients(cutoff).await?;
        if stuck.is_empty() {
            return Ok(0);
        }

        tracing::info!(count = stuck.len(), "Found recipients stuck in sent");
        let reconciler = Reconciler::new(Arc::clone(&self.store));

        let mut resolved = 0;
        for recipient in &stuck {
            match self.poll_one(&reconciler, recipient).await {
                Ok(true) => resolved += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        recipient_id = recipient.id,
                        campaign_id = recipient.campaign_id,
                        error = %e,
                        "Sweep: could not reconcile recipient",
                    );
                }
            }
        }
        Ok(resolved)
    }

    /// Poll the provider for one stuck recipient's call and apply the
    /// result. Returns whether a transition was applied.
    async fn poll_one(
        &self,
        reconciler: &Reconciler,
        recipient: &Recipient,
    ) -> anyhow::Result<bool> {
        let Some(log) = self
            .store
            .call_log_for(recipient.campaign_id, recipient.contact_id)
            .await?
        else {
            // SMS recipients have no call to poll; nothing to recover from
            // here, so leave them for operator attention.
            tracing::warn!(
                recipient_id = recipient.id,
                campaign_id = recipient.campaign_id,
                "Stuck recipient has no call log; skipping",
            );
            return Ok(false);
        };

        let snapshot = self.provider.call_snapshot(&log.provider_call_id).await?;
        if !snapshot.status.is_terminal() {
            // Still live on the provider side; the webhook may yet arrive.
            return Ok(false);
        }

        let event = ProviderEvent::Call {
            call_id: log.provider_call_id.clone(),
            to: String::new(),
            status: snapshot.status,
            duration_seconds: snapshot.duration_seconds,
            machine_answered: false,
        };
        let outcome = reconciler.handle_event(&event).await?;

        tracing::info!(
            recipient_id = recipient.id,
            call_id = %log.provider_call_id,
            status = snapshot.status.as_str(),
            applied = outcome == ReconcileOutcome::Applied,
            "Sweep reconciled call from provider snapshot",
        );
        Ok(outcome == ReconcileOutcome::Applied)
    }
}
