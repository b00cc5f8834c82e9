use std::sync::Arc;

use bullhorn_provider::ProviderAdapter;

use crate::config::ServerConfig;
use crate::engine::dispatcher::Dispatcher;
use crate::engine::reconciler::Reconciler;
use crate::engine::store::DeliveryStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). Handlers see the
/// store only through the narrow [`DeliveryStore`] trait, never a raw pool.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Per-(campaign, contact) delivery state and call/message logs.
    pub store: Arc<dyn DeliveryStore>,
    /// The configured telephony provider.
    pub provider: Arc<dyn ProviderAdapter>,
    /// Campaign dispatch engine.
    pub dispatcher: Arc<Dispatcher>,
    /// Webhook-driven delivery-status state machine.
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    /// Wire up the engine components around a store and provider.
    pub fn new(
        config: Arc<ServerConfig>,
        store: Arc<dyn DeliveryStore>,
        provider: Arc<dyn ProviderAdapter>,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&provider),
            &config,
        ));
        let reconciler = Arc::new(Reconciler::new(Arc::clone(&store)));

        Self {
            config,
            store,
            provider,
            dispatcher,
            reconciler,
        }
    }
}
