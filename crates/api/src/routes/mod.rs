pub mod campaigns;
pub mod cron;
pub mod health;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// All routes mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/campaigns", campaigns::router())
        .nest("/webhooks", webhooks::router())
        .nest("/cron", cron::router())
}
