//! Route definitions for the `/campaigns` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::campaigns;
use crate::state::AppState;

/// Routes mounted at `/campaigns`.
///
/// ```text
/// POST   /                  -> create_campaign
/// GET    /{id}              -> get_campaign
/// POST   /{id}/recipients   -> add_recipients
/// POST   /{id}/send         -> send_campaign
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(campaigns::create_campaign))
        .route("/{id}", get(campaigns::get_campaign))
        .route("/{id}/recipients", post(campaigns::add_recipients))
        .route("/{id}/send", post(campaigns::send_campaign))
}
