//! The campaign dispatch engine and the delivery-status reconciler, plus
//! the narrow store interface both operate against.

pub mod dispatcher;
pub mod reconciler;
pub mod store;
