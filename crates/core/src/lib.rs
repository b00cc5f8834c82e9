//! Domain types shared across the bullhorn workspace.
//!
//! Pure logic only: the normalized provider-event vocabulary, phone-number
//! validation, the answered heuristic, and the domain error type. No I/O.

pub mod delivery;
pub mod error;
pub mod event;
pub mod phone;
pub mod types;
