pub mod call_log;
pub mod campaign;
pub mod contact;
pub mod recipient;
pub mod status;
