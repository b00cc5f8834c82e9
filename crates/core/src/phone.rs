//! E.164 phone number validation and normalization.
//!
//! Providers reject anything that is not strict E.164, so numbers are
//! validated before a send is attempted and normalized when comparing a
//! webhook destination against stored contacts.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::CoreError;

/// E.164: `+`, a non-zero leading digit, then up to 14 more digits.
const E164_PATTERN: &str = r"^\+[1-9]\d{1,14}$";

fn e164_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(E164_PATTERN).expect("E164_PATTERN is a valid regex"))
}

/// Check whether a phone number is in strict E.164 format.
pub fn is_e164(phone: &str) -> bool {
    e164_regex().is_match(phone)
}

/// Validate a phone number, returning a descriptive error when it is not
/// E.164 (e.g. `+12345678901`).
pub fn validate_phone(phone: &str) -> Result<(), CoreError> {
    if is_e164(phone) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid phone number format: {phone}. Must be in E.164 format (e.g., +12345678901)"
        )))
    }
}

/// Normalize a loosely formatted number towards E.164: keep only the
/// digits and prefix `+`.
///
/// The result is not guaranteed valid; callers that need a guarantee run
/// [`validate_phone`] on it afterwards.
pub fn normalize_phone(phone: &str) -> String {
    let mut cleaned: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    cleaned.insert(0, '+');
    cleaned
}
