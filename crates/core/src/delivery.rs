//! Answered-call heuristic.

/// Minimum call duration, in seconds, for a completed call to count as
/// answered by a human.
///
/// Declined or immediately rejected calls report 0-2 seconds of duration;
/// a human accepting the call and hearing at least part of the message
/// reports 3 or more.
pub const ANSWERED_MIN_SECONDS: i32 = 3;

/// Apply the answered heuristic to a completed call's duration.
pub fn call_was_answered(duration_seconds: i32) -> bool {
    duration_seconds >= ANSWERED_MIN_SECONDS
}
