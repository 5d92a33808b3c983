//! Picking the assistant's answer out of a conversation

use crate::api::{Role, Turn};

/// Returned when a conversation holds no assistant turn
pub const NO_RESPONSE: &str = "No response found.";

/// Text of the newest assistant turn, or [`NO_RESPONSE`]
///
/// Turns are ordered by creation time; ties keep their listing order, so
/// the later-listed of two same-second turns wins.
#[must_use]
pub fn latest_assistant_response(turns: &[Turn]) -> String {
    let mut assistant: Vec<&Turn> = turns.iter().filter(|t| t.role == Role::Assistant).collect();
    assistant.sort_by_key(|t| t.created_at);

    assistant
        .last()
        .map_or_else(|| NO_RESPONSE.to_string(), |t| t.text())
}
