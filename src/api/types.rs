//! Wire records for the Assistants API
//!
//! Only the fields the client reads are modelled; everything else in a
//! response is ignored. A missing required field fails deserialization,
//! which the HTTP wrapper reports as [`crate::Error::MalformedResponse`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Written by the person at the keyboard
    User,
    /// Written by the remote assistant
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Assistant persona created at startup
#[derive(Debug, Clone, Deserialize)]
pub struct Assistant {
    /// Assistant identifier
    pub id: String,
    /// Model backing the assistant
    #[serde(default)]
    pub model: Option<String>,
}

/// Conversation ("thread") holding the turn sequence
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    /// Thread identifier
    pub id: String,
    /// Creation time
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

/// One message within a conversation
#[derive(Debug, Clone, Deserialize)]
pub struct Turn {
    /// Message identifier
    pub id: String,
    /// Author
    pub role: Role,
    /// Content parts
    #[serde(default)]
    pub content: Vec<ContentPart>,
    /// Creation time
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Text of the turn: all text parts joined by newlines
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.value.as_str()),
                ContentPart::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content part of a turn
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text {
        /// Text body
        text: TextContent,
    },
    /// Images, files and anything else this client does not render
    #[serde(other)]
    Other,
}

/// Text body of a content part
#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    /// The text itself
    pub value: String,
}

/// Page of turns returned by list-turns
#[derive(Debug, Clone, Deserialize)]
pub struct TurnList {
    /// Turns on this page
    pub data: Vec<Turn>,
}

/// Processing status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted, not started
    Queued,
    /// Assistant is working
    InProgress,
    /// Paused waiting on tool output
    RequiresAction,
    /// Cancellation requested
    Cancelling,
    /// Cancelled before finishing
    Cancelled,
    /// Ended with an error
    Failed,
    /// Finished with a reply
    Completed,
    /// Ended early, e.g. on a token limit
    Incomplete,
    /// Ran past its deadline
    Expired,
    /// Status added by the service after this client was written
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether the run finished successfully
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether the run stopped without producing a response
    ///
    /// `requires_action` counts as a failure: the assistant has no tools, so
    /// nothing can ever be submitted to resume it.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            Self::Failed | Self::Cancelled | Self::Expired | Self::Incomplete | Self::RequiresAction
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One processing request against a conversation
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    /// Run identifier
    pub id: String,
    /// Conversation the run belongs to
    pub thread_id: String,
    /// Current status
    pub status: RunStatus,
    /// Error reported when the run failed
    #[serde(default)]
    pub last_error: Option<RunError>,
}

/// Failure detail attached to a run
#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    /// Error code (e.g. "server_error", "rate_limit_exceeded")
    pub code: String,
    /// Human-readable message
    pub message: String,
}

#[derive(Serialize)]
pub(crate) struct CreateAssistantRequest<'a> {
    pub model: &'a str,
    pub instructions: &'a str,
}

#[derive(Serialize)]
pub(crate) struct AppendTurnRequest<'a> {
    pub role: Role,
    pub content: &'a str,
}

#[derive(Serialize)]
pub(crate) struct SubmitRunRequest<'a> {
    pub assistant_id: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_parses_text_content() {
        let turn: Turn = serde_json::from_str(
            r#"{
                "id": "msg_1",
                "object": "thread.message",
                "created_at": 1699012949,
                "thread_id": "thread_1",
                "role": "assistant",
                "content": [
                    {"type": "text", "text": {"value": "4", "annotations": []}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.text(), "4");
        assert_eq!(turn.created_at.timestamp(), 1_699_012_949);
    }

    #[test]
    fn turn_text_skips_non_text_parts() {
        let turn: Turn = serde_json::from_str(
            r#"{
                "id": "msg_1",
                "created_at": 1,
                "role": "assistant",
                "content": [
                    {"type": "image_file", "image_file": {"file_id": "f"}},
                    {"type": "text", "text": {"value": "first"}},
                    {"type": "text", "text": {"value": "second"}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(turn.text(), "first\nsecond");
    }

    #[test]
    fn turn_without_role_is_rejected() {
        let result: std::result::Result<Turn, _> =
            serde_json::from_str(r#"{"id": "msg_1", "created_at": 1, "content": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn run_status_parses_all_known_values() {
        for (raw, expected) in [
            ("queued", RunStatus::Queued),
            ("in_progress", RunStatus::InProgress),
            ("requires_action", RunStatus::RequiresAction),
            ("cancelling", RunStatus::Cancelling),
            ("cancelled", RunStatus::Cancelled),
            ("failed", RunStatus::Failed),
            ("completed", RunStatus::Completed),
            ("incomplete", RunStatus::Incomplete),
            ("expired", RunStatus::Expired),
        ] {
            let parsed: RunStatus = serde_json::from_str(&format!("\"{raw}\"")).unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(parsed.to_string(), raw);
        }
    }

    #[test]
    fn run_status_unknown_value_tolerated() {
        let parsed: RunStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(parsed, RunStatus::Unknown);
        assert!(!parsed.is_completed());
        assert!(!parsed.is_failure());
    }

    #[test]
    fn pending_statuses_are_not_terminal() {
        for status in [RunStatus::Queued, RunStatus::InProgress, RunStatus::Cancelling] {
            assert!(!status.is_completed());
            assert!(!status.is_failure());
        }
    }

    #[test]
    fn run_parses_last_error() {
        let run: Run = serde_json::from_str(
            r#"{
                "id": "run_1",
                "thread_id": "thread_1",
                "status": "failed",
                "last_error": {"code": "server_error", "message": "boom"}
            }"#,
        )
        .unwrap();

        assert!(run.status.is_failure());
        let err = run.last_error.unwrap();
        assert_eq!(err.code, "server_error");
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn append_request_serializes_lowercase_role() {
        let body = serde_json::to_value(AppendTurnRequest {
            role: Role::User,
            content: "What is 2+2?",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"role": "user", "content": "What is 2+2?"}));
    }
}
