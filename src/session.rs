//! Conversation session: the assistant persona plus its thread
//!
//! Both are created once at startup and live for the process lifetime.

use crate::api::{AssistantApi, Role, Turn};
use crate::config::AssistantConfig;
use crate::Result;

/// Identifiers of the assistant and conversation in use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Assistant persona identifier
    pub assistant_id: String,
    /// Conversation identifier
    pub conversation_id: String,
}

impl Session {
    /// Create the assistant, then the conversation
    ///
    /// # Errors
    ///
    /// Returns error if either remote call fails; nothing is retried
    pub async fn start(api: &dyn AssistantApi, config: &AssistantConfig) -> Result<Self> {
        let assistant_id = create_assistant(api, config).await?;
        let conversation_id = create_conversation(api).await?;

        tracing::info!(
            assistant_id = %assistant_id,
            conversation_id = %conversation_id,
            "session started"
        );

        Ok(Self {
            assistant_id,
            conversation_id,
        })
    }

    /// Append a user turn to this session's conversation
    ///
    /// # Errors
    ///
    /// Returns error if the remote call fails
    pub async fn append_user_turn(&self, api: &dyn AssistantApi, text: &str) -> Result<Turn> {
        append_turn(api, &self.conversation_id, text, Role::User).await
    }
}

/// Create an assistant persona and return its identifier
///
/// # Errors
///
/// Returns error if the remote call fails
pub async fn create_assistant(api: &dyn AssistantApi, config: &AssistantConfig) -> Result<String> {
    let assistant = api
        .create_assistant(&config.model, &config.instructions)
        .await?;
    // Service reports the model it actually bound
    let model = assistant.model.as_deref().unwrap_or(&config.model);
    tracing::debug!(assistant_id = %assistant.id, model, "assistant created");
    Ok(assistant.id)
}

/// Create an empty conversation and return its identifier
///
/// # Errors
///
/// Returns error if the remote call fails
pub async fn create_conversation(api: &dyn AssistantApi) -> Result<String> {
    let conversation = api.create_conversation().await?;
    tracing::debug!(
        conversation_id = %conversation.id,
        created_at = %conversation.created_at,
        "conversation created"
    );
    Ok(conversation.id)
}

/// Append a turn to a conversation
///
/// # Errors
///
/// Returns error if the remote call fails
pub async fn append_turn(
    api: &dyn AssistantApi,
    conversation_id: &str,
    text: &str,
    role: Role,
) -> Result<Turn> {
    let turn = api.append_turn(conversation_id, text, role).await?;
    tracing::debug!(
        conversation_id,
        turn_id = %turn.id,
        role = %role,
        chars = text.len(),
        "turn appended"
    );
    Ok(turn)
}
