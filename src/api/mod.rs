//! Remote conversational service
//!
//! [`AssistantApi`] is the seam between the interactive loop and the
//! network. [`OpenAiAssistants`] implements it over [`HttpClient`].

mod client;
mod types;

use async_trait::async_trait;

pub use client::{HttpClient, check_status, decode_json};
pub use types::{
    Assistant, ContentPart, Conversation, Role, Run, RunError, RunStatus, TextContent, Turn,
    TurnList,
};

use crate::Result;
use types::{AppendTurnRequest, CreateAssistantRequest, SubmitRunRequest};

/// Operations the assistant loop needs from the remote service
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Create an assistant persona
    async fn create_assistant(&self, model: &str, instructions: &str) -> Result<Assistant>;

    /// Create a new, empty conversation
    async fn create_conversation(&self) -> Result<Conversation>;

    /// Append a turn to a conversation
    async fn append_turn(&self, conversation_id: &str, text: &str, role: Role) -> Result<Turn>;

    /// Start processing every turn added since the last run
    async fn submit_run(&self, conversation_id: &str, assistant_id: &str) -> Result<Run>;

    /// Fetch the current state of a run
    async fn retrieve_run(&self, conversation_id: &str, run_id: &str) -> Result<Run>;

    /// List the turns of a conversation
    async fn list_turns(&self, conversation_id: &str) -> Result<Vec<Turn>>;
}

/// `OpenAI` Assistants API client
#[derive(Clone, Debug)]
pub struct OpenAiAssistants {
    http: HttpClient,
}

impl OpenAiAssistants {
    /// Wrap an authenticated HTTP client
    #[must_use]
    pub const fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AssistantApi for OpenAiAssistants {
    async fn create_assistant(&self, model: &str, instructions: &str) -> Result<Assistant> {
        let request = CreateAssistantRequest {
            model,
            instructions,
        };
        self.http.post_json("assistants", &request, "assistant").await
    }

    async fn create_conversation(&self) -> Result<Conversation> {
        self.http.post_empty("threads", "thread").await
    }

    async fn append_turn(&self, conversation_id: &str, text: &str, role: Role) -> Result<Turn> {
        let request = AppendTurnRequest {
            role,
            content: text,
        };
        self.http
            .post_json(
                &format!("threads/{conversation_id}/messages"),
                &request,
                "message",
            )
            .await
    }

    async fn submit_run(&self, conversation_id: &str, assistant_id: &str) -> Result<Run> {
        let request = SubmitRunRequest { assistant_id };
        self.http
            .post_json(&format!("threads/{conversation_id}/runs"), &request, "run")
            .await
    }

    async fn retrieve_run(&self, conversation_id: &str, run_id: &str) -> Result<Run> {
        self.http
            .get_json(&format!("threads/{conversation_id}/runs/{run_id}"), "run")
            .await
    }

    async fn list_turns(&self, conversation_id: &str) -> Result<Vec<Turn>> {
        let list: TurnList = self
            .http
            .get_json(&format!("threads/{conversation_id}/messages"), "message list")
            .await?;
        Ok(list.data)
    }
}
