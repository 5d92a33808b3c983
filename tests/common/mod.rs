//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use beacon_assistant::api::{Assistant, ContentPart, Conversation, TextContent};
use beacon_assistant::voice::{AudioSink, SpeechSynthesizer};
use beacon_assistant::{AssistantApi, PollPolicy, Result, Role, Run, RunStatus, Session, Turn};

/// Remote call observed by [`FakeApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateAssistant { model: String, instructions: String },
    CreateConversation,
    AppendTurn { conversation_id: String, text: String, role: Role },
    SubmitRun { conversation_id: String, assistant_id: String },
    RetrieveRun { run_id: String },
    ListTurns { conversation_id: String },
}

struct FakeState {
    calls: Vec<Call>,
    turns: Vec<Turn>,
    statuses: VecDeque<RunStatus>,
    answered: Vec<String>,
    clock: i64,
    runs: u32,
}

/// In-memory stand-in for the remote assistant service
///
/// Runs replay `statuses` (the last one repeats). When a run reaches
/// `completed` the fake appends an assistant turn produced by `answer`.
pub struct FakeApi {
    state: Mutex<FakeState>,
    answer: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl FakeApi {
    pub fn new<F>(statuses: &[RunStatus], answer: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(FakeState {
                calls: Vec::new(),
                turns: Vec::new(),
                statuses: statuses.iter().copied().collect(),
                answered: Vec::new(),
                clock: 1_700_000_000,
                runs: 0,
            }),
            answer: Box::new(answer),
        }
    }

    /// Answers arithmetic the way the happy-path scenario expects
    pub fn arithmetic() -> Self {
        Self::new(&[RunStatus::Queued, RunStatus::InProgress, RunStatus::Completed], |q| {
            Some(match q {
                "What is 2+2?" => "4".to_string(),
                "And 3+3?" => "6".to_string(),
                other => format!("I don't know about {other}"),
            })
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.state.lock().unwrap().turns.clone()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn text_turn(id: String, role: Role, text: &str, ts: i64) -> Turn {
    Turn {
        id,
        role,
        content: vec![ContentPart::Text {
            text: TextContent {
                value: text.to_string(),
            },
        }],
        created_at: Utc.timestamp_opt(ts, 0).unwrap(),
    }
}

#[async_trait]
impl AssistantApi for FakeApi {
    async fn create_assistant(&self, model: &str, instructions: &str) -> Result<Assistant> {
        self.record(Call::CreateAssistant {
            model: model.to_string(),
            instructions: instructions.to_string(),
        });
        Ok(Assistant {
            id: "asst_1".to_string(),
            model: Some(model.to_string()),
        })
    }

    async fn create_conversation(&self) -> Result<Conversation> {
        self.record(Call::CreateConversation);
        Ok(Conversation {
            id: "thread_1".to_string(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        })
    }

    async fn append_turn(&self, conversation_id: &str, text: &str, role: Role) -> Result<Turn> {
        self.record(Call::AppendTurn {
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            role,
        });
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let turn = text_turn(format!("msg_{}", state.turns.len() + 1), role, text, state.clock);
        state.turns.push(turn.clone());
        Ok(turn)
    }

    async fn submit_run(&self, conversation_id: &str, assistant_id: &str) -> Result<Run> {
        self.record(Call::SubmitRun {
            conversation_id: conversation_id.to_string(),
            assistant_id: assistant_id.to_string(),
        });
        let mut state = self.state.lock().unwrap();
        state.runs += 1;
        Ok(Run {
            id: format!("run_{}", state.runs),
            thread_id: conversation_id.to_string(),
            status: RunStatus::Queued,
            last_error: None,
        })
    }

    async fn retrieve_run(&self, conversation_id: &str, run_id: &str) -> Result<Run> {
        self.record(Call::RetrieveRun {
            run_id: run_id.to_string(),
        });
        let mut state = self.state.lock().unwrap();
        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front().unwrap()
        } else {
            *state.statuses.front().unwrap()
        };

        if status == RunStatus::Completed && !state.answered.iter().any(|r| r == run_id) {
            state.answered.push(run_id.to_string());
            let question = state
                .turns
                .iter()
                .rev()
                .find(|t| t.role == Role::User)
                .map(Turn::text)
                .unwrap_or_default();
            if let Some(reply) = (self.answer)(&question) {
                state.clock += 1;
                let turn = text_turn(
                    format!("msg_{}", state.turns.len() + 1),
                    Role::Assistant,
                    &reply,
                    state.clock,
                );
                state.turns.push(turn);
            }
        }

        // A completed run with more questions to come starts the script over
        if status == RunStatus::Completed {
            state.statuses = [RunStatus::InProgress, RunStatus::Completed].into_iter().collect();
        }

        Ok(Run {
            id: run_id.to_string(),
            thread_id: conversation_id.to_string(),
            status,
            last_error: None,
        })
    }

    async fn list_turns(&self, conversation_id: &str) -> Result<Vec<Turn>> {
        self.record(Call::ListTurns {
            conversation_id: conversation_id.to_string(),
        });
        // Newest first, like the real listing
        let mut turns = self.state.lock().unwrap().turns.clone();
        turns.reverse();
        Ok(turns)
    }
}

/// Records the text it was asked to speak and returns fake audio
#[derive(Default)]
pub struct RecordingSynth {
    texts: Mutex<Vec<String>>,
}

impl RecordingSynth {
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynth {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(format!("audio:{text}").into_bytes())
    }
}

/// Records every payload it was asked to play
#[derive(Default)]
pub struct RecordingSink {
    played: Mutex<Vec<Vec<u8>>>,
}

impl RecordingSink {
    pub fn played(&self) -> Vec<Vec<u8>> {
        self.played.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, audio: &[u8]) -> Result<()> {
        self.played.lock().unwrap().push(audio.to_vec());
        Ok(())
    }
}

/// Session as [`Session::start`] would produce against [`FakeApi`]
pub fn fake_session() -> Session {
    Session {
        assistant_id: "asst_1".to_string(),
        conversation_id: "thread_1".to_string(),
    }
}

/// Poll policy that doesn't slow tests down
pub fn fast_poll() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(1),
        max_attempts: 20,
    }
}
