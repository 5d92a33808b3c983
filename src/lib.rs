//! Beacon Assistant - voice client for the OpenAI Assistants API
//!
//! Reads a question from the terminal, hands it to a remote assistant,
//! waits for the run to finish, then speaks the answer:
//!
//! ```text
//! stdin ──► append turn ──► submit run ──► poll run ──► list turns
//!                                                          │
//! speaker ◄── playback ◄── synthesize ◄── latest assistant turn
//! ```
//!
//! Every remote collaborator sits behind a trait ([`AssistantApi`],
//! [`SpeechSynthesizer`], [`AudioSink`]) so the loop can be driven without
//! network or audio hardware.

pub mod api;
pub mod assistant;
pub mod config;
pub mod error;
pub mod extract;
pub mod run;
pub mod session;
pub mod voice;

pub use api::{AssistantApi, HttpClient, OpenAiAssistants, Role, Run, RunStatus, Turn};
pub use assistant::{LoopOutcome, Stage, VoiceAssistant};
pub use config::Config;
pub use error::{Error, Result};
pub use extract::{NO_RESPONSE, latest_assistant_response};
pub use run::{PollPolicy, poll_until_terminal, submit_run};
pub use session::Session;
pub use voice::{AudioBuffer, AudioFormat, AudioPlayback, AudioSink, SpeechSynthesizer, TextToSpeech};
