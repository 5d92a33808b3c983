//! Interactive question/answer loop
//!
//! One cycle walks `AwaitingInput → Submitting → Polling → Extracting →
//! Synthesizing → Playing` and back to `AwaitingInput`. A query is fully
//! resolved, playback included, before the next prompt. Any error ends the
//! loop.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use crate::api::AssistantApi;
use crate::extract::latest_assistant_response;
use crate::run::{PollPolicy, poll_until_terminal, submit_run};
use crate::session::Session;
use crate::voice::{AudioSink, SpeechSynthesizer};
use crate::{Error, Result};

/// Prompt shown before each question
pub const PROMPT: &str = "Enter your question for the assistant (or type 'exit' to quit): ";

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Prompt shown, waiting for a line
    AwaitingInput,
    /// Appending the question and starting a run
    Submitting,
    /// Waiting for the run to finish
    Polling,
    /// Reading the newest answer
    Extracting,
    /// Turning the answer into audio
    Synthesizing,
    /// Audio is playing
    Playing,
    /// User asked to leave
    Exit,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingInput => "awaiting_input",
            Self::Submitting => "submitting",
            Self::Polling => "polling",
            Self::Extracting => "extracting",
            Self::Synthesizing => "synthesizing",
            Self::Playing => "playing",
            Self::Exit => "exit",
        };
        f.write_str(s)
    }
}

/// Why the loop stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// User typed `exit`
    Exited,
    /// Input stream closed
    EndOfInput,
    /// Cancelled while waiting for input
    Interrupted,
}

/// Whether a line asks to leave the loop
#[must_use]
pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Ties the remote assistant, speech synthesis and playback together
pub struct VoiceAssistant<'a> {
    api: &'a dyn AssistantApi,
    speech: &'a dyn SpeechSynthesizer,
    sink: &'a dyn AudioSink,
    session: Session,
    poll: PollPolicy,
    cancel: CancellationToken,
}

impl<'a> VoiceAssistant<'a> {
    /// Create a loop over an already-started session
    #[must_use]
    pub fn new(
        api: &'a dyn AssistantApi,
        speech: &'a dyn SpeechSynthesizer,
        sink: &'a dyn AudioSink,
        session: Session,
        poll: PollPolicy,
    ) -> Self {
        Self {
            api,
            speech,
            sink,
            session,
            poll,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` to interrupt the prompt or a query in progress
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Session in use
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Send a question and wait for the assistant's text answer
    ///
    /// # Errors
    ///
    /// Returns error if any remote call fails, the run fails or times out,
    /// or the query is cancelled
    pub async fn ask(&self, question: &str) -> Result<String> {
        let conversation_id = &self.session.conversation_id;

        self.check_cancelled()?;
        enter(Stage::Submitting);
        self.session.append_user_turn(self.api, question).await?;
        let run = submit_run(self.api, conversation_id, &self.session.assistant_id).await?;

        enter(Stage::Polling);
        poll_until_terminal(self.api, conversation_id, &run.id, &self.poll, &self.cancel).await?;

        enter(Stage::Extracting);
        let turns = self.api.list_turns(conversation_id).await?;
        tracing::debug!(turns = turns.len(), "listed turns");
        self.check_cancelled()?;

        Ok(latest_assistant_response(&turns))
    }

    /// Synthesize `text` and play it
    ///
    /// # Errors
    ///
    /// Returns error if synthesis, decoding or playback fails, or `Cancelled`
    /// if the token fires first
    pub async fn speak(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            tracing::debug!("empty response, nothing to speak");
            return Ok(());
        }

        self.check_cancelled()?;
        enter(Stage::Synthesizing);
        let audio = self.speech.synthesize(text).await?;

        self.check_cancelled()?;
        enter(Stage::Playing);
        self.sink.play(&audio).await
    }

    /// Read questions from `input` until `exit`, end of input or cancellation
    ///
    /// Prompts and answers are written to `output`.
    ///
    /// # Errors
    ///
    /// Returns the first error from any stage, or an IO error on the streams
    pub async fn run<R, W>(&self, input: R, output: &mut W) -> Result<LoopOutcome>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();

        loop {
            enter(Stage::AwaitingInput);
            write!(output, "{PROMPT}")?;
            output.flush()?;

            // A fired token wins over a line already buffered
            let line = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    writeln!(output)?;
                    return Ok(LoopOutcome::Interrupted);
                }
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                writeln!(output)?;
                return Ok(LoopOutcome::EndOfInput);
            };

            if is_exit_command(&line) {
                enter(Stage::Exit);
                return Ok(LoopOutcome::Exited);
            }

            let question = line.trim();
            if question.is_empty() {
                continue;
            }

            let answer = self.ask(question).await?;
            writeln!(output, "Assistant's response: {answer}")?;
            output.flush()?;

            self.speak(&answer).await?;
        }
    }
}

fn enter(stage: Stage) {
    tracing::debug!(%stage, "stage");
}
