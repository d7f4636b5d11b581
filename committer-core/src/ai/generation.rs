// message generation loop
//
// chunks are offered one at a time, each followed by a decision from the user.
// "try again" abandons the current pass and restarts at chunk 1 with the new
// instructions; `MAX_ATTEMPTS` passes without a decision end the loop.

use std::time::Duration;

use tracing::{debug, trace};

use super::api::CompletionProvider;
use super::invoker::invoke;
use super::prompts::{build_prompt, Refinement};
use crate::error::GenerationError;
use crate::ui::Interaction;

/// generation attempts before giving up
pub const MAX_ATTEMPTS: u32 = 5;

/// what the user can do with a candidate message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewChoice {
    Approve,
    TryAgain,
    WriteOwn,
    Exit,
}

impl ReviewChoice {
    pub const ALL: [ReviewChoice; 4] = [
        ReviewChoice::Approve,
        ReviewChoice::TryAgain,
        ReviewChoice::WriteOwn,
        ReviewChoice::Exit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReviewChoice::Approve => "approve",
            ReviewChoice::TryAgain => "try again",
            ReviewChoice::WriteOwn => "write it myself",
            ReviewChoice::Exit => "exit",
        }
    }
}

/// how the loop ended without an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// model output accepted as-is
    Approved(String),
    /// text typed by the user; empty when they aborted the editor
    WrittenByUser(String),
    Cancelled,
}

impl Outcome {
    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Approved(msg) | Outcome::WrittenByUser(msg) => Some(msg),
            Outcome::Cancelled => None,
        }
    }
}

/// one call to the model and what came back
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    /// 1-based
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub instructions: String,
    pub prompt: String,
    pub response: String,
}

enum State {
    Generating,
    Presenting(GenerationAttempt),
    Refining,
    Finished(Outcome),
}

/// position in the chunk sequence and the instructions in force
struct Cursor {
    attempt: u32,
    chunk: usize,
    instructions: String,
}

impl Cursor {
    /// start the next attempt from the first chunk
    fn restart(&mut self) -> Result<(), GenerationError> {
        self.chunk = 0;
        self.attempt += 1;
        if self.attempt >= MAX_ATTEMPTS {
            return Err(GenerationError::MaxAttemptsExceeded(MAX_ATTEMPTS));
        }
        Ok(())
    }
}

fn interaction_failed(e: std::io::Error) -> GenerationError {
    GenerationError::Interaction(e.to_string())
}

/// drives generate -> present -> refine until the user decides
pub struct MessageLoop<'a, U: Interaction + ?Sized> {
    provider: &'a dyn CompletionProvider,
    ui: &'a mut U,
    timeout: Duration,
    auto_approve: bool,
}

impl<'a, U: Interaction + ?Sized> MessageLoop<'a, U> {
    pub fn new(provider: &'a dyn CompletionProvider, ui: &'a mut U, timeout: Duration) -> Self {
        Self {
            provider,
            ui,
            timeout,
            auto_approve: false,
        }
    }

    /// accept the first candidate without asking
    pub fn auto_approve(mut self, yes: bool) -> Self {
        self.auto_approve = yes;
        self
    }

    pub async fn run(&mut self, stats: &str, chunks: &[String]) -> Result<Outcome, GenerationError> {
        let total_chunks = chunks.len().max(1);
        let mut cursor = Cursor {
            attempt: 0,
            chunk: 0,
            instructions: String::new(),
        };
        let mut state = State::Generating;

        loop {
            state = match state {
                State::Generating => {
                    let diff_chunk = chunks.get(cursor.chunk).map(String::as_str).unwrap_or("");
                    let attempt = self
                        .generate(stats, diff_chunk, &cursor, total_chunks)
                        .await?;
                    State::Presenting(attempt)
                }
                State::Presenting(attempt) => self.present(attempt)?,
                State::Refining => {
                    cursor.instructions = self.refine()?;
                    cursor.restart()?;
                    debug!(
                        attempt = cursor.attempt + 1,
                        chunk = cursor.chunk + 1,
                        "regenerating with new instructions"
                    );
                    State::Generating
                }
                State::Finished(outcome) => return Ok(outcome),
            };
        }
    }

    async fn generate(
        &mut self,
        stats: &str,
        diff_chunk: &str,
        cursor: &Cursor,
        total_chunks: usize,
    ) -> Result<GenerationAttempt, GenerationError> {
        let chunk_index = cursor.chunk + 1;
        let prompt = build_prompt(stats, diff_chunk, chunk_index, total_chunks, &cursor.instructions);
        debug!(
            attempt = cursor.attempt + 1,
            chunk = chunk_index,
            total_chunks,
            "generating commit message"
        );
        trace!(%prompt, "rendered prompt");

        let response = {
            let _spinner = self.ui.progress("generating commit message...");
            invoke(self.provider, &prompt, self.timeout).await?
        };

        Ok(GenerationAttempt {
            chunk_index,
            total_chunks,
            instructions: cursor.instructions.clone(),
            prompt,
            response,
        })
    }

    fn present(&mut self, attempt: GenerationAttempt) -> Result<State, GenerationError> {
        let title = if attempt.total_chunks > 1 {
            format!(
                "✅ generated commit message (chunk {} of {}):",
                attempt.chunk_index, attempt.total_chunks
            )
        } else {
            "✅ generated commit message:".to_string()
        };
        self.ui.present(&title, &attempt.response);

        if self.auto_approve {
            return Ok(State::Finished(Outcome::Approved(attempt.response)));
        }

        let labels: Vec<&str> = ReviewChoice::ALL.iter().map(|c| c.label()).collect();
        let index = self
            .ui
            .select("what would you like to do?", &labels, 0)
            .map_err(interaction_failed)?;
        let choice = ReviewChoice::ALL.get(index).copied().ok_or_else(|| {
            GenerationError::Interaction(format!("no review choice at index {index}"))
        })?;

        Ok(match choice {
            ReviewChoice::Approve => State::Finished(Outcome::Approved(attempt.response)),
            ReviewChoice::WriteOwn => {
                let written = self
                    .ui
                    .compose("write your commit message")
                    .map_err(interaction_failed)?;
                let message = match written {
                    Some(text) if !text.trim().is_empty() => format!("{}\n", text.trim_end()),
                    _ => String::new(),
                };
                State::Finished(Outcome::WrittenByUser(message))
            }
            ReviewChoice::Exit => State::Finished(Outcome::Cancelled),
            ReviewChoice::TryAgain => State::Refining,
        })
    }

    /// ask how the next candidate should differ and return the new instructions
    fn refine(&mut self) -> Result<String, GenerationError> {
        let labels: Vec<&str> = Refinement::ALL.iter().map(|r| r.label()).collect();
        let index = self
            .ui
            .select("how should the message change?", &labels, 0)
            .map_err(interaction_failed)?;
        let refinement = Refinement::ALL.get(index).copied().ok_or_else(|| {
            GenerationError::Interaction(format!("no refinement at index {index}"))
        })?;

        match refinement.instructions() {
            Some(text) => Ok(text.to_string()),
            None => self
                .ui
                .input("describe what should change")
                .map_err(interaction_failed),
        }
    }
}
