//! Engine session: lifecycle and messaging for the background search context.
//!
//! The context is created lazily on first need. If it cannot be created the
//! session is Disabled for good and every search runs synchronously on the
//! caller's thread instead, returning its result through the same
//! [`SearchCompletion`] path as an asynchronous answer.
//!
//! Every search request is tagged with a generation. The context answers
//! requests in order, one answer each, so inbound moves are matched against
//! the front of the outstanding queue. Only an answer whose generation is
//! still current is surfaced; anything else is stale and dropped.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::SearchBudget;
use crate::domain::protocol::{WorkerCommand, WorkerOutput};
use crate::domain::search::Searcher;

use super::worker::{BackgroundContext, BackgroundSpawner, WorkerEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No context yet; one is created on next need
    Uninitialized,
    Active,
    /// Context creation failed; searches run synchronously
    Disabled,
}

/// A search answer that is still current
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchCompletion {
    pub generation: u64,
    /// Chosen move in coordinate text
    pub move_text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchRequest {
    /// Sent to the context; the answer arrives through [`EngineSession::poll`]
    Pending(u64),
    /// Answered synchronously
    Completed(SearchCompletion),
    /// Answered synchronously: the side to move has no moves
    NoMove,
}

pub struct EngineSession {
    state: SessionState,
    spawner: Box<dyn BackgroundSpawner>,
    context: Option<BackgroundContext>,
    budget: SearchBudget,
    generation: u64,
    /// Generations of requests sent and not yet answered, oldest first
    outstanding: VecDeque<u64>,
    /// Last position sent to the context, while still known to be its position
    synced_fen: Option<String>,
    fallback: Arc<dyn Searcher>,
}

impl EngineSession {
    pub fn new(
        spawner: Box<dyn BackgroundSpawner>,
        budget: SearchBudget,
        fallback: Arc<dyn Searcher>,
    ) -> Self {
        Self {
            state: SessionState::Uninitialized,
            spawner,
            context: None,
            budget,
            generation: 0,
            outstanding: VecDeque::new(),
            synced_fen: None,
            fallback,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn budget(&self) -> SearchBudget {
        self.budget
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether an asynchronous answer is still expected
    pub fn is_searching(&self) -> bool {
        !self.outstanding.is_empty()
    }

    pub fn set_budget(&mut self, budget: SearchBudget) {
        self.budget = budget;
    }

    /// Create the context if there is none, and sync it to `fen`
    pub fn ensure_active(&mut self, fen: &str) -> SessionState {
        if self.state == SessionState::Uninitialized {
            match self.spawner.spawn() {
                Ok(context) => {
                    info!("background search context started");
                    self.context = Some(context);
                    self.state = SessionState::Active;
                }
                Err(e) => {
                    warn!(error = %e, "background search unavailable, searching synchronously");
                    self.state = SessionState::Disabled;
                }
            }
        }
        if self.state == SessionState::Active && self.synced_fen.as_deref() != Some(fen) {
            self.send(WorkerCommand::Position(fen.to_string()));
            if self.state == SessionState::Active {
                self.synced_fen = Some(fen.to_string());
            }
        }
        self.state
    }

    /// Ask for a move in `fen`
    pub fn request_search(&mut self, fen: &str) -> SearchRequest {
        self.generation += 1;
        let generation = self.generation;

        if self.ensure_active(fen) == SessionState::Active {
            self.send(WorkerCommand::Search(self.budget));
        }
        // a failed send stops the context; nothing would answer
        if self.state == SessionState::Active {
            self.outstanding.push_back(generation);
            // the context plays its own answer, so its position moves on
            self.synced_fen = None;
            debug!(generation, budget = ?self.budget, "search requested");
            return SearchRequest::Pending(generation);
        }

        match self.fallback.search(fen, self.budget) {
            Some(move_text) => {
                debug!(generation, %move_text, "synchronous search finished");
                SearchRequest::Completed(SearchCompletion {
                    generation,
                    move_text,
                })
            }
            None => SearchRequest::NoMove,
        }
    }

    /// Tell the context about a move played in `fen_before`
    pub fn sync_move(&mut self, fen_before: &str, move_text: &str) {
        if self.ensure_active(fen_before) == SessionState::Active {
            self.send(WorkerCommand::Move(move_text.to_string()));
            self.synced_fen = None;
        }
    }

    /// Handle everything the context has sent since the last poll
    pub fn poll(&mut self) -> Vec<SearchCompletion> {
        let events = match &self.context {
            Some(context) => context.drain(),
            None => return Vec::new(),
        };

        let mut completed = Vec::new();
        for event in events {
            match event {
                WorkerEvent::Output(line) => match WorkerOutput::parse(&line) {
                    WorkerOutput::BestMove(move_text) => {
                        if let Some(done) = self.accept(move_text) {
                            completed.push(done);
                        }
                    }
                    WorkerOutput::Console(text) => info!(target: "engine", "{text}"),
                    WorkerOutput::Pv(_) => {}
                    WorkerOutput::Message(text) => {
                        info!(message = %text, "engine stopped analysis");
                        self.stop_context();
                        break;
                    }
                },
                WorkerEvent::Exited => {
                    info!("background search context exited");
                    self.stop_context();
                    break;
                }
                WorkerEvent::Error(e) => warn!(error = %e, "background search context error"),
            }
        }
        completed
    }

    fn accept(&mut self, move_text: String) -> Option<SearchCompletion> {
        let Some(generation) = self.outstanding.pop_front() else {
            debug!(%move_text, "unrequested move from context, ignoring");
            return None;
        };
        if generation != self.generation {
            debug!(generation, current = self.generation, %move_text, "discarding stale search result");
            return None;
        }
        Some(SearchCompletion {
            generation,
            move_text,
        })
    }

    /// Drop the context and every outstanding request. In-flight answers are lost.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.stop_context();
    }

    fn stop_context(&mut self) {
        if let Some(context) = self.context.take() {
            context.terminate();
        }
        self.outstanding.clear();
        self.synced_fen = None;
        if self.state == SessionState::Active {
            self.state = SessionState::Uninitialized;
        }
    }

    fn send(&mut self, command: WorkerCommand) {
        let delivered = self
            .context
            .as_ref()
            .is_some_and(|context| context.send(command.to_wire()));
        if !delivered {
            warn!(?command, "background search context is gone");
            self.stop_context();
        }
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.cancel();
    }
}
