//! Chat session state machine.
//!
//! A [`Session`] owns the transcript and drives the turn lifecycle:
//! accept user input, dispatch one streaming task, fold increments into
//! the in-progress reply, then flush the completed assistant message to
//! the transcript and the store. The session is either idle or has
//! exactly one turn in flight; the in-flight handle itself is the
//! streaming flag, so a second concurrent turn cannot be represented.
//!
//! All mutation happens on the owner's task. The streaming task
//! communicates only through its increment/error channels and never
//! touches session state.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;

use crate::providers::{Message, ProviderAdapter, ProviderError, Role, TurnStream};
use crate::store::{ConversationId, ConversationStore, StorageError};

/// One merged event from the in-flight turn.
#[derive(Debug)]
pub enum TurnEvent {
    /// Next text increment, in vendor emission order.
    Increment(String),
    /// The increment stream closed with no error: the reply is complete.
    Completed,
    /// The turn failed (vendor error, transport failure, or cancellation).
    Failed(ProviderError),
}

/// A per-turn failure recorded on the session.
///
/// Both variants are non-fatal: the session returns to idle and keeps
/// accepting input.
#[derive(Debug)]
pub enum TurnError {
    Stream(ProviderError),
    Storage(StorageError),
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::Stream(err) => write!(f, "{err}"),
            TurnError::Storage(err) => write!(f, "storage: {err}"),
        }
    }
}

/// Read-only view for the renderer, taken once per redraw.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub transcript: Vec<Message>,
    pub partial_reply: String,
    pub streaming: bool,
    pub last_error: Option<String>,
}

struct ActiveTurn {
    stream: TurnStream,
    cancel: CancellationToken,
}

/// Interactive chat session bound to one conversation.
pub struct Session {
    adapter: Arc<ProviderAdapter>,
    store: Arc<dyn ConversationStore>,
    conversation: ConversationId,
    transcript: Vec<Message>,
    partial_reply: String,
    last_error: Option<TurnError>,
    turn: Option<ActiveTurn>,
}

impl Session {
    pub fn new(
        adapter: Arc<ProviderAdapter>,
        store: Arc<dyn ConversationStore>,
        conversation: ConversationId,
    ) -> Self {
        Self {
            adapter,
            store,
            conversation,
            transcript: Vec::new(),
            partial_reply: String::new(),
            last_error: None,
            turn: None,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.turn.is_some()
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn last_error(&self) -> Option<&TurnError> {
        self.last_error.as_ref()
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation
    }

    /// Submits user input and starts a streaming turn.
    ///
    /// Returns false without any state change when a turn is already in
    /// flight or the trimmed input is empty. On acceptance the user
    /// message is appended to the transcript and written to the store
    /// before the streaming task is dispatched; a store failure is
    /// recorded in `last_error` but does not block the turn.
    pub fn submit_user_input(&mut self, text: &str) -> bool {
        if self.turn.is_some() {
            tracing::debug!("input rejected: turn already in flight");
            return false;
        }
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        self.transcript.push(Message::user(text));
        if let Err(err) = self
            .store
            .append_message(&self.conversation, Role::User, text)
        {
            tracing::warn!(error = %err, "failed to persist user message");
            self.last_error = Some(TurnError::Storage(err));
        }

        self.partial_reply.clear();
        let cancel = CancellationToken::new();
        let stream = Arc::clone(&self.adapter).stream(self.transcript.clone(), cancel.clone());
        self.turn = Some(ActiveTurn { stream, cancel });
        tracing::debug!(messages = self.transcript.len(), "turn dispatched");
        true
    }

    /// Non-blocking poll for the next turn event. `None` means idle or
    /// nothing pending yet; frame-driven callers poll this every tick.
    pub fn try_next_event(&mut self) -> Option<TurnEvent> {
        let turn = self.turn.as_mut()?;
        match turn.stream.increments.try_recv() {
            Ok(text) => Some(TurnEvent::Increment(text)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Self::terminal_event(turn)),
        }
    }

    /// Awaits the next turn event. Returns `None` when the session is
    /// idle.
    pub async fn next_event(&mut self) -> Option<TurnEvent> {
        let turn = self.turn.as_mut()?;
        match turn.stream.increments.recv().await {
            Some(text) => Some(TurnEvent::Increment(text)),
            None => Some(Self::terminal_event(turn)),
        }
    }

    /// The increments channel closed; the adapter contract guarantees the
    /// terminal error, if any, was sent before that close.
    fn terminal_event(turn: &mut ActiveTurn) -> TurnEvent {
        match turn.stream.error.try_recv() {
            Ok(err) => TurnEvent::Failed(err),
            Err(_) => TurnEvent::Completed,
        }
    }

    /// Applies one turn event to the session state.
    pub fn apply_event(&mut self, event: TurnEvent) {
        match event {
            TurnEvent::Increment(text) => {
                // Increments can only arrive from the in-flight turn.
                if self.turn.is_some() {
                    self.partial_reply.push_str(&text);
                }
            }
            TurnEvent::Completed => {
                let content = self.partial_reply.clone();
                tracing::debug!(chars = content.len(), "turn completed");
                self.transcript.push(Message::assistant(content.clone()));
                if let Err(err) =
                    self.store
                        .append_message(&self.conversation, Role::Assistant, &content)
                {
                    tracing::warn!(error = %err, "failed to persist assistant message");
                    self.last_error = Some(TurnError::Storage(err));
                }
                self.partial_reply.clear();
                self.turn = None;
            }
            TurnEvent::Failed(err) => {
                tracing::debug!(error = %err, "turn failed");
                self.last_error = Some(TurnError::Stream(err));
                self.partial_reply.clear();
                self.turn = None;
            }
        }
    }

    /// Raises the cancellation signal of the in-flight turn, if any. The
    /// turn then settles through the error transition.
    pub fn cancel(&self) {
        if let Some(turn) = &self.turn {
            turn.cancel.cancel();
        }
    }

    /// Awaits and applies events until the session is idle again.
    pub async fn pump_until_idle(&mut self) {
        while let Some(event) = self.next_event().await {
            self.apply_event(event);
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            transcript: self.transcript.clone(),
            partial_reply: self.partial_reply.clone(),
            streaming: self.turn.is_some(),
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }
}
