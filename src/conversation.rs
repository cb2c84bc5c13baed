//! The takings conversation as an explicit state machine.
//!
//! [`transition`] is the pure transition table: given the current state and
//! one input it decides what should happen. [`ConversationMachine`] applies
//! that decision to the [`SessionStore`] and, on the last step, hands the
//! finished record to the [`RecordSink`].

use std::sync::Arc;

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::session::{ActiveConversation, ConversationKey, Field, SessionStore};
use crate::sink::RecordSink;
use crate::validation::is_number;

/// Where a conversation currently stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConversationState {
    AwaitingCash,
    AwaitingCard,
    AwaitingUber,
    AwaitingDeliveroo,
    AwaitingApp,
    #[default]
    Terminated,
}

impl ConversationState {
    /// The amount this state is waiting for.
    pub fn field(self) -> Option<Field> {
        match self {
            ConversationState::AwaitingCash => Some(Field::Cash),
            ConversationState::AwaitingCard => Some(Field::Card),
            ConversationState::AwaitingUber => Some(Field::Uber),
            ConversationState::AwaitingDeliveroo => Some(Field::Deliveroo),
            ConversationState::AwaitingApp => Some(Field::App),
            ConversationState::Terminated => None,
        }
    }

    /// State reached after a valid amount.
    pub fn next(self) -> ConversationState {
        match self {
            ConversationState::AwaitingCash => ConversationState::AwaitingCard,
            ConversationState::AwaitingCard => ConversationState::AwaitingUber,
            ConversationState::AwaitingUber => ConversationState::AwaitingDeliveroo,
            ConversationState::AwaitingDeliveroo => ConversationState::AwaitingApp,
            ConversationState::AwaitingApp | ConversationState::Terminated => {
                ConversationState::Terminated
            }
        }
    }

    pub fn is_terminated(self) -> bool {
        self == ConversationState::Terminated
    }
}

/// One inbound event for a conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Start,
    Cancel,
    Text(&'a str),
}

/// Decision taken by the transition table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Reset the session and wait for Cash
    Begin,
    /// Store `value` under `field` and move to `next`
    Advance {
        field: Field,
        value: String,
        next: ConversationState,
    },
    /// Store the final amount, build the record and write it
    Submit { field: Field, value: String },
    /// Input was not a number; state and session stay as they are
    Reject(Field),
    /// Clear the session without writing anything
    Abort,
    /// Nothing to do
    Ignore,
}

/// Computes the transition for `input` in `state`.
pub fn transition(state: ConversationState, input: Input<'_>) -> Transition {
    match (state, input) {
        (_, Input::Start) => Transition::Begin,
        (ConversationState::Terminated, _) => Transition::Ignore,
        (_, Input::Cancel) => Transition::Abort,
        (state, Input::Text(text)) => {
            let Some(field) = state.field() else {
                return Transition::Ignore;
            };
            if !is_number(text) {
                return Transition::Reject(field);
            }
            match state.next() {
                ConversationState::Terminated => Transition::Submit {
                    field,
                    value: text.to_string(),
                },
                next => Transition::Advance {
                    field,
                    value: text.to_string(),
                    next,
                },
            }
        }
    }
}

/// What the user should be told after an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Ask for the given amount
    Prompt(Field),
    /// The given amount was not a number
    Invalid(Field),
    Saved,
    SaveFailed,
    Cancelled,
}

/// Drives conversations against a session store and a record sink.
pub struct ConversationMachine {
    sessions: SessionStore,
    sink: Arc<dyn RecordSink>,
}

impl ConversationMachine {
    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self {
            sessions: SessionStore::new(),
            sink,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Processes one input and returns the reply to send, if any.
    ///
    /// `submitter` is only read when the input completes the conversation.
    /// The sink write is awaited inline; the session is already removed from
    /// the store by then, so success and failure leave the same empty state.
    pub async fn handle(
        &self,
        key: ConversationKey,
        input: Input<'_>,
        submitter: &str,
    ) -> Option<Reply> {
        let mut conversations = self.sessions.lock().await;
        let state = conversations
            .get(&key)
            .map(|conversation| conversation.state)
            .unwrap_or_default();

        match transition(state, input) {
            Transition::Begin => {
                if conversations.insert(key, ActiveConversation::default()).is_some() {
                    debug!(chat_id = key.chat_id, ?state, "Discarding unfinished session on restart");
                }
                info!(chat_id = key.chat_id, "Conversation started");
                Some(Reply::Prompt(Field::Cash))
            }
            Transition::Reject(field) => {
                warn!(chat_id = key.chat_id, field = %field, "Rejected non-numeric amount");
                Some(Reply::Invalid(field))
            }
            Transition::Advance { field, value, next } => {
                let conversation = conversations.get_mut(&key)?;
                conversation.session.set(field, value);
                conversation.state = next;
                debug!(chat_id = key.chat_id, field = %field, state = ?next, "Amount recorded");
                next.field().map(Reply::Prompt)
            }
            Transition::Submit { field, value } => {
                let mut conversation = conversations.remove(&key)?;
                drop(conversations);

                conversation.session.set(field, value);
                let timestamp = Local::now().naive_local();
                let Some(record) = conversation.session.into_record(timestamp, submitter) else {
                    error!(chat_id = key.chat_id, "Session incomplete at final step");
                    return Some(Reply::SaveFailed);
                };

                debug!(chat_id = key.chat_id, row = ?record.to_row(), "Writing submission");
                match self.sink.append(&record).await {
                    Ok(()) => {
                        info!(chat_id = key.chat_id, "Submission saved");
                        Some(Reply::Saved)
                    }
                    Err(e) => {
                        error!(chat_id = key.chat_id, error = %e, "Failed to save submission");
                        Some(Reply::SaveFailed)
                    }
                }
            }
            Transition::Abort => {
                conversations.remove(&key);
                info!(chat_id = key.chat_id, ?state, "Conversation cancelled");
                Some(Reply::Cancelled)
            }
            Transition::Ignore => {
                debug!(chat_id = key.chat_id, "Ignoring input outside a conversation");
                None
            }
        }
    }
}
