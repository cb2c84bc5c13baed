//! Session data for the takings conversation.
//!
//! A [`Session`] collects the five raw amounts of one conversation, and the
//! [`SessionStore`] keeps one in-progress conversation per [`ConversationKey`].
//! A completed session becomes a [`SubmissionRecord`], the immutable row that
//! is handed to the record sink.

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use tokio::sync::{Mutex, MutexGuard};

use crate::conversation::ConversationState;

/// Timestamp layout of the first column of every appended row.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The five amounts collected by the conversation, in entry order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Cash,
    Card,
    Uber,
    Deliveroo,
    App,
}

impl Field {
    pub const ALL: [Field; 5] = [Field::Cash, Field::Card, Field::Uber, Field::Deliveroo, Field::App];

    /// Label shown to users and used as the column meaning.
    pub fn label(self) -> &'static str {
        match self {
            Field::Cash => "Cash",
            Field::Card => "Card",
            Field::Uber => "Uber",
            Field::Deliveroo => "Deliveroo",
            Field::App => "App",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifies one conversation: a sender inside a chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub chat_id: i64,
    pub user_id: Option<u64>,
}

impl ConversationKey {
    pub fn new(chat_id: i64, user_id: Option<u64>) -> Self {
        Self { chat_id, user_id }
    }
}

/// Raw amounts entered so far, exactly as the user typed them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub cash: Option<String>,
    pub card: Option<String>,
    pub uber: Option<String>,
    pub deliveroo: Option<String>,
    pub app: Option<String>,
}

impl Session {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|field| self.get(*field).is_none())
    }

    pub fn is_complete(&self) -> bool {
        Field::ALL.iter().all(|field| self.get(*field).is_some())
    }

    /// Builds the submission row, or `None` while any amount is missing.
    pub fn into_record(
        self,
        timestamp: NaiveDateTime,
        submitter_display_name: impl Into<String>,
    ) -> Option<SubmissionRecord> {
        Some(SubmissionRecord {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            submitter_display_name: submitter_display_name.into(),
            cash: self.cash?,
            card: self.card?,
            uber: self.uber?,
            deliveroo: self.deliveroo?,
            app: self.app?,
        })
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Cash => &self.cash,
            Field::Card => &self.card,
            Field::Uber => &self.uber,
            Field::Deliveroo => &self.deliveroo,
            Field::App => &self.app,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Cash => &mut self.cash,
            Field::Card => &mut self.card,
            Field::Uber => &mut self.uber,
            Field::Deliveroo => &mut self.deliveroo,
            Field::App => &mut self.app,
        }
    }
}

/// One finished entry, ready to be appended as a spreadsheet row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub timestamp: NaiveDateTime,
    pub submitter_display_name: String,
    pub cash: String,
    pub card: String,
    pub uber: String,
    pub deliveroo: String,
    pub app: String,
}

impl SubmissionRecord {
    /// Row values in column order: timestamp, submitter, then the five amounts.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.submitter_display_name.clone(),
            self.cash.clone(),
            self.card.clone(),
            self.uber.clone(),
            self.deliveroo.clone(),
            self.app.clone(),
        ]
    }
}

/// A conversation that has been started and not yet terminated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveConversation {
    pub state: ConversationState,
    pub session: Session,
}

impl Default for ActiveConversation {
    fn default() -> Self {
        Self {
            state: ConversationState::AwaitingCash,
            session: Session::default(),
        }
    }
}

/// In-progress conversations keyed by chat and sender.
///
/// A missing entry means the conversation is terminated. Entries are removed
/// on submission and on cancellation only; a conversation that is started and
/// then abandoned stays in memory until the process exits.
#[derive(Debug, Default)]
pub struct SessionStore {
    conversations: Mutex<HashMap<ConversationKey, ActiveConversation>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, HashMap<ConversationKey, ActiveConversation>> {
        self.conversations.lock().await
    }

    /// Current state for `key`; `Terminated` when nothing is in progress.
    pub async fn state(&self, key: &ConversationKey) -> ConversationState {
        self.lock()
            .await
            .get(key)
            .map(|conversation| conversation.state)
            .unwrap_or(ConversationState::Terminated)
    }

    /// Snapshot of the amounts collected so far for `key`.
    pub async fn session(&self, key: &ConversationKey) -> Option<Session> {
        self.lock()
            .await
            .get(key)
            .map(|conversation| conversation.session.clone())
    }

    pub async fn active_count(&self) -> usize {
        self.lock().await.len()
    }
}
