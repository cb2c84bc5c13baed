//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::User;
use tracing::debug;

// Import conversation types
use crate::conversation::{ConversationMachine, Input};
use crate::localization::LocalizationManager;
use crate::session::ConversationKey;

// Import UI builder functions
use super::ui_builder::format_reply;

/// Name recorded when a message carries no sender
pub const UNKNOWN_SUBMITTER: &str = "Unknown";

/// Shared state injected into every handler call
pub struct BotContext {
    pub machine: ConversationMachine,
    pub messages: LocalizationManager,
}

/// Map message text to a conversation input.
///
/// `/start` and `/cancel` (optionally addressed as `/start@bot_name` and with
/// trailing arguments) become commands, any other command is `None`, and
/// everything else is plain text.
pub fn parse_input(text: &str) -> Option<Input<'_>> {
    let Some(command) = text.trim_start().strip_prefix('/') else {
        return Some(Input::Text(text));
    };

    let name = command.split_whitespace().next().unwrap_or_default();
    let name = name.split('@').next().unwrap_or_default();

    match name.to_ascii_lowercase().as_str() {
        "start" => Some(Input::Start),
        "cancel" => Some(Input::Cancel),
        _ => None,
    }
}

/// Conversations are tracked per sender within a chat
pub fn conversation_key(chat_id: ChatId, user: Option<&User>) -> ConversationKey {
    ConversationKey::new(chat_id.0, user.map(|user| user.id.0))
}

pub fn submitter_name(user: Option<&User>) -> String {
    user.map(User::full_name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_SUBMITTER.to_string())
}

pub async fn message_handler(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> Result<()> {
    let Some(text) = msg.text() else {
        debug!(chat_id = %msg.chat.id, "Ignoring non-text message");
        return Ok(());
    };

    let Some(input) = parse_input(text) else {
        debug!(chat_id = %msg.chat.id, "Ignoring unrelated command");
        return Ok(());
    };

    let user = msg.from.as_ref();
    let key = conversation_key(msg.chat.id, user);
    let submitter = submitter_name(user);

    if let Some(reply) = ctx.machine.handle(key, input, &submitter).await {
        bot.send_message(msg.chat.id, format_reply(&ctx.messages, reply))
            .await?;
    }

    Ok(())
}
