//! Bot module for handling Telegram interactions
//!
//! - `message_handler`: turns incoming messages into conversation inputs and sends replies
//! - `ui_builder`: formats conversation replies as chat text

pub mod message_handler;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use message_handler::{message_handler, BotContext};

// Re-export utility functions that might be used elsewhere
pub use message_handler::{conversation_key, parse_input, submitter_name};
pub use ui_builder::format_reply;
