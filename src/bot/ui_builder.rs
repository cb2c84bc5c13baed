//! UI Builder module for formatting conversation replies

// Import localization
use crate::localization::LocalizationManager;

// Import conversation types
use crate::conversation::Reply;

/// Render a conversation reply as the text sent back to the chat
pub fn format_reply(messages: &LocalizationManager, reply: Reply) -> String {
    match reply {
        Reply::Prompt(field) => {
            messages.get_message_with_args("prompt-amount", &[("field", field.label())])
        }
        Reply::Invalid(field) => {
            messages.get_message_with_args("invalid-amount", &[("field", field.label())])
        }
        Reply::Saved => messages.get_message("save-success", None),
        Reply::SaveFailed => messages.get_message("save-failed", None),
        Reply::Cancelled => messages.get_message("entry-cancelled", None),
    }
}
