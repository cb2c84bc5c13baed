//! # Localization Tests
//!
//! Message retrieval and formatting for the bundled English messages.

use takings_bot::localization::LocalizationManager;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();

        let message = manager.get_message("entry-cancelled", None);
        assert_eq!(message, "Entry cancelled.");
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message("nonexistent-key", None);
        assert!(message.starts_with("Missing translation:"));
    }

    #[test]
    fn test_get_message_with_args_has_no_isolation_marks() {
        let manager = setup_localization();

        let message = manager.get_message_with_args("prompt-amount", &[("field", "Deliveroo")]);
        assert_eq!(message, "Enter Deliveroo amount:");
        assert!(!message.contains('\u{2068}'));
    }

    #[test]
    fn test_get_message_missing_args() {
        let manager = setup_localization();

        // Missing arguments are reported inline rather than panicking
        let message = manager.get_message("invalid-amount", None);
        assert!(!message.is_empty());
        assert!(message.starts_with("❌ Please enter a valid number for"));
    }
}
