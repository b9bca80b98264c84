//! Decides whether a message is addressed to the bot.

use std::sync::LazyLock;

use regex::Regex;

/// Prefix of direct-message channel IDs.
pub const DIRECT_MESSAGE_PREFIX: char = 'D';

/// Any user mention token, e.g. `<@U12345>`.
static MENTION_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<@[A-Z0-9_]+>").expect("mention token pattern is valid"));

/// The exact mention token for a user.
pub fn mention_token(user_id: &str) -> String {
    format!("<@{user_id}>")
}

/// Returns true iff `text` contains the exact mention token for `bot_user_id`.
///
/// The closing `>` is part of the token, so `<@U123456>` does not mention `U12345`.
pub fn is_mentioned(bot_user_id: &str, text: &str) -> bool {
    !bot_user_id.is_empty() && text.contains(&mention_token(bot_user_id))
}

/// Direct conversations address the bot implicitly.
pub fn is_direct_message(channel_id: &str) -> bool {
    channel_id.starts_with(DIRECT_MESSAGE_PREFIX)
}

pub fn is_addressed(bot_user_id: &str, channel_id: &str, text: &str) -> bool {
    is_mentioned(bot_user_id, text) || is_direct_message(channel_id)
}

/// Remove every mention token and surrounding whitespace, leaving the prompt for the agent.
pub fn strip_mentions(text: &str) -> String {
    MENTION_TOKEN.replace_all(text, "").trim().to_string()
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_mentioned() {
        let cases = [
            ("<@U12345> hello", true),
            ("Hey <@U12345> how are you?", true),
            ("What do you think <@U12345>", true),
            ("Hello world", false),
            ("<@U98765> hello", false),
            ("<@U123456> hello", false),
            ("U12345 hello", false),
            ("<@U1234> hello", false),
        ];

        for (text, expected) in cases {
            assert_eq!(is_mentioned("U12345", text), expected, "text: {text}");
        }
    }

    #[test]
    fn test_empty_bot_id_never_matches() {
        assert!(!is_mentioned("", "<@> hello"));
    }

    #[test]
    fn test_direct_message_channels() {
        assert!(is_direct_message("D024BE91L"));
        assert!(!is_direct_message("C024BE91L"));
        assert!(!is_direct_message("G024BE91L"));
        assert!(!is_direct_message(""));
    }

    #[test]
    fn test_is_addressed() {
        assert!(is_addressed("BOT", "C1", "<@BOT> hi"));
        assert!(is_addressed("BOT", "D1", "hi"));
        assert!(!is_addressed("BOT", "C1", "hi"));
    }

    #[test]
    fn test_strip_mentions() {
        assert_eq!(strip_mentions("<@U12345> what is Rust?"), "what is Rust?");
        assert_eq!(strip_mentions("ask <@U_BOT_USER> and <@UMG0E05JR> now"), "ask  and  now");
        assert_eq!(strip_mentions("  <@U12345>  "), "");
        assert_eq!(strip_mentions("<@lower> stays"), "<@lower> stays");
    }
}
