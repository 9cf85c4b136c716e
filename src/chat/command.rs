//! Classification of client text into chat messages and quote commands.

/// Prefix that marks a line as a stock quote request.
pub const COMMAND_SIGIL: &str = "/stock";

/// Result of classifying a line of client text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Ordinary chat message, unchanged.
    Message(String),
    /// Quote command with the captured symbol.
    Command(String),
}

/// Classify a line of text.
///
/// Only `/stock=<symbol>` with a symbol of one or more ASCII letters,
/// digits or dots and nothing else on the line is a command. Everything
/// else, including near misses, is returned verbatim as a message.
pub fn classify(text: &str) -> ChatInput {
    match text
        .strip_prefix(COMMAND_SIGIL)
        .and_then(|rest| rest.strip_prefix('='))
    {
        Some(symbol) if is_symbol(symbol) => ChatInput::Command(symbol.to_string()),
        _ => ChatInput::Message(text.to_string()),
    }
}

fn is_symbol(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(symbol: &str) -> ChatInput {
        ChatInput::Command(symbol.to_string())
    }

    fn message(text: &str) -> ChatInput {
        ChatInput::Message(text.to_string())
    }

    #[test]
    fn test_parse_regular_message() {
        assert_eq!(classify("Hello, world!"), message("Hello, world!"));
    }

    #[test]
    fn test_parse_stock_command() {
        assert_eq!(classify("/stock=AAPL"), command("AAPL"));
        assert_eq!(classify("/stock=aapl.us"), command("aapl.us"));
        assert_eq!(classify("/stock=3"), command("3"));
        assert_eq!(classify("/stock=..."), command("..."));
    }

    #[test]
    fn test_symbol_case_preserved() {
        assert_eq!(classify("/stock=AaPl.Us"), command("AaPl.Us"));
    }

    #[test]
    fn test_near_misses_are_messages() {
        let near_misses = [
            "/stock=",
            "/stock",
            "/stockAAPL",
            "/stock AAPL",
            "/stock= AAPL",
            "/stock =AAPL",
            " /stock=AAPL",
            "/stock=AAPL ",
            "/stock=AAPL now",
            "/stock=AA PL",
            "/stock=AAPL\n",
            "/stock=AAPL-US",
            "/stock=ÄPPL",
            "/STOCK=AAPL",
            "please /stock=AAPL",
            "",
        ];

        for text in near_misses {
            assert_eq!(classify(text), message(text), "input: {text:?}");
        }
    }
}
