//! Command routing: inbound text to bot command.

/// Label of the reply-keyboard button that requests a report.
pub const REPORT_BUTTON: &str = "Generate report";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Welcome message and reply keyboard.
    Start,
    /// Screenshot, model report, photo reply.
    Report,
}

#[derive(Debug, Clone)]
enum Pattern {
    /// Slash command; matches `/name` and `/name@botname`, arguments ignored.
    Command(&'static str),
    /// Exact text, ignoring surrounding whitespace (reply-keyboard buttons).
    Text(&'static str),
}

impl Pattern {
    fn matches(&self, text: &str) -> bool {
        let text = text.trim();
        match self {
            Pattern::Command(name) => text
                .split_whitespace()
                .next()
                .and_then(|word| word.strip_prefix('/'))
                .map(|word| word.split('@').next().unwrap_or(word))
                .is_some_and(|cmd| cmd == *name),
            Pattern::Text(label) => text == *label,
        }
    }
}

/// Ordered routing table, built once per worker. First match wins.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    routes: Vec<(Pattern, BotCommand)>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            routes: vec![
                (Pattern::Command("start"), BotCommand::Start),
                (Pattern::Text(REPORT_BUTTON), BotCommand::Report),
                (Pattern::Command("report"), BotCommand::Report),
            ],
        }
    }

    pub fn route(&self, text: &str) -> Option<BotCommand> {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.matches(text))
            .map(|(_, command)| *command)
    }
}
