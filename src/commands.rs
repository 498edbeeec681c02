pub const HELP_TEXT: &str = "Telebot - Simple Telegram Bot\nCommands:\n/help - Show help\n/learn <phrase> - Teach bot a phrase\n/start - Start bot";
pub const START_TEXT: &str = "Bot started!";
pub const STOP_TEXT: &str = "Bot stopped";
pub const LEARNED_TEXT: &str = "Phrase learned!";

/// A recognized slash command. Anything that does not start with `/` is not
/// a command at all and goes to the similarity matcher instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Start,
    /// Acknowledged with a fixed reply; does not actually stop the loop.
    Stop,
    Learn(String),
    /// Unrecognized command, or `/learn` with nothing to learn. Silent.
    Unknown,
}

impl Command {
    /// Parses a message as a command. The command token is the first
    /// whitespace-delimited word, matched case-insensitively.
    pub fn parse(text: &str) -> Option<Command> {
        if !text.starts_with('/') {
            return None;
        }

        let mut parts = text.splitn(2, ' ');
        let token = parts.next().unwrap_or_default().to_lowercase();
        let rest = parts.next().unwrap_or_default().trim();

        Some(match token.as_str() {
            "/help" => Command::Help,
            "/start" => Command::Start,
            "/stop" => Command::Stop,
            "/learn" if !rest.is_empty() => Command::Learn(rest.to_string()),
            _ => Command::Unknown,
        })
    }

    /// The fixed reply for commands that have one.
    pub fn reply(&self) -> Option<&'static str> {
        match self {
            Command::Help => Some(HELP_TEXT),
            Command::Start => Some(START_TEXT),
            Command::Stop => Some(STOP_TEXT),
            Command::Learn(_) => Some(LEARNED_TEXT),
            Command::Unknown => None,
        }
    }
}
