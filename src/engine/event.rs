//! Typed inbound events
//!
//! Button payloads arrive as `"<action>:<argument>"` strings. They are parsed
//! exactly once, here, into a tagged value; an unrecognized tag parses to
//! `None` and the dispatcher drops the event after silently answering the
//! callback.

use crate::i18n::Language;

/// The closed set of slash commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    New,
    Auto,
    History,
    Language,
    Help,
}

impl Command {
    /// Parse a message text as a command. Accepts the `/cmd@botname` form
    /// used in group chats; anything else is free text.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix('/')?;
        let name = rest
            .split_whitespace()
            .next()
            .unwrap_or("")
            .split('@')
            .next()
            .unwrap_or("");
        match name {
            "start" => Some(Command::Start),
            "new" => Some(Command::New),
            "auto" => Some(Command::Auto),
            "history" => Some(Command::History),
            "language" => Some(Command::Language),
            "help" => Some(Command::Help),
            _ => None,
        }
    }
}

/// A parsed button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Pick passage `n`
    Passage(u16),
    /// Flip the passage keyboard to a page
    PassagePage(usize),
    /// Keypad digit
    Digit(u8),
    /// Keypad backspace
    Backspace,
    /// Keypad confirm
    Confirm,
    /// Switch interface language
    Lang(Language),
    /// Re-fetch a submission's status
    Check(String),
    /// Open a submission from the history list
    View(String),
    /// Flip the history list to a page
    HistoryPage(usize),
    /// Back to the history list
    HistoryList,
    /// Start a fresh manual recording
    NewRecording,
    /// Start a fresh auto-detect recording
    NewAuto,
    /// Manual mode from the welcome screen
    ManualMode,
    /// Leave auto-detect mode
    CancelAuto,
    /// Inert button (page indicator)
    Noop,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        let (tag, arg) = match data.split_once(':') {
            Some((tag, arg)) => (tag, arg),
            None => (data, ""),
        };

        match tag {
            "passage" => arg.parse().ok().map(CallbackAction::Passage),
            "ppage" => arg.parse().ok().map(CallbackAction::PassagePage),
            "digit" => arg.parse().ok().filter(|d| *d <= 9).map(CallbackAction::Digit),
            "back" => Some(CallbackAction::Backspace),
            "go" => Some(CallbackAction::Confirm),
            "lang" => Language::from_tag(arg).map(CallbackAction::Lang),
            "check" if !arg.is_empty() => Some(CallbackAction::Check(arg.to_string())),
            "view" if !arg.is_empty() => Some(CallbackAction::View(arg.to_string())),
            "hpage" => arg.parse().ok().map(CallbackAction::HistoryPage),
            "history" => Some(CallbackAction::HistoryList),
            "new" => Some(CallbackAction::NewRecording),
            "auto" => Some(CallbackAction::NewAuto),
            "manual" => Some(CallbackAction::ManualMode),
            "cancel_auto" => Some(CallbackAction::CancelAuto),
            "noop" => Some(CallbackAction::Noop),
            _ => None,
        }
    }

    /// The wire payload this action round-trips through. Keyboard builders
    /// use this so labels and parse never drift apart.
    pub fn payload(&self) -> String {
        match self {
            CallbackAction::Passage(n) => format!("passage:{n}"),
            CallbackAction::PassagePage(p) => format!("ppage:{p}"),
            CallbackAction::Digit(d) => format!("digit:{d}"),
            CallbackAction::Backspace => "back".to_string(),
            CallbackAction::Confirm => "go".to_string(),
            CallbackAction::Lang(l) => format!("lang:{}", l.tag()),
            CallbackAction::Check(id) => format!("check:{id}"),
            CallbackAction::View(id) => format!("view:{id}"),
            CallbackAction::HistoryPage(p) => format!("hpage:{p}"),
            CallbackAction::HistoryList => "history".to_string(),
            CallbackAction::NewRecording => "new".to_string(),
            CallbackAction::NewAuto => "auto".to_string(),
            CallbackAction::ManualMode => "manual".to_string(),
            CallbackAction::CancelAuto => "cancel_auto".to_string(),
            CallbackAction::Noop => "noop".to_string(),
        }
    }
}
