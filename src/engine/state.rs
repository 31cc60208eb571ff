//! Conversation states and the per-user session record

use crate::i18n::Language;
use crate::store::{SessionStore, StoreResult};

/// Maximum digits in the verse keypad buffer.
pub const MAX_VERSE_DIGITS: usize = 3;

/// Position in the conversation flow.
///
/// Digit entry is not a family of states: it mutates `Session::digit_buffer`
/// under the stable `EnterVerse` state and is validated once on confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    /// Nothing selected yet
    #[default]
    Start,
    /// Waiting for a passage pick
    SelectPassage,
    /// Passage picked, keypad is collecting a verse number
    EnterVerse,
    /// Verse picked, waiting for a voice sample
    AwaitSample,
    /// Auto-detect mode, waiting for a voice sample
    AwaitAutoSample,
}

impl ChatState {
    pub fn encode(self) -> &'static str {
        match self {
            ChatState::Start => "start",
            ChatState::SelectPassage => "select_passage",
            ChatState::EnterVerse => "enter_verse",
            ChatState::AwaitSample => "await_sample",
            ChatState::AwaitAutoSample => "await_auto_sample",
        }
    }

    /// Unknown stored values decode to the initial state; a lost or mangled
    /// entry resets the conversation instead of wedging it.
    pub fn decode(s: &str) -> Self {
        match s {
            "select_passage" => ChatState::SelectPassage,
            "enter_verse" => ChatState::EnterVerse,
            "await_sample" => ChatState::AwaitSample,
            "await_auto_sample" => ChatState::AwaitAutoSample,
            _ => ChatState::Start,
        }
    }
}

/// Session attribute keys in the store.
pub mod keys {
    pub const LANGUAGE: &str = "language";
    pub const PASSAGE: &str = "passage";
    pub const VERSE: &str = "verse";
    pub const VERSE_INPUT: &str = "verse_input";
}

/// The structured view of one user's session.
///
/// Attributes live as loose key/value entries in the store, each expiring
/// independently; this record is rebuilt from them on every event so that
/// transition logic never touches raw strings and a partially expired
/// session degrades to "unset" fields rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state: ChatState,
    pub language: Language,
    pub passage: Option<u16>,
    pub verse: Option<u16>,
    pub digit_buffer: String,
}

impl Session {
    pub async fn load<S: SessionStore>(
        store: &S,
        user: &str,
        fallback: Language,
    ) -> StoreResult<Self> {
        let state = store.get_state(user).await?;
        let language = store
            .get_attr(user, keys::LANGUAGE)
            .await?
            .and_then(|tag| Language::from_tag(&tag))
            .unwrap_or(fallback);
        let passage = store
            .get_attr(user, keys::PASSAGE)
            .await?
            .and_then(|v| v.parse().ok());
        let verse = store
            .get_attr(user, keys::VERSE)
            .await?
            .and_then(|v| v.parse().ok());
        let digit_buffer = store
            .get_attr(user, keys::VERSE_INPUT)
            .await?
            .unwrap_or_default();

        Ok(Self {
            state,
            language,
            passage,
            verse,
            digit_buffer,
        })
    }

    /// Append a keypad digit; full buffers ignore further input.
    pub fn push_digit(&mut self, digit: u8) -> bool {
        if digit > 9 || self.digit_buffer.len() >= MAX_VERSE_DIGITS {
            return false;
        }
        self.digit_buffer.push((b'0' + digit) as char);
        true
    }

    /// Drop the last keypad digit.
    pub fn pop_digit(&mut self) -> bool {
        self.digit_buffer.pop().is_some()
    }

    /// The buffered verse number, if the buffer holds one.
    pub fn buffered_verse(&self) -> Option<u16> {
        if self.digit_buffer.is_empty() {
            return None;
        }
        self.digit_buffer.parse().ok().filter(|&n| n >= 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codec_roundtrip() {
        for state in [
            ChatState::Start,
            ChatState::SelectPassage,
            ChatState::EnterVerse,
            ChatState::AwaitSample,
            ChatState::AwaitAutoSample,
        ] {
            assert_eq!(ChatState::decode(state.encode()), state);
        }
        assert_eq!(ChatState::decode("whatever"), ChatState::Start);
        assert_eq!(ChatState::decode(""), ChatState::Start);
    }

    fn session() -> Session {
        Session {
            state: ChatState::EnterVerse,
            language: Language::En,
            passage: Some(2),
            verse: None,
            digit_buffer: String::new(),
        }
    }

    #[test]
    fn digit_buffer_is_bounded() {
        let mut s = session();
        assert!(s.push_digit(2));
        assert!(s.push_digit(8));
        assert!(s.push_digit(6));
        assert!(!s.push_digit(1));
        assert_eq!(s.digit_buffer, "286");
        assert_eq!(s.buffered_verse(), Some(286));
    }

    #[test]
    fn backspace_and_empty_buffer() {
        let mut s = session();
        assert!(!s.pop_digit());
        s.push_digit(4);
        s.push_digit(2);
        assert!(s.pop_digit());
        assert_eq!(s.digit_buffer, "4");
        assert_eq!(s.buffered_verse(), Some(4));
        s.pop_digit();
        assert_eq!(s.buffered_verse(), None);
    }

    #[test]
    fn zero_buffer_is_not_a_verse() {
        let mut s = session();
        s.push_digit(0);
        assert_eq!(s.digit_buffer, "0");
        assert_eq!(s.buffered_verse(), None);
        s.push_digit(0);
        s.push_digit(7);
        // "007" parses to 7, a plausible keypad entry
        assert_eq!(s.buffered_verse(), Some(7));
    }
}
