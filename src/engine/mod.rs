//! Conversation engine
//!
//! Owns the per-user state machine. Every entry point re-reads the session
//! from the store, evaluates the event against the current state, mutates
//! session attributes, calls the analysis gateway when a transition demands
//! it, and returns render instructions for the dispatcher to play back.
//!
//! Guard failures never change state; they only change what is rendered.
//! Store failures abort the transition and bubble up as `EngineError::Store`.
//! Gateway failures are rendered to the user and leave state untouched so
//! the submission can be retried.

pub mod event;
pub mod render;
pub mod state;
#[cfg(test)]
pub mod testing;

pub use state::{ChatState, Session};

use crate::gateway::{AnalysisGateway, GatewayErrorKind};
use crate::i18n::{text, Language, Msg};
use crate::store::{SessionStore, StoreError};
use crate::text::{passage_count, verse_count, Locator};
use crate::transport::MessageRef;
use event::{CallbackAction, Command};
use render::Reply;
use state::keys;
use thiserror::Error;

/// How many history entries one listing fetches.
const HISTORY_FETCH_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Engine<S, G> {
    store: S,
    gateway: G,
    default_language: Language,
}

impl<S: SessionStore, G: AnalysisGateway> Engine<S, G> {
    pub fn new(store: S, gateway: G, default_language: Language) -> Self {
        Self {
            store,
            gateway,
            default_language,
        }
    }

    /// Resolve the user's interface language; any store trouble degrades to
    /// the default rather than blocking the event.
    pub async fn language(&self, user: &str) -> Language {
        match self.store.get_attr(user, keys::LANGUAGE).await {
            Ok(Some(tag)) => Language::from_tag(&tag).unwrap_or(self.default_language),
            Ok(None) => self.default_language,
            Err(error) => {
                tracing::warn!(%user, %error, "language lookup failed, using default");
                self.default_language
            }
        }
    }

    /// Back to passage selection, dropping everything except the language.
    async fn reset(&self, user: &str) -> Result<(), EngineError> {
        self.store.delete_attr(user, keys::PASSAGE).await?;
        self.store.delete_attr(user, keys::VERSE).await?;
        self.store.delete_attr(user, keys::VERSE_INPUT).await?;
        self.store.set_state(user, ChatState::SelectPassage).await?;
        Ok(())
    }

    async fn enter_auto(&self, user: &str) -> Result<(), EngineError> {
        self.store
            .set_state(user, ChatState::AwaitAutoSample)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Entry points, one per event kind
    // ========================================================================

    pub async fn command(
        &self,
        user: &str,
        lang: Language,
        command: Command,
    ) -> Result<Vec<Reply>, EngineError> {
        match command {
            Command::Start => {
                self.reset(user).await?;
                Ok(vec![Reply::send_with(
                    text(lang, Msg::Welcome),
                    render::mode_keyboard(lang),
                )])
            }
            Command::New => {
                self.reset(user).await?;
                Ok(vec![Reply::send_with(
                    text(lang, Msg::SelectPassage),
                    render::passage_keyboard(lang, 0),
                )])
            }
            Command::Auto => {
                self.enter_auto(user).await?;
                Ok(vec![Reply::send_with(
                    text(lang, Msg::AutoIntro),
                    render::cancel_auto_keyboard(lang),
                )])
            }
            Command::History => match self.fetch_history(user, lang, 0).await {
                Some((body, keyboard)) => Ok(vec![Reply::send_with(body, keyboard)]),
                None => Ok(vec![Reply::send(text(lang, Msg::ErrGeneric))]),
            },
            Command::Language => Ok(vec![Reply::send_with(
                text(lang, Msg::LanguagePrompt),
                render::language_keyboard(),
            )]),
            Command::Help => Ok(vec![Reply::send(text(lang, Msg::Help))]),
        }
    }

    pub async fn free_text(
        &self,
        user: &str,
        lang: Language,
        input: &str,
    ) -> Result<Vec<Reply>, EngineError> {
        let session = Session::load(&self.store, user, lang).await?;

        match (session.state, session.passage) {
            (ChatState::EnterVerse, Some(passage)) => {
                match input.trim().parse::<u16>() {
                    Ok(n) if n >= 1 && n <= verse_count(passage) => {
                        self.commit_verse(user, n).await?;
                        Ok(vec![Reply::send(text(lang, Msg::SendSample))])
                    }
                    _ => Ok(vec![Reply::send(text(lang, Msg::ErrInvalidVerse))]),
                }
            }
            _ => Ok(vec![Reply::send(text(lang, Msg::Help))]),
        }
    }

    pub async fn media(
        &self,
        user: &str,
        lang: Language,
        media: Vec<u8>,
    ) -> Result<Vec<Reply>, EngineError> {
        let session = Session::load(&self.store, user, lang).await?;

        match session.state {
            ChatState::AwaitSample => {
                let (Some(passage), Some(verse)) = (session.passage, session.verse) else {
                    // Selection attrs expired out from under the state.
                    return Ok(vec![Reply::send(text(lang, Msg::ErrUnexpectedSample))]);
                };
                let locator = Locator::new(passage, verse);

                match self.gateway.submit_fixed(user, locator, media).await {
                    Ok(submission) => {
                        self.store
                            .set_state(user, ChatState::SelectPassage)
                            .await?;
                        Ok(submitted_replies(lang, &submission.id, false))
                    }
                    Err(error) => {
                        tracing::warn!(%user, %locator, %error, "fixed submission failed");
                        Ok(vec![Reply::send(text(lang, Msg::ErrSubmitFailed))])
                    }
                }
            }
            ChatState::AwaitAutoSample => {
                match self.gateway.submit_auto(user, media, None, None).await {
                    Ok(submission) => {
                        self.store.set_state(user, ChatState::Start).await?;
                        Ok(submitted_replies(lang, &submission.id, true))
                    }
                    Err(error) => {
                        tracing::warn!(%user, %error, "auto submission failed");
                        Ok(vec![Reply::send(text(lang, Msg::ErrSubmitFailed))])
                    }
                }
            }
            _ => Ok(vec![Reply::send(text(lang, Msg::ErrUnexpectedSample))]),
        }
    }

    pub async fn callback(
        &self,
        user: &str,
        lang: Language,
        callback_id: &str,
        target: MessageRef,
        action: CallbackAction,
    ) -> Result<Vec<Reply>, EngineError> {
        let mut replies = self
            .run_callback(user, lang, callback_id, target, action)
            .await?;
        // Every button press gets exactly one answer; branches that did not
        // produce an alert get a silent acknowledgement.
        if !replies
            .iter()
            .any(|r| matches!(r, Reply::Answer { .. }))
        {
            replies.insert(0, Reply::ack(callback_id));
        }
        Ok(replies)
    }

    async fn run_callback(
        &self,
        user: &str,
        lang: Language,
        callback_id: &str,
        target: MessageRef,
        action: CallbackAction,
    ) -> Result<Vec<Reply>, EngineError> {
        match action {
            CallbackAction::Passage(number) => {
                if number < 1 || number > passage_count() {
                    return Ok(vec![Reply::alert(callback_id, text(lang, Msg::ErrGeneric))]);
                }
                self.store
                    .set_attr(user, keys::PASSAGE, &number.to_string())
                    .await?;
                self.store.delete_attr(user, keys::VERSE_INPUT).await?;
                self.store.set_state(user, ChatState::EnterVerse).await?;
                Ok(vec![Reply::edit(
                    target,
                    render::verse_prompt(lang, number, "", false),
                    Some(render::verse_keypad(lang)),
                )])
            }

            CallbackAction::PassagePage(page) => Ok(vec![Reply::edit(
                target,
                text(lang, Msg::SelectPassage),
                Some(render::passage_keyboard(lang, page)),
            )]),

            CallbackAction::Digit(digit) => {
                let mut session = Session::load(&self.store, user, lang).await?;
                let Some(passage) = stale_keypad_guard(&session) else {
                    return Ok(vec![Reply::ack(callback_id)]);
                };
                if !session.push_digit(digit) {
                    // Buffer already full; nothing to re-render.
                    return Ok(vec![Reply::ack(callback_id)]);
                }
                self.store
                    .set_attr(user, keys::VERSE_INPUT, &session.digit_buffer)
                    .await?;
                Ok(vec![Reply::edit(
                    target,
                    render::verse_prompt(lang, passage, &session.digit_buffer, false),
                    Some(render::verse_keypad(lang)),
                )])
            }

            CallbackAction::Backspace => {
                let mut session = Session::load(&self.store, user, lang).await?;
                let Some(passage) = stale_keypad_guard(&session) else {
                    return Ok(vec![Reply::ack(callback_id)]);
                };
                if !session.pop_digit() {
                    return Ok(vec![Reply::ack(callback_id)]);
                }
                if session.digit_buffer.is_empty() {
                    self.store.delete_attr(user, keys::VERSE_INPUT).await?;
                } else {
                    self.store
                        .set_attr(user, keys::VERSE_INPUT, &session.digit_buffer)
                        .await?;
                }
                Ok(vec![Reply::edit(
                    target,
                    render::verse_prompt(lang, passage, &session.digit_buffer, false),
                    Some(render::verse_keypad(lang)),
                )])
            }

            CallbackAction::Confirm => {
                let session = Session::load(&self.store, user, lang).await?;
                let Some(passage) = stale_keypad_guard(&session) else {
                    return Ok(vec![Reply::ack(callback_id)]);
                };
                match session.buffered_verse() {
                    Some(n) if n <= verse_count(passage) => {
                        self.commit_verse(user, n).await?;
                        Ok(vec![Reply::edit(target, text(lang, Msg::SendSample), None)])
                    }
                    _ => Ok(vec![Reply::edit(
                        target,
                        render::verse_prompt(lang, passage, &session.digit_buffer, true),
                        Some(render::verse_keypad(lang)),
                    )]),
                }
            }

            CallbackAction::Lang(new_lang) => {
                self.store
                    .set_attr(user, keys::LANGUAGE, new_lang.tag())
                    .await?;
                self.reset(user).await?;
                Ok(vec![
                    Reply::edit(target, text(new_lang, Msg::LanguageChanged), None),
                    Reply::send_with(
                        text(new_lang, Msg::SelectPassage),
                        render::passage_keyboard(new_lang, 0),
                    ),
                ])
            }

            CallbackAction::Check(id) | CallbackAction::View(id) => {
                match self.gateway.get(user, &id).await {
                    Ok(submission) => Ok(vec![Reply::edit(
                        target,
                        render::format_submission(lang, &submission),
                        Some(render::submission_keyboard(lang, &id)),
                    )]),
                    Err(error) if error.kind == GatewayErrorKind::NotFound => {
                        Ok(vec![Reply::edit(target, text(lang, Msg::ErrNotFound), None)])
                    }
                    Err(error) => {
                        tracing::warn!(%user, submission = %id, %error, "submission fetch failed");
                        Ok(vec![Reply::alert(callback_id, text(lang, Msg::ErrGeneric))])
                    }
                }
            }

            CallbackAction::HistoryList => self.history_edit(user, lang, callback_id, target, 0).await,
            CallbackAction::HistoryPage(page) => {
                self.history_edit(user, lang, callback_id, target, page).await
            }

            CallbackAction::NewRecording | CallbackAction::ManualMode => {
                self.reset(user).await?;
                Ok(vec![Reply::edit(
                    target,
                    text(lang, Msg::SelectPassage),
                    Some(render::passage_keyboard(lang, 0)),
                )])
            }

            CallbackAction::NewAuto => {
                self.enter_auto(user).await?;
                Ok(vec![Reply::edit(
                    target,
                    text(lang, Msg::AutoIntro),
                    Some(render::cancel_auto_keyboard(lang)),
                )])
            }

            CallbackAction::CancelAuto => {
                self.store.set_state(user, ChatState::Start).await?;
                Ok(vec![Reply::edit(target, text(lang, Msg::AutoCancelled), None)])
            }

            CallbackAction::Noop => Ok(vec![]),
        }
    }

    // ========================================================================
    // Shared transition pieces
    // ========================================================================

    /// The single validation point for verse entry: store the verse, clear
    /// the keypad buffer, and move on to waiting for the sample.
    async fn commit_verse(&self, user: &str, verse: u16) -> Result<(), EngineError> {
        self.store
            .set_attr(user, keys::VERSE, &verse.to_string())
            .await?;
        self.store.delete_attr(user, keys::VERSE_INPUT).await?;
        self.store.set_state(user, ChatState::AwaitSample).await?;
        Ok(())
    }

    async fn fetch_history(
        &self,
        user: &str,
        lang: Language,
        page: usize,
    ) -> Option<(String, crate::transport::Keyboard)> {
        match self.gateway.list(user, HISTORY_FETCH_LIMIT).await {
            Ok(submissions) if submissions.is_empty() => {
                Some((text(lang, Msg::HistoryEmpty).to_string(), render::mode_keyboard(lang)))
            }
            Ok(submissions) => Some(render::format_history(lang, &submissions, page)),
            Err(error) => {
                tracing::warn!(%user, %error, "history fetch failed");
                None
            }
        }
    }

    async fn history_edit(
        &self,
        user: &str,
        lang: Language,
        callback_id: &str,
        target: MessageRef,
        page: usize,
    ) -> Result<Vec<Reply>, EngineError> {
        match self.fetch_history(user, lang, page).await {
            Some((body, keyboard)) => Ok(vec![Reply::edit(target, body, Some(keyboard))]),
            None => Ok(vec![Reply::alert(callback_id, text(lang, Msg::ErrGeneric))]),
        }
    }
}

/// A keypad press only makes sense while a passage is selected and the
/// session is still in verse entry; anything else is a press on a stale
/// keyboard left in the chat history.
fn stale_keypad_guard(session: &Session) -> Option<u16> {
    match (session.state, session.passage) {
        (ChatState::EnterVerse, Some(passage)) => Some(passage),
        _ => None,
    }
}

fn submitted_replies(lang: Language, submission_id: &str, auto: bool) -> Vec<Reply> {
    vec![
        Reply::send(format!("{}\n🆔 {}", text(lang, Msg::Submitted), submission_id)),
        Reply::send_with(
            text(lang, Msg::WhatNext),
            render::after_submit_keyboard(lang, submission_id, auto),
        ),
    ]
}
