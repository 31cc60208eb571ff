//! Render instructions and message formatting
//!
//! The engine never touches the transport; it returns a list of `Reply`
//! values that the dispatcher plays back against the transport.

use crate::engine::event::CallbackAction;
use crate::gateway::report::{OpKind, Report, ReportMode};
use crate::gateway::{Submission, SubmissionStatus};
use crate::i18n::{text, Language, Msg};
use crate::text::{passage, Locator, Passage, PASSAGES};
use crate::transport::{Button, Keyboard, MessageRef};
use std::fmt::Write as _;

pub const PASSAGES_PER_PAGE: usize = 10;
pub const HISTORY_PER_PAGE: usize = 5;
/// Word-by-word output is truncated beyond this many operations.
pub const MAX_OPS_SHOWN: usize = 20;

/// One instruction for the dispatcher to execute against the transport.
#[derive(Debug, Clone)]
pub enum Reply {
    Send {
        text: String,
        keyboard: Option<Keyboard>,
    },
    Edit {
        target: MessageRef,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Answer {
        callback_id: String,
        alert: Option<String>,
    },
}

impl Reply {
    pub fn send(text: impl Into<String>) -> Self {
        Reply::Send {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn send_with(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Reply::Send {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    pub fn edit(target: MessageRef, text: impl Into<String>, keyboard: Option<Keyboard>) -> Self {
        Reply::Edit {
            target,
            text: text.into(),
            keyboard,
        }
    }

    pub fn ack(callback_id: impl Into<String>) -> Self {
        Reply::Answer {
            callback_id: callback_id.into(),
            alert: None,
        }
    }

    pub fn alert(callback_id: impl Into<String>, text: impl Into<String>) -> Self {
        Reply::Answer {
            callback_id: callback_id.into(),
            alert: Some(text.into()),
        }
    }
}

fn button(label: impl Into<String>, action: CallbackAction) -> Button {
    Button::new(label, action.payload())
}

// ============================================================================
// Keyboards
// ============================================================================

pub fn mode_keyboard(lang: Language) -> Keyboard {
    Keyboard::new()
        .row(vec![button(text(lang, Msg::ModeAutoBtn), CallbackAction::NewAuto)])
        .row(vec![button(
            text(lang, Msg::ModeManualBtn),
            CallbackAction::ManualMode,
        )])
        .row(vec![button(
            text(lang, Msg::HistoryBtn),
            CallbackAction::HistoryList,
        )])
}

pub fn language_keyboard() -> Keyboard {
    Keyboard::new().row(vec![
        button("🇬🇧 English", CallbackAction::Lang(Language::En)),
        button("🇸🇦 العربية", CallbackAction::Lang(Language::Ar)),
        button("🇷🇺 Русский", CallbackAction::Lang(Language::Ru)),
    ])
}

pub fn cancel_auto_keyboard(lang: Language) -> Keyboard {
    Keyboard::new().row(vec![button(
        text(lang, Msg::CancelBtn),
        CallbackAction::CancelAuto,
    )])
}

/// Paginated passage picker, two passages per row.
pub fn passage_keyboard(lang: Language, page: usize) -> Keyboard {
    let total_pages = PASSAGES.len().div_ceil(PASSAGES_PER_PAGE);
    let page = page.min(total_pages - 1);
    let start = page * PASSAGES_PER_PAGE;
    let slice = &PASSAGES[start..(start + PASSAGES_PER_PAGE).min(PASSAGES.len())];

    let mut keyboard = Keyboard::new();
    for pair in slice.chunks(2) {
        keyboard = keyboard.row(
            pair.iter()
                .map(|p| {
                    button(
                        format!("{}. {}", p.number, p.name),
                        CallbackAction::Passage(p.number),
                    )
                })
                .collect(),
        );
    }

    keyboard.row(pager_row(lang, page, total_pages, CallbackAction::PassagePage))
}

fn pager_row(
    lang: Language,
    page: usize,
    total_pages: usize,
    to_action: fn(usize) -> CallbackAction,
) -> Vec<Button> {
    let mut row = Vec::new();
    if page > 0 {
        row.push(button(text(lang, Msg::PrevBtn), to_action(page - 1)));
    }
    row.push(button(
        format!("{}/{}", page + 1, total_pages),
        CallbackAction::Noop,
    ));
    if page + 1 < total_pages {
        row.push(button(text(lang, Msg::NextBtn), to_action(page + 1)));
    }
    row
}

/// Telephone-style keypad for verse entry.
pub fn verse_keypad(lang: Language) -> Keyboard {
    let digit = |d: u8| button(d.to_string(), CallbackAction::Digit(d));
    Keyboard::new()
        .row(vec![digit(1), digit(2), digit(3)])
        .row(vec![digit(4), digit(5), digit(6)])
        .row(vec![digit(7), digit(8), digit(9)])
        .row(vec![
            button(text(lang, Msg::BackBtn), CallbackAction::Backspace),
            digit(0),
            button(text(lang, Msg::ConfirmBtn), CallbackAction::Confirm),
        ])
}

/// Follow-up options after a successful submission.
pub fn after_submit_keyboard(lang: Language, submission_id: &str, auto: bool) -> Keyboard {
    let check = button(
        text(lang, Msg::CheckStatusBtn),
        CallbackAction::Check(submission_id.to_string()),
    );
    if auto {
        Keyboard::new().row(vec![check]).row(vec![
            button(text(lang, Msg::NewAutoBtn), CallbackAction::NewAuto),
            button(text(lang, Msg::ModeManualBtn), CallbackAction::NewRecording),
        ])
    } else {
        Keyboard::new().row(vec![
            check,
            button(text(lang, Msg::NewRecordingBtn), CallbackAction::NewRecording),
        ])
    }
}

/// Refresh / navigation under a rendered submission.
pub fn submission_keyboard(lang: Language, submission_id: &str) -> Keyboard {
    Keyboard::new()
        .row(vec![button(
            text(lang, Msg::RefreshBtn),
            CallbackAction::Check(submission_id.to_string()),
        )])
        .row(vec![
            button(text(lang, Msg::NewRecordingBtn), CallbackAction::NewRecording),
            button(text(lang, Msg::BackBtn), CallbackAction::HistoryList),
        ])
}

// ============================================================================
// Text formatting
// ============================================================================

pub fn passage_title(p: &Passage) -> String {
    format!("{}. {}", p.number, p.name)
}

/// Human label for a six-digit locator: "Yusuf 12:42" when it decodes to a
/// catalog entry, the raw string otherwise.
pub fn locator_label(locator: &str) -> String {
    let loc = Locator::parse(locator);
    match passage(loc.passage) {
        Some(p) if loc.is_valid() => format!("{} {}:{}", p.name, loc.passage, loc.verse),
        _ => locator.to_string(),
    }
}

/// Keypad prompt: passage header, entered digits, optional inline error.
pub fn verse_prompt(lang: Language, passage_number: u16, buffer: &str, invalid: bool) -> String {
    let mut out = String::new();
    if let Some(p) = passage(passage_number) {
        let _ = writeln!(out, "📖 {} ({})", passage_title(p), p.verses);
    }
    out.push_str(text(lang, Msg::EnterVerse));
    if !buffer.is_empty() {
        let _ = write!(out, "\n\n📝 {buffer}");
    }
    if invalid {
        let _ = write!(out, "\n\n⚠️ {}", text(lang, Msg::ErrInvalidVerse));
    }
    out
}

pub fn status_emoji(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::Queued | SubmissionStatus::Processing => "⏳",
        SubmissionStatus::Done => "✅",
        SubmissionStatus::Failed => "❌",
    }
}

fn status_word(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::Queued => "queued",
        SubmissionStatus::Processing => "processing",
        SubmissionStatus::Done => "done",
        SubmissionStatus::Failed => "failed",
    }
}

fn op_marker(kind: OpKind) -> &'static str {
    match kind {
        OpKind::Correct => "✅",
        OpKind::Substitution => "🔄",
        OpKind::Deletion => "❌",
        OpKind::Insertion => "➕",
        OpKind::Other => "❓",
    }
}

/// Full submission card: header, then whatever the report contains.
pub fn format_submission(lang: Language, sub: &Submission) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🆔 {}", sub.id);
    if !sub.locator.is_empty() {
        let _ = writeln!(
            out,
            "📖 {}: {}",
            text(lang, Msg::VerseLabel),
            locator_label(&sub.locator)
        );
    }
    if let Some(created) = sub.created_at {
        let _ = writeln!(
            out,
            "📅 {}: {}",
            text(lang, Msg::CreatedLabel),
            created.format("%Y-%m-%d %H:%M")
        );
    }
    let _ = writeln!(
        out,
        "{} {}: {}",
        status_emoji(sub.status),
        text(lang, Msg::StatusLabel),
        status_word(sub.status)
    );

    match &sub.report {
        Some(report) if !report.is_pending() => {
            out.push('\n');
            format_report(lang, report, &mut out);
        }
        _ if sub.status.in_flight() => {
            let _ = write!(out, "\n{}", text(lang, Msg::Processing));
        }
        _ => {}
    }
    out
}

fn format_report(lang: Language, report: &Report, out: &mut String) {
    let _ = writeln!(out, "📊 {}", text(lang, Msg::ResultTitle));

    if let Some(error) = &report.error {
        let _ = writeln!(out, "❌ {error}");
        if let Some(suggestion) = &report.suggestion {
            let _ = writeln!(out, "💡 {}: {suggestion}", text(lang, Msg::Suggestion));
        }
        return;
    }

    if report.mode == ReportMode::AutoDetect {
        if report.match_status == "no_match" {
            let _ = writeln!(out, "{}", text(lang, Msg::NoMatch));
        }
        if let Some(confidence) = &report.confidence {
            let _ = writeln!(out, "🎯 {}: {confidence}", text(lang, Msg::Confidence));
        }
        if let Some(range) = &report.detected_range {
            let _ = writeln!(
                out,
                "📖 {}: {} – {} ({})",
                text(lang, Msg::DetectedRange),
                range.start,
                range.end,
                range.total
            );
        }
    }

    if let Some(rate) = report.headline_error_rate() {
        let _ = writeln!(out, "📉 {}: {:.1}%", text(lang, Msg::ErrorRate), rate * 100.0);
    }
    if let Some(overall) = &report.overall {
        let _ = writeln!(
            out,
            "🎓 {}: {:.1}%",
            text(lang, Msg::Accuracy),
            overall.accuracy * 100.0
        );
    }

    if let Some(verses) = &report.per_verse {
        for verse in verses {
            let _ = writeln!(
                out,
                "\n📖 {} — {:.1}%",
                locator_label(&verse.locator),
                verse.error_rate * 100.0
            );
            for error in &verse.errors {
                let marker = match error.kind.as_str() {
                    "substitution" => "🔄",
                    "deletion" => "❌",
                    "insertion" => "➕",
                    _ => "❓",
                };
                let _ = writeln!(out, "{marker} {} → {}", error.reference, error.hypothesis);
            }
        }
    }

    if let Some(ops) = &report.operations {
        if !ops.is_empty() {
            let _ = writeln!(out, "\n{}:", text(lang, Msg::Analysis));
            for op in ops.iter().take(MAX_OPS_SHOWN) {
                let _ = writeln!(out, "{} {}", op_marker(op.kind()), op.reference);
            }
            if ops.len() > MAX_OPS_SHOWN {
                let _ = writeln!(
                    out,
                    "... ({} {})",
                    ops.len() - MAX_OPS_SHOWN,
                    text(lang, Msg::MoreWords)
                );
            }
        }
    }

    if let Some(transcript) = report.transcript.as_ref().or(report.hypothesis.as_ref()) {
        if !transcript.is_empty() {
            let _ = write!(out, "\n{}:\n{}", text(lang, Msg::Transcript), transcript);
        }
    }
}

/// Paginated history list: text plus per-item view buttons.
pub fn format_history(
    lang: Language,
    submissions: &[Submission],
    page: usize,
) -> (String, Keyboard) {
    let total_pages = submissions.len().div_ceil(HISTORY_PER_PAGE).max(1);
    let page = page.min(total_pages - 1);
    let start = page * HISTORY_PER_PAGE;
    let slice = &submissions[start.min(submissions.len())
        ..(start + HISTORY_PER_PAGE).min(submissions.len())];

    let mut out = String::new();
    let _ = writeln!(out, "{}", text(lang, Msg::HistoryTitle));
    let _ = writeln!(out, "{}: {}", text(lang, Msg::HistoryTotal), submissions.len());

    let mut keyboard = Keyboard::new();
    for sub in slice {
        let target = if sub.locator.is_empty() {
            "🎤".to_string()
        } else {
            locator_label(&sub.locator)
        };
        let when = sub
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        keyboard = keyboard.row(vec![button(
            format!("{} {} {}", status_emoji(sub.status), target, when),
            CallbackAction::View(sub.id.clone()),
        )]);
    }

    if total_pages > 1 {
        keyboard = keyboard.row(pager_row(lang, page, total_pages, CallbackAction::HistoryPage));
    }
    keyboard = keyboard.row(vec![button(
        text(lang, Msg::NewRecordingBtn),
        CallbackAction::NewRecording,
    )]);

    (out, keyboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::report::{normalize, RawReport};

    fn submission(status: SubmissionStatus, report: Option<Report>) -> Submission {
        Submission {
            id: "rec-1".to_string(),
            user: "u1".to_string(),
            locator: "001003".to_string(),
            status,
            report,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn passage_keyboard_pages_are_bounded() {
        let first = passage_keyboard(Language::En, 0);
        // Five passage rows of two, plus the pager row.
        assert_eq!(first.rows.len(), 6);
        assert_eq!(first.rows[0][0].payload, "passage:1");

        let beyond = passage_keyboard(Language::En, 999);
        let last_page = PASSAGES.len().div_ceil(PASSAGES_PER_PAGE) - 1;
        let expected_start = last_page * PASSAGES_PER_PAGE + 1;
        assert_eq!(
            beyond.rows[0][0].payload,
            format!("passage:{expected_start}")
        );
    }

    #[test]
    fn keypad_has_all_digits_and_controls() {
        let keypad = verse_keypad(Language::En);
        let payloads: Vec<_> = keypad
            .rows
            .iter()
            .flatten()
            .map(|b| b.payload.as_str())
            .collect();
        for d in 0..=9 {
            assert!(payloads.contains(&format!("digit:{d}").as_str()));
        }
        assert!(payloads.contains(&"back"));
        assert!(payloads.contains(&"go"));
    }

    #[test]
    fn locator_labels_decode_or_pass_through() {
        assert_eq!(locator_label("012042"), "Yusuf 12:42");
        assert_eq!(locator_label("001003"), "Al-Fatihah 1:3");
        // Malformed or out-of-range locators are shown verbatim.
        assert_eq!(locator_label("garbage"), "garbage");
        assert_eq!(locator_label("999001"), "999001");
        assert_eq!(locator_label("001999"), "001999");
    }

    #[test]
    fn verse_prompt_shows_buffer_and_error() {
        let prompt = verse_prompt(Language::En, 12, "42", true);
        assert!(prompt.contains("Yusuf"));
        assert!(prompt.contains("📝 42"));
        assert!(prompt.contains("⚠️"));

        let clean = verse_prompt(Language::En, 12, "", false);
        assert!(!clean.contains("📝"));
        assert!(!clean.contains("⚠️"));
    }

    #[test]
    fn pending_submission_renders_processing_line() {
        let sub = submission(SubmissionStatus::Processing, None);
        let card = format_submission(Language::En, &sub);
        assert!(card.contains("processing"));
        assert!(card.contains(text(Language::En, Msg::Processing)));
    }

    #[test]
    fn legacy_report_renders_ops_with_truncation() {
        let ops: Vec<_> = (0..25)
            .map(|i| {
                serde_json::json!({"ref_ar": format!("w{i}"), "hyp_ar": "", "op": "C", "t_start": 0.0, "t_end": 0.1})
            })
            .collect();
        let raw: RawReport =
            serde_json::from_value(serde_json::json!({"wer": 0.12, "ops": ops})).unwrap();
        let sub = submission(SubmissionStatus::Done, Some(normalize(&raw)));

        let card = format_submission(Language::En, &sub);
        assert!(card.contains("12.0%"));
        assert!(card.contains("w19"));
        assert!(!card.contains("w20"));
        assert!(card.contains("5 more words"));
    }

    #[test]
    fn history_pagination_and_buttons() {
        let subs: Vec<_> = (0..7)
            .map(|i| Submission {
                id: format!("rec-{i}"),
                ..submission(SubmissionStatus::Done, None)
            })
            .collect();

        let (text0, kb0) = format_history(Language::En, &subs, 0);
        assert!(text0.contains("7"));
        // Five items + pager + new-recording rows.
        assert_eq!(kb0.rows.len(), 7);
        assert_eq!(kb0.rows[0][0].payload, "view:rec-0");

        let (_, kb1) = format_history(Language::En, &subs, 1);
        assert_eq!(kb1.rows[0][0].payload, "view:rec-5");

        let (_, kb_empty) = format_history(Language::En, &[], 0);
        assert_eq!(kb_empty.rows.len(), 1);
    }
}
