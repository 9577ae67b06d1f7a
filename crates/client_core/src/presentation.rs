//! Chat-style rendering of the flow. One component, parameterized by an
//! injected `Locale` and `Theme`.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{ComparisonResult, ImageSlot},
    error::{SubmissionError, ValidationIssue},
};

use crate::flow::FlowState;

/// Every user-facing string. Templates use `{number}`, `{name}`, `{reason}`
/// and `{detail}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locale {
    pub header_title: String,
    pub header_subtitle: String,
    pub welcome: String,
    pub second_image_prompt: String,
    pub select_first_image: String,
    pub select_second_image: String,
    pub image_label: String,
    pub change_image: String,
    pub loading: String,
    pub result_title: String,
    pub similarity_label: String,
    pub distance_label: String,
    pub threshold_label: String,
    pub model_label: String,
    pub status_label: String,
    pub verified: String,
    pub not_verified: String,
    pub start_comparison: String,
    pub new_comparison: String,
    pub error_title: String,
    pub missing_images: String,
    pub already_submitting: String,
    pub missing_uri: String,
    pub image_unreadable: String,
    pub empty_response: String,
    pub entity_too_large: String,
    pub request_too_large: String,
    pub server_unavailable: String,
    pub malformed_response: String,
    pub transport_error: String,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            header_title: "🤖 Face Recognition".into(),
            header_subtitle: "Advanced AI Technology".into(),
            welcome: "🚀 Welcome! I'll help you compare two faces using advanced AI technology. Let's start with the first image.".into(),
            second_image_prompt: "🎉 Great! Now select the second image to proceed with the comparison.".into(),
            select_first_image: "📸 Select First Image".into(),
            select_second_image: "📸 Select Second Image".into(),
            image_label: "📸 Image {number}".into(),
            change_image: "🔄 Change Image".into(),
            loading: "🔍 Analyzing with AI...".into(),
            result_title: "Comparison Result".into(),
            similarity_label: "Similarity:".into(),
            distance_label: "Distance:".into(),
            threshold_label: "Threshold:".into(),
            model_label: "Model:".into(),
            status_label: "Verification Status".into(),
            verified: "Verified".into(),
            not_verified: "Not Verified".into(),
            start_comparison: "🚀 Start Comparison".into(),
            new_comparison: "🔄 New Comparison".into(),
            error_title: "Error".into(),
            missing_images: ValidationIssue::MissingImages.to_string(),
            already_submitting: ValidationIssue::AlreadySubmitting.to_string(),
            missing_uri: ValidationIssue::MissingUri.to_string(),
            image_unreadable: "Could not read image {name}: {reason}".into(),
            empty_response: SubmissionError::EmptyResponse.to_string(),
            entity_too_large: SubmissionError::PayloadTooLarge { exact_marker: true }.to_string(),
            request_too_large: SubmissionError::PayloadTooLarge {
                exact_marker: false,
            }
            .to_string(),
            server_unavailable: SubmissionError::ServerUnavailable.to_string(),
            malformed_response: SubmissionError::MalformedResponse.to_string(),
            transport_error: "An error occurred while processing the request: {detail}".into(),
        }
    }
}

impl Locale {
    /// Parses a TOML string table; keys left out keep their English default.
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).context("invalid locale definition")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read locale file '{}'", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("failed to load locale file '{}'", path.display()))
    }

    pub fn image_label(&self, slot: ImageSlot) -> String {
        self.image_label
            .replace("{number}", &slot.number().to_string())
    }

    pub fn select_prompt(&self, slot: ImageSlot) -> &str {
        match slot {
            ImageSlot::First => &self.select_first_image,
            ImageSlot::Second => &self.select_second_image,
        }
    }

    /// The single notification shown for a failure.
    pub fn message_for(&self, err: &SubmissionError) -> String {
        match err {
            SubmissionError::Validation(ValidationIssue::MissingImages) => {
                self.missing_images.clone()
            }
            SubmissionError::Validation(ValidationIssue::AlreadySubmitting) => {
                self.already_submitting.clone()
            }
            SubmissionError::Validation(ValidationIssue::MissingUri) => self.missing_uri.clone(),
            SubmissionError::ImageUnreadable { name, reason } => self
                .image_unreadable
                .replace("{name}", name)
                .replace("{reason}", reason),
            SubmissionError::EmptyResponse => self.empty_response.clone(),
            SubmissionError::PayloadTooLarge { exact_marker: true } => {
                self.entity_too_large.clone()
            }
            SubmissionError::PayloadTooLarge {
                exact_marker: false,
            } => self.request_too_large.clone(),
            SubmissionError::ServerUnavailable => self.server_unavailable.clone(),
            SubmissionError::MalformedResponse => self.malformed_response.clone(),
            // Server-supplied text is shown as is.
            SubmissionError::ServerError(message) => message.clone(),
            SubmissionError::Transport(detail) => {
                self.transport_error.replace("{detail}", detail)
            }
        }
    }
}

/// Visual tokens. Colours are ANSI SGR codes, applied only when `color` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub color: bool,
    pub verified_glyph: String,
    pub rejected_glyph: String,
    pub accent: String,
    pub success: String,
    pub failure: String,
    pub muted: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            color: true,
            verified_glyph: "✓".into(),
            rejected_glyph: "✗".into(),
            accent: "35".into(),
            success: "32".into(),
            failure: "31".into(),
            muted: "90".into(),
        }
    }
}

impl Theme {
    pub fn plain() -> Self {
        Self {
            color: false,
            ..Self::default()
        }
    }

    pub fn paint(&self, code: &str, text: &str) -> String {
        if self.color && !code.is_empty() {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn verdict_glyph(&self, verified: bool) -> String {
        if verified {
            self.paint(&self.success, &self.verified_glyph)
        } else {
            self.paint(&self.failure, &self.rejected_glyph)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAuthor {
    Bot,
    User,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatBody {
    Text(String),
    Image { slot: ImageSlot, name: String },
    /// Invitation to pick the image for an empty slot.
    SelectPrompt(ImageSlot),
    Loading,
    Verdict(ComparisonResult),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub author: ChatAuthor,
    pub body: ChatBody,
}

impl ChatEntry {
    fn bot(body: ChatBody) -> Self {
        Self {
            author: ChatAuthor::Bot,
            body,
        }
    }

    fn user(body: ChatBody) -> Self {
        Self {
            author: ChatAuthor::User,
            body,
        }
    }
}

/// The conversation as it stands for `state`. The second image only enters
/// the conversation once the first one is chosen.
pub fn transcript(state: &FlowState, locale: &Locale) -> Vec<ChatEntry> {
    let mut entries = vec![ChatEntry::bot(ChatBody::Text(locale.welcome.clone()))];

    for slot in ImageSlot::ALL {
        if slot == ImageSlot::Second {
            if state.first.is_none() {
                break;
            }
            entries.push(ChatEntry::bot(ChatBody::Text(
                locale.second_image_prompt.clone(),
            )));
        }
        let body = match state.image(slot) {
            Some(image) => ChatBody::Image {
                slot,
                name: image.name.clone(),
            },
            None => ChatBody::SelectPrompt(slot),
        };
        entries.push(ChatEntry::user(body));
    }

    if state.busy {
        entries.push(ChatEntry::bot(ChatBody::Loading));
    }
    if let Some(result) = &state.result {
        entries.push(ChatEntry::bot(ChatBody::Verdict(result.clone())));
    }
    entries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Compare { enabled: bool },
    NewComparison,
}

pub fn primary_action(state: &FlowState) -> PrimaryAction {
    if state.result.is_some() {
        PrimaryAction::NewComparison
    } else {
        PrimaryAction::Compare {
            enabled: state.can_submit(),
        }
    }
}

pub fn render_verdict(result: &ComparisonResult, locale: &Locale, theme: &Theme) -> String {
    let badge = if result.verified {
        theme.paint(
            &theme.success,
            &format!("{} {}", theme.verified_glyph, locale.verified),
        )
    } else {
        theme.paint(
            &theme.failure,
            &format!("{} {}", theme.rejected_glyph, locale.not_verified),
        )
    };

    let rows = [
        (
            &locale.similarity_label,
            format!("{:.1}%", result.similarity_percentage),
        ),
        (&locale.distance_label, result.distance.to_string()),
        (&locale.threshold_label, result.threshold.to_string()),
        (&locale.model_label, result.model.clone()),
    ];

    let mut out = format!(
        "{} {}\n",
        theme.paint(&theme.accent, &locale.result_title),
        theme.verdict_glyph(result.verified)
    );
    for (label, value) in rows {
        out.push_str(&format!("  {label} {value}\n"));
    }
    out.push_str(&format!("  {}: {badge}", locale.status_label));
    out
}

pub fn render_entry(entry: &ChatEntry, locale: &Locale, theme: &Theme) -> String {
    let prefix = match entry.author {
        ChatAuthor::Bot => theme.paint(&theme.accent, "bot ›"),
        ChatAuthor::User => theme.paint(&theme.muted, "you ›"),
    };
    match &entry.body {
        ChatBody::Text(text) => format!("{prefix} {text}"),
        ChatBody::Image { slot, name } => format!(
            "{prefix} {} ({name})  [{}]",
            locale.image_label(*slot),
            locale.change_image
        ),
        ChatBody::SelectPrompt(slot) => {
            format!("{prefix} [{}]", locale.select_prompt(*slot))
        }
        ChatBody::Loading => format!("{prefix} {}", locale.loading),
        ChatBody::Verdict(result) => {
            format!("{prefix} {}", render_verdict(result, locale, theme))
        }
    }
}

pub fn render_transcript(state: &FlowState, locale: &Locale, theme: &Theme) -> String {
    let mut lines: Vec<String> = vec![
        theme.paint(&theme.accent, &locale.header_title),
        theme.paint(&theme.muted, &locale.header_subtitle),
        String::new(),
    ];
    lines.extend(
        transcript(state, locale)
            .iter()
            .map(|entry| render_entry(entry, locale, theme)),
    );

    let action = match primary_action(state) {
        PrimaryAction::NewComparison => locale.new_comparison.clone(),
        PrimaryAction::Compare { enabled: true } => locale.start_comparison.clone(),
        PrimaryAction::Compare { enabled: false } => {
            theme.paint(&theme.muted, &locale.start_comparison)
        }
    };
    lines.push(String::new());
    lines.push(format!("[{action}]"));
    lines.join("\n")
}

pub fn render_error(err: &SubmissionError, locale: &Locale, theme: &Theme) -> String {
    format!(
        "{}: {}",
        theme.paint(&theme.failure, &locale.error_title),
        locale.message_for(err)
    )
}

#[cfg(test)]
#[path = "tests/presentation_tests.rs"]
mod tests;
