use std::fmt;

use serde::Serialize;

/// Numeric key of one catalog entry
pub type TrackId = u64;

/// Tags pulled from a preview; absent fields are empty strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
}

/// One line of the scan log: `id!artist!title!album`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry<'a> {
    pub id: TrackId,
    pub meta: &'a TrackMetadata,
}

pub const LOG_DELIMITER: char = '!';

// a field must never split its entry across lines
fn single_line(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains(['\n', '\r']) {
        field.replace(['\n', '\r'], " ").into()
    } else {
        field.into()
    }
}

impl fmt::Display for LogEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = LOG_DELIMITER;
        write!(
            f, "{}{d}{}{d}{}{d}{}",
            self.id,
            single_line(&self.meta.artist),
            single_line(&self.meta.title),
            single_line(&self.meta.album)
        )
    }
}

/// Body of a sendMessage call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: &'static str,
}

impl NotificationPayload {
    pub fn html(chat_id: &str, text: String) -> Self {
        Self { chat_id: chat_id.to_string(), text, parse_mode: "HTML" }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _   => out.push(c),
        }
    }
    out
}

/// Message text announcing an unreleased track
pub fn match_message(id: TrackId, meta: &TrackMetadata) -> String {
    format!(
        "<b>ID</b> ! <code>{id}</code>\n\
         <b>Song</b> ! <code>{}</code>\n\
         <b>Artist</b> ! <code>{}</code>\n\
         <b>Album</b> ! <code>{}</code>",
        escape_html(&meta.title),
        escape_html(&meta.artist),
        escape_html(&meta.album),
    )
}

/// Three-way answer from the release status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStatus {
    Unreleased,
    Released,
    Unknown,
}

impl ReleaseStatus {
    /// Inconclusive checks never count as unreleased
    pub fn is_unreleased(self) -> bool {
        matches!(self, ReleaseStatus::Unreleased)
    }
}
