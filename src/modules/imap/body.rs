// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::utils::truncate_chars;
use mail_parser::Message;
use regex::Regex;
use std::sync::LazyLock;

/// Bodies are clipped to this many characters before leaving the fetcher.
pub const BODY_MAX_CHARS: usize = 3500;

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static TRAILING_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+\n").unwrap());
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Plain-text rendition of a parsed message: prefer the text part, fall
/// back to markup-stripped HTML, then tidy whitespace and clip.
pub fn extract_plain_body(message: &Message<'_>) -> String {
    let raw = message
        .body_text(0)
        .map(|text| text.into_owned())
        .or_else(|| message.body_html(0).map(|html| strip_tags(&html)))
        .unwrap_or_default();
    tidy(&raw)
}

pub fn strip_tags(html: &str) -> String {
    TAGS.replace_all(html, " ").into_owned()
}

fn tidy(body: &str) -> String {
    let body = TRAILING_WS.replace_all(body, "\n");
    let body = BLANK_RUNS.replace_all(&body, "\n\n");
    truncate_chars(body.trim(), BODY_MAX_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_to_text() {
        let stripped = strip_tags("<p>Hello <b>there</b></p>");
        assert!(!stripped.contains('<'));
        assert!(stripped.contains("Hello"));
        assert!(stripped.contains("there"));
    }

    #[test]
    fn collapses_blank_runs_and_trailing_space() {
        assert_eq!(tidy("a   \nb\n\n\n\n\nc"), "a\nb\n\nc");
    }

    #[test]
    fn clips_oversized_bodies() {
        let body = "x".repeat(BODY_MAX_CHARS * 2);
        assert_eq!(tidy(&body).chars().count(), BODY_MAX_CHARS);
    }
}
