// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use regex::Regex;
use std::sync::LazyLock;

static OFFER_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\{?OFFER\}?").unwrap());

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderedMessage {
    pub subject: String,
    /// The body that actually goes out.
    pub body: String,
    /// Log-facing copy: when the template opens with an offer line, that
    /// line is dropped here (but never from `body`).
    pub body_for_log: String,
}

fn substitute(text: &str, seller_name: &str, item_title: &str) -> String {
    text.replace("{SELLER}", seller_name)
        .replace("SELLER", seller_name)
        .replace("{ITEM}", item_title)
        .replace("{OFFER}", item_title)
        .replace("OFFER", item_title)
}

/// Fill one subject and one body template with the recipient's seller
/// name and item title.
pub fn render_message(
    subject_template: &str,
    body_template: &str,
    seller_name: &str,
    item_title: &str,
) -> RenderedMessage {
    let subject = substitute(subject_template, seller_name, item_title)
        .trim()
        .to_string();
    let body = substitute(body_template, seller_name, item_title);

    // The offer test runs against the raw template: after substitution an
    // empty title would erase the token we are looking for.
    let offer_first = body_template
        .lines()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| OFFER_TOKEN.is_match(line));

    let body_for_log = if offer_first {
        strip_first_nonblank_line(&body)
    } else {
        body.clone()
    };

    RenderedMessage {
        subject,
        body,
        body_for_log,
    }
}

fn strip_first_nonblank_line(body: &str) -> String {
    let lines: Vec<&str> = body.split('\n').collect();
    match lines.iter().position(|line| !line.trim().is_empty()) {
        Some(idx) => {
            let mut kept: Vec<&str> = Vec::with_capacity(lines.len() - 1);
            kept.extend(&lines[..idx]);
            kept.extend(&lines[idx + 1..]);
            kept.join("\n").trim_start_matches('\n').to_string()
        }
        None => body.to_string(),
    }
}
