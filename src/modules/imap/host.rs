// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub const IMAP_PORT_SSL: u16 = 993;

/// IMAP endpoint for the big providers whose hostnames don't follow the
/// `imap.<domain>` convention (or alias several domains onto one server).
pub fn resolve_imap_host(email: &str) -> String {
    let domain = email
        .split_once('@')
        .map(|(_, d)| d.to_ascii_lowercase())
        .unwrap_or_default();
    let mapped = match domain.as_str() {
        "gmail.com" | "googlemail.com" => "imap.gmail.com",
        "gmx.de" | "gmx.net" | "gmx.at" => "imap.gmx.net",
        "web.de" => "imap.web.de",
        "yahoo.com" | "yahoo.co.uk" => "imap.mail.yahoo.com",
        "yandex.ru" | "yandex.com" => "imap.yandex.com",
        "mail.ru" | "bk.ru" | "list.ru" | "inbox.ru" => "imap.mail.ru",
        "outlook.com" | "hotmail.com" | "live.com" | "office365.com" => "outlook.office365.com",
        "icloud.com" | "me.com" => "imap.mail.me.com",
        "aol.com" => "imap.aol.com",
        _ => "",
    };
    if !mapped.is_empty() {
        return mapped.to_string();
    }
    if domain.is_empty() {
        // Nothing sensible to guess from; the fetch will fail with a
        // resolve error carrying this name.
        return "imap.gmail.com".to_string();
    }
    format!("imap.{domain}")
}
