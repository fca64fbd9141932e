// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod net;
pub mod shutdown;
pub mod tls;

#[macro_export]
macro_rules! mailpool_version {
    () => {
        env!("CARGO_PKG_VERSION")
    };
}

#[macro_export]
macro_rules! utc_now {
    () => {{
        use chrono::Utc;
        Utc::now().timestamp_millis()
    }};
}

#[macro_export]
macro_rules! raise_error {
    ($msg:expr, $code:expr) => {
        $crate::modules::error::MailPoolError::Generic {
            message: $msg,
            location: snafu::Location::default(),
            code: $code,
        }
    };
}

/// Truncate a string to at most `max` characters without splitting a
/// multi-byte sequence. Returns a borrowed slice when nothing was cut.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_chars;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllö", 4), "héll");
        assert_eq!(truncate_chars("", 5), "");
    }
}
