// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use code::ErrorCode;
use snafu::{Location, Snafu};

pub mod code;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MailPoolError {
    #[snafu(display("{message}"))]
    Generic {
        message: String,
        #[snafu(implicit)]
        location: Location,
        code: ErrorCode,
    },
}

pub type MailPoolResult<T, E = MailPoolError> = std::result::Result<T, E>;

impl MailPoolError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MailPoolError::Generic { code, .. } => *code,
        }
    }

    /// True for failures of the transport layer itself (connect timeouts,
    /// resets, TLS breakage), as opposed to the server rejecting us.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::NetworkError | ErrorCode::ConnectionTimeout
        )
    }
}
