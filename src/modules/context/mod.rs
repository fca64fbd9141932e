// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::MailPoolResult;

pub trait Initialize {
    async fn initialize() -> MailPoolResult<()>;
}
