use crate::{
    modules::{
        context::Initialize,
        error::{code::ErrorCode, MailPoolResult},
    },
    raise_error,
};

pub struct MailPoolTls;

impl Initialize for MailPoolTls {
    async fn initialize() -> MailPoolResult<()> {
        rustls::crypto::CryptoProvider::install_default(rustls::crypto::ring::default_provider())
            .map_err(|_| {
                raise_error!(
                    "failed to set crypto provider".into(),
                    ErrorCode::InternalError
                )
            })
    }
}
