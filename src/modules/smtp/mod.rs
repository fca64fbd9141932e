// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::account::Account;
use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailPoolResult;
use crate::modules::proxy::Proxy;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::smtp::client::{MailPoolSmtpClient, Sender};
use crate::modules::utils::net::connect_with_optional_proxy;
use crate::raise_error;
use mail_send::mail_builder::MessageBuilder;
use mail_send::smtp::tls::build_tls_connector;
use mail_send::smtp::AssertReply;
use mail_send::{Credentials, SmtpClient};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;

pub mod client;

pub const SMTP_PORT_SUBMISSION: u16 = 587;

pub const EXT_START_TLS: u32 = 1 << 24;

/// Mail-submission endpoint for the big providers; everything else gets
/// the `smtp.<domain>` convention.
pub fn resolve_smtp_host(email: &str) -> String {
    let domain = email
        .split_once('@')
        .map(|(_, d)| d.to_ascii_lowercase())
        .unwrap_or_default();
    let mapped = match domain.as_str() {
        "gmail.com" | "googlemail.com" => "smtp.gmail.com",
        "gmx.de" | "gmx.net" | "gmx.at" => "mail.gmx.net",
        "web.de" => "smtp.web.de",
        "yahoo.com" | "yahoo.co.uk" => "smtp.mail.yahoo.com",
        "yandex.ru" | "yandex.com" => "smtp.yandex.com",
        "mail.ru" | "bk.ru" | "list.ru" | "inbox.ru" => "smtp.mail.ru",
        "outlook.com" | "hotmail.com" | "live.com" | "office365.com" => "smtp-mail.outlook.com",
        "icloud.com" | "me.com" => "smtp.mail.me.com",
        "aol.com" => "smtp.aol.com",
        _ => "",
    };
    if !mapped.is_empty() {
        return mapped.to_string();
    }
    if domain.is_empty() {
        return "smtp.gmail.com".to_string();
    }
    format!("smtp.{domain}")
}

/// Seam between the campaign loop and the real SMTP transport.
pub(crate) trait Mailer: Send + Sync + 'static {
    fn send(
        &self,
        account: &Account,
        proxy: &Proxy,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = MailPoolResult<()>> + Send;
}

/// STARTTLS submission through a SOCKS5 proxy: greeting, EHLO, TLS
/// upgrade, AUTH, one message, QUIT.
pub(crate) struct SmtpMailer;

impl SmtpMailer {
    pub(crate) fn new() -> Self {
        Self
    }

    async fn connect_starttls(
        tcp_stream: TcpStream,
        host: &str,
        timeout: Duration,
        credentials: Credentials<String>,
    ) -> Result<MailPoolSmtpClient, mail_send::Error> {
        tokio::time::timeout(timeout, async {
            let mut client = SmtpClient {
                stream: tcp_stream,
                timeout,
            };

            let local_host = gethostname::gethostname()
                .to_str()
                .unwrap_or("[127.0.0.1]")
                .to_string();
            let tls_connector = build_tls_connector(false);

            // Read greeting
            client.read().await?.assert_positive_completion()?;
            // Send EHLO
            let response = client.ehlo(&local_host).await?;
            if response.has_capability(EXT_START_TLS) {
                let mut client = client.start_tls(&tls_connector, host).await?;
                let capabilities = client.capabilities(&local_host, false).await?;
                // Authenticate
                client.authenticate(&credentials, &capabilities).await?;
                Ok(MailPoolSmtpClient::Tls(client))
            } else {
                Err(mail_send::Error::MissingStartTls)
            }
        })
        .await
        .map_err(|_| mail_send::Error::Timeout)?
    }
}

impl Mailer for SmtpMailer {
    async fn send(
        &self,
        account: &Account,
        proxy: &Proxy,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> MailPoolResult<()> {
        let host = resolve_smtp_host(&account.email);
        let timeout = Duration::from_secs(SETTINGS.mailpool_imap_timeout_secs);

        let tcp_stream =
            connect_with_optional_proxy(Some(proxy), &host, SMTP_PORT_SUBMISSION, timeout).await?;

        let credentials = Credentials::new(account.email.clone(), account.password.clone());
        let mut client = Self::connect_starttls(tcp_stream, &host, timeout, credentials)
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::SmtpConnectionFailed))?;

        let message = MessageBuilder::new()
            .from((account.sender_name(), account.email.as_str()))
            .to(recipient)
            .subject(subject)
            .text_body(body);
        client.send_email(message).await?;

        let _ = client.quit().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_smtp_host;

    #[test]
    fn submission_hosts_for_known_providers() {
        assert_eq!(resolve_smtp_host("a@gmail.com"), "smtp.gmail.com");
        assert_eq!(resolve_smtp_host("a@gmx.net"), "mail.gmx.net");
        assert_eq!(resolve_smtp_host("a@outlook.com"), "smtp-mail.outlook.com");
        assert_eq!(resolve_smtp_host("a@icloud.com"), "smtp.mail.me.com");
    }

    #[test]
    fn unknown_domains_use_the_smtp_prefix_guess() {
        assert_eq!(resolve_smtp_host("a@example.org"), "smtp.example.org");
    }
}
