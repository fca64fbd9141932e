use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailPoolResult;
use crate::raise_error;
use mail_send::smtp::message::IntoMessage;
use mail_send::SmtpClient;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

pub enum MailPoolSmtpClient {
    Plain(SmtpClient<TcpStream>),
    Tls(SmtpClient<TlsStream<TcpStream>>),
}

pub(crate) trait Sender {
    async fn send_email<'x>(&mut self, message: impl IntoMessage<'x>) -> MailPoolResult<()>;
    async fn quit(self) -> MailPoolResult<()>;
}

impl Sender for MailPoolSmtpClient {
    async fn send_email<'x>(&mut self, message: impl IntoMessage<'x>) -> MailPoolResult<()> {
        match self {
            MailPoolSmtpClient::Plain(smtp_client) => smtp_client
                .send(message)
                .await
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::SmtpCommandFailed)),
            MailPoolSmtpClient::Tls(smtp_client) => smtp_client
                .send(message)
                .await
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::SmtpCommandFailed)),
        }
    }

    async fn quit(self) -> MailPoolResult<()> {
        match self {
            MailPoolSmtpClient::Plain(smtp_client) => smtp_client
                .quit()
                .await
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::SmtpCommandFailed)),
            MailPoolSmtpClient::Tls(smtp_client) => smtp_client
                .quit()
                .await
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::SmtpCommandFailed)),
        }
    }
}
