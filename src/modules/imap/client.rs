use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailPoolResult;
use crate::modules::imap::session::SessionStream;
use crate::modules::proxy::Proxy;
use crate::modules::utils::net::establish_tls_connection;
use crate::raise_error;
use async_imap::Client as ImapClient;
use async_imap::Session as ImapSession;
use std::ops::Deref;
use std::ops::DerefMut;
use std::time::Duration;
use tokio::io::BufWriter;
use tracing::debug;

#[derive(Debug)]
pub(crate) struct Client {
    inner: ImapClient<Box<dyn SessionStream>>,
}

impl Deref for Client {
    type Target = ImapClient<Box<dyn SessionStream>>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Client {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

fn alpn(port: u16) -> &'static [&'static str] {
    if port == 993 {
        &[]
    } else {
        &["imap"]
    }
}

impl Client {
    fn new(stream: Box<dyn SessionStream>) -> Self {
        Self {
            inner: ImapClient::new(stream),
        }
    }

    /// Open an implicit-TLS connection, optionally tunneled through a
    /// SOCKS5 proxy, and consume the server greeting.
    pub(crate) async fn connect(
        host: &str,
        port: u16,
        use_proxy: Option<&Proxy>,
        timeout: Duration,
    ) -> MailPoolResult<Self> {
        match use_proxy {
            Some(proxy) => {
                debug!("Attempting IMAP connection to {host}:{port} via {}.", proxy.label())
            }
            None => debug!("Attempting direct IMAP connection to {host}:{port}."),
        }

        let tls_stream =
            establish_tls_connection(host, port, alpn(port), use_proxy, timeout).await?;
        // Wrap the TLS stream in a buffered writer for efficient IO
        let buffered_stream = BufWriter::new(tls_stream);
        let session_stream: Box<dyn SessionStream> = Box::new(buffered_stream);
        let mut client = Client::new(session_stream);

        // Read and validate the greeting response
        let _greeting = client
            .read_response()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapCommandFailed))?
            .ok_or_else(|| {
                raise_error!(
                    "failed to read greeting".into(),
                    ErrorCode::ImapCommandFailed
                )
            })?;

        Ok(client)
    }

    pub(crate) async fn login(
        self,
        username: &str,
        password: &str,
    ) -> MailPoolResult<ImapSession<Box<dyn SessionStream>>> {
        let Client { inner, .. } = self;
        // An Io error here is the transport dying mid-handshake, not the
        // server rejecting the credentials; callers retry on the former.
        let session = inner.login(username, password).await.map_err(|(e, _)| match e {
            async_imap::error::Error::Io(e) => {
                raise_error!(e.to_string(), ErrorCode::NetworkError)
            }
            e => raise_error!(format!("{:#?}", e), ErrorCode::ImapAuthenticationFailed),
        })?;
        Ok(session)
    }
}
