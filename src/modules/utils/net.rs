// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::code::ErrorCode;
use crate::modules::proxy::Proxy;
use crate::modules::utils::tls::establish_tls_stream;
use crate::modules::{error::MailPoolResult, imap::session::SessionStream};
use crate::raise_error;
use std::pin::Pin;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_io_timeout::TimeoutStream;
use tokio_socks::tcp::Socks5Stream;
use tracing::error;

pub(crate) async fn establish_tcp_connection_with_timeout(
    host: &str,
    port: u16,
    use_proxy: Option<&Proxy>,
    connect_timeout: Duration,
) -> MailPoolResult<Pin<Box<TimeoutStream<TcpStream>>>> {
    let tcp_stream = connect_with_optional_proxy(use_proxy, host, port, connect_timeout).await?;

    // Disable Nagle's algorithm for more efficient network communication
    tcp_stream
        .set_nodelay(true)
        .map_err(|e| raise_error!(e.to_string(), ErrorCode::NetworkError))?;

    // Wrap the TCP stream in a TimeoutStream for timeout management
    let mut timeout_stream = TimeoutStream::new(tcp_stream);
    timeout_stream.set_write_timeout(Some(connect_timeout));
    timeout_stream.set_read_timeout(Some(connect_timeout));

    Ok(Box::pin(timeout_stream))
}

pub(crate) async fn establish_tls_connection(
    host: &str,
    port: u16,
    alpn_protocols: &[&str],
    use_proxy: Option<&Proxy>,
    connect_timeout: Duration,
) -> MailPoolResult<impl SessionStream> {
    let tcp_stream =
        establish_tcp_connection_with_timeout(host, port, use_proxy, connect_timeout).await?;
    let tls_stream = establish_tls_stream(host, alpn_protocols, tcp_stream).await?;
    Ok(tls_stream)
}

/// Connect through a SOCKS5 proxy, or directly when no proxy is given.
///
/// Proxied connects hand the target over as a domain name so DNS resolution
/// happens at the proxy's egress, not locally.
pub(crate) async fn connect_with_optional_proxy(
    use_proxy: Option<&Proxy>,
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> MailPoolResult<TcpStream> {
    if let Some(proxy) = use_proxy {
        let proxy_addr = (proxy.host.as_str(), proxy.port);
        let target = (host, port);
        let connect = async {
            match (&proxy.username, &proxy.password) {
                (Some(user), Some(pass)) => {
                    Socks5Stream::connect_with_password(proxy_addr, target, user, pass).await
                }
                _ => Socks5Stream::connect(proxy_addr, target).await,
            }
        };
        return timeout(connect_timeout, connect)
            .await
            .map_err(|_| {
                error!(
                    "SOCKS5 proxy connection to {}:{} via {}:{} timed out after {}s",
                    host,
                    port,
                    proxy.host,
                    proxy.port,
                    connect_timeout.as_secs()
                );
                raise_error!(
                    format!(
                        "SOCKS5 proxy connection to {}:{} via {}:{} timed out after {}s",
                        host,
                        port,
                        proxy.host,
                        proxy.port,
                        connect_timeout.as_secs()
                    ),
                    ErrorCode::ConnectionTimeout
                )
            })?
            .map(|s| s.into_inner())
            .map_err(|e| raise_error!(e.to_string(), ErrorCode::NetworkError));
    }
    timeout(connect_timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| {
            error!(
                "TCP connection to {}:{} timed out after {}s",
                host,
                port,
                connect_timeout.as_secs()
            );
            raise_error!(
                format!(
                    "TCP connection to {}:{} timed out after {}s",
                    host,
                    port,
                    connect_timeout.as_secs()
                ),
                ErrorCode::ConnectionTimeout
            )
        })?
        .map_err(|e| raise_error!(e.to_string(), ErrorCode::NetworkError))
}
