//! Socket setup: TCP connect, keepalive and the TLS upgrade.

use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::config::ServerAddress;
use crate::error::ConnectionError;

/// Open a TCP connection and enable keepalive on it.
pub(crate) async fn connect_tcp(address: &ServerAddress) -> Result<TcpStream, ConnectionError> {
    let stream = TcpStream::connect((address.host.as_str(), address.port))
        .await
        .map_err(|source| ConnectionError::Connect {
            address: address.to_string(),
            source,
        })?;

    if let Err(e) = enable_keepalive(&stream) {
        warn!(error = %e, "failed to enable TCP keepalive");
    }
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "failed to set TCP_NODELAY");
    }

    Ok(stream)
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}

fn tls_config() -> ClientConfig {
    let root_store = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

/// Run the TLS handshake over an established TCP stream.
///
/// The certificate is verified against the webpki root set for `host`.
pub(crate) async fn upgrade_tls(
    stream: TcpStream,
    host: &str,
) -> Result<TlsStream<TcpStream>, ConnectionError> {
    let server_name = ServerName::try_from(host.to_owned())
        .map_err(|_| ConnectionError::InvalidServerName(host.to_owned()))?;

    let connector = TlsConnector::from(Arc::new(tls_config()));
    let stream = connector
        .connect(server_name, stream)
        .await
        .map_err(|source| ConnectionError::Tls {
            host: host.to_owned(),
            source,
        })?;

    debug!(host, "TLS handshake complete");
    Ok(stream)
}
