//! IMAP connection and TLS helpers
//!
//! Opens one authenticated session per account. The transport is
//! plain TCP, implicit TLS, or plain TCP upgraded with STARTTLS,
//! depending on [`Security`].

use crate::config::{Security, ServerConfig};
use crate::error::AccountError;
use crate::store::Credential;
use async_imap::Session;
use rustls::pki_types::ServerName;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::debug;

/// An authenticated IMAP session over either transport.
pub type ImapSession = Session<Compat<MailStream>>;

/// A stream that is either plaintext or TLS.
#[derive(Debug)]
pub enum MailStream {
    Plain(TcpStream),
    /// Boxed to keep the enum small.
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for MailStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MailStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Build a TLS connector.
///
/// Verifies against the webpki roots unless `accept_invalid_certs`
/// is set, in which case any certificate is accepted. The ring
/// provider is passed explicitly so callers need not install a
/// process-wide default.
fn tls_connector(accept_invalid_certs: bool) -> Result<TlsConnector, AccountError> {
    let builder = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| AccountError::Tls(e.to_string()))?;

    let config = if accept_invalid_certs {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
            .with_no_client_auth()
    } else {
        let roots = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        builder.with_root_certificates(roots).with_no_client_auth()
    };
    Ok(TlsConnector::from(Arc::new(config)))
}

async fn handshake(
    config: &ServerConfig,
    tcp: TcpStream,
) -> Result<TlsStream<TcpStream>, AccountError> {
    let connector = tls_connector(config.accept_invalid_certs)?;
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|e| AccountError::Tls(format!("Invalid server name: {e}")))?;

    connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| AccountError::Tls(e.to_string()))
}

/// Issue STARTTLS on a fresh plaintext connection and hand back the
/// raw socket, ready for the TLS handshake.
async fn starttls(tcp: TcpStream) -> Result<TcpStream, AccountError> {
    let mut client = async_imap::Client::new(tcp.compat());

    client
        .run_command_and_check_ok("STARTTLS", None)
        .await
        .map_err(|e| AccountError::Tls(format!("STARTTLS failed: {e}")))?;

    Ok(client.into_inner().into_inner())
}

/// Map a LOGIN failure onto the account error taxonomy.
fn login_error(e: async_imap::error::Error) -> AccountError {
    use async_imap::error::Error as ImapError;

    match e {
        ImapError::No(msg) | ImapError::Bad(msg) => AccountError::Authentication(msg),
        ImapError::Io(e) => AccountError::Connection(e.to_string()),
        ImapError::ConnectionLost => AccountError::Connection("connection lost".into()),
        other => AccountError::Protocol(format!("Login failed: {other}")),
    }
}

/// Open a fresh IMAP session for one account.
///
/// Connects to `config.host:config.port` via TCP, secures the stream
/// according to `config.security`, and logs in with the account's
/// credentials.
pub async fn connect(
    config: &ServerConfig,
    credential: &Credential,
) -> Result<ImapSession, AccountError> {
    let addr = config.address();
    debug!("Connecting to IMAP server at {} ({})", addr, config.security);

    let tcp = TcpStream::connect(&addr).await?;

    let stream = match config.security {
        Security::Plain => MailStream::Plain(tcp),
        Security::Tls => MailStream::Tls(Box::new(handshake(config, tcp).await?)),
        Security::StartTls => {
            let tcp = starttls(tcp).await?;
            MailStream::Tls(Box::new(handshake(config, tcp).await?))
        }
    };

    let client = async_imap::Client::new(stream.compat());

    let session = client
        .login(&credential.username, &credential.password)
        .await
        .map_err(|(e, _)| login_error(e))?;

    debug!("Logged in as {}", credential.username);
    Ok(session)
}

/// Certificate verifier that accepts all certificates
/// (for servers with self-signed certs).
#[derive(Debug)]
struct AcceptAnyCertificate;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
