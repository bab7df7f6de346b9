//! In-process fake IMAP server for integration testing
//!
//! # How a quota check looks on the wire
//!
//! ```text
//!   Client connects via TCP (and TLS, for implicit TLS)
//!       |
//!   Server sends greeting: "* OK IMAP4rev1 ready\r\n"
//!       |
//!   [STARTTLS mode: client sends STARTTLS, TLS handshake]
//!       |
//!   Client sends LOGIN with username and password
//!       |
//!   Client sends GETQUOTAROOT for the root mailbox
//!       |
//!   Client sends LOGOUT
//! ```
//!
//! ## Command format
//!
//! Every client command starts with a **tag** chosen by the client
//! (async-imap uses `A0001`, `A0002`, ...). The server echoes it in
//! the completion response; lines prefixed with `*` are untagged data
//! sent before that final OK/NO/BAD:
//!
//! ```text
//!   Client:  A0002 GETQUOTAROOT "INBOX"
//!   Server:  * QUOTAROOT "INBOX" "User quota"
//!   Server:  * QUOTA "User quota" (STORAGE 100 1000)
//!   Server:  A0002 OK Getquotaroot completed
//! ```

use super::accounts::Accounts;
use super::handlers::{handle_capability, handle_getquotaroot, handle_login, handle_logout};
use super::io::write_line;
use imap_codec::CommandCodec;
use imap_codec::decode::Decoder;
use imap_codec::imap_types::command::CommandBody;
use rcgen::generate_simple_self_signed;
use rustls::pki_types::PrivatePkcs8KeyDer;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;

const GREETING: &str = "* OK IMAP4rev1 Fake server ready\r\n";

/// How clients must connect to the fake server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Plaintext IMAP.
    Plain,
    /// TLS handshake first, then IMAP.
    Tls,
    /// Plaintext greeting, then STARTTLS is required before LOGIN.
    StartTls,
}

/// A fake IMAP server that runs on localhost with an OS-assigned port.
///
/// The server generates a self-signed TLS certificate at startup using
/// `rcgen`, so no cert files are needed. It counts accepted TCP
/// connections so tests can assert that no connection was attempted.
pub struct FakeImapServer {
    port: u16,
    connections: Arc<AtomicUsize>,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeImapServer {
    /// Start a new fake IMAP server that accepts the given accounts.
    ///
    /// 1. Binds to `127.0.0.1:0` -- the OS picks a free port.
    /// 2. Generates a self-signed TLS certificate via `rcgen`.
    /// 3. Spawns a tokio task that accepts connections and speaks
    ///    IMAP over the requested transport.
    pub async fn start(accounts: Accounts, transport: Transport) -> Self {
        // The ring provider must be installed process-wide for the
        // server config builder. Tests race to install it, so an
        // "already installed" error is ignored.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind to ephemeral port");
        let port = listener.local_addr().unwrap().port();

        let cert = generate_simple_self_signed(vec!["127.0.0.1".to_string()])
            .expect("generate self-signed cert");

        let cert_der = cert.cert.der().clone();
        let key_der = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

        let tls_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der.into())
            .expect("build server TLS config");

        let acceptor = TlsAcceptor::from(Arc::new(tls_config));
        let accounts = Arc::new(accounts);
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _addr)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let acceptor = acceptor.clone();
                let accounts = accounts.clone();
                tokio::spawn(async move {
                    handle_connection(stream, acceptor, transport, &accounts).await;
                });
            }
        });

        Self {
            port,
            connections,
            handle,
        }
    }

    /// The port the server is listening on.
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Number of TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for FakeImapServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Bring a freshly accepted connection to the point where LOGIN can
/// be sent, then run the command loop.
async fn handle_connection(
    stream: TcpStream,
    acceptor: TlsAcceptor,
    transport: Transport,
    accounts: &Accounts,
) {
    match transport {
        Transport::Plain => handle_imap_session(stream, accounts, true).await,
        Transport::Tls => {
            let Ok(tls_stream) = acceptor.accept(stream).await else {
                return;
            };
            handle_imap_session(tls_stream, accounts, true).await;
        }
        Transport::StartTls => {
            let mut reader = BufReader::new(stream);

            if write_line(&mut reader, GREETING).await.is_err() {
                return;
            }

            let mut line = String::new();
            if reader.read_line(&mut line).await.is_err() {
                return;
            }

            let parts: Vec<&str> = line.trim().splitn(2, ' ').collect();
            if parts.len() < 2 {
                return;
            }
            let tag = parts[0];

            if !parts[1].eq_ignore_ascii_case("STARTTLS") {
                let resp = format!("{tag} BAD Expected STARTTLS\r\n");
                let _ = write_line(&mut reader, &resp).await;
                return;
            }

            let resp = format!("{tag} OK Begin TLS negotiation now\r\n");
            if write_line(&mut reader, &resp).await.is_err() {
                return;
            }

            let tcp = reader.into_inner();
            let Ok(tls_stream) = acceptor.accept(tcp).await else {
                return;
            };

            // No second greeting after STARTTLS (RFC 3501 6.2.1).
            handle_imap_session(tls_stream, accounts, false).await;
        }
    }
}

/// The mailbox argument of `TAG GETQUOTAROOT "name"`, unquoted.
fn quotaroot_mailbox(line: &str) -> Option<&str> {
    let mut parts = line.splitn(3, ' ');
    let _tag = parts.next()?;
    let command = parts.next()?;
    if !command.eq_ignore_ascii_case("GETQUOTAROOT") {
        return None;
    }
    Some(parts.next().unwrap_or("").trim().trim_matches('"'))
}

/// Run the IMAP command loop over an established stream.
///
/// GETQUOTAROOT is recognised by hand; everything else goes through
/// `imap-codec`'s `CommandCodec` and is dispatched on the
/// `CommandBody` variant.
async fn handle_imap_session<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    accounts: &Accounts,
    greet: bool,
) {
    let mut reader = BufReader::new(stream);
    let mut current_user: Option<String> = None;
    let codec = CommandCodec::default();

    if greet && write_line(&mut reader, GREETING).await.is_err() {
        return;
    }

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(mailbox) = quotaroot_mailbox(trimmed) {
            let tag = trimmed.split_whitespace().next().unwrap_or("*");
            handle_getquotaroot(
                tag,
                mailbox,
                current_user.as_deref(),
                accounts,
                &mut reader,
            )
            .await;
            continue;
        }

        let Ok((_, command)) = codec.decode(line.as_bytes()) else {
            let tag = trimmed.split_whitespace().next().unwrap_or("*");
            let resp = format!("{tag} BAD Parse error\r\n");
            if write_line(&mut reader, &resp).await.is_err() {
                break;
            }
            continue;
        };

        let tag = command.tag.inner();

        match command.body {
            CommandBody::Capability => {
                handle_capability(tag, accounts.quota_supported, &mut reader).await;
            }
            CommandBody::Login { username, password } => {
                let username = String::from_utf8_lossy(username.as_ref()).into_owned();
                let password = String::from_utf8_lossy(password.declassify().as_ref()).into_owned();
                current_user =
                    handle_login(tag, &username, &password, accounts, &mut reader).await;
            }
            CommandBody::Logout => {
                handle_logout(tag, &mut reader).await;
                break;
            }
            _ => {
                let resp = format!("{tag} BAD Unknown command\r\n");
                if write_line(&mut reader, &resp).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_quoted_mailbox() {
        assert_eq!(
            quotaroot_mailbox("A0002 GETQUOTAROOT \"INBOX\""),
            Some("INBOX")
        );
        assert_eq!(
            quotaroot_mailbox("a1 getquotaroot \"Shared/Team\""),
            Some("Shared/Team")
        );
        assert_eq!(quotaroot_mailbox("A3 GETQUOTAROOT INBOX"), Some("INBOX"));
    }

    #[test]
    fn ignores_other_commands() {
        assert_eq!(quotaroot_mailbox("A1 LOGIN \"a\" \"b\""), None);
        assert_eq!(quotaroot_mailbox("A1"), None);
    }
}
