//! One exclusive IMAP connection per logical operation
//!
//! [`Session::open`] connects, negotiates TLS (implicit or STARTTLS) and
//! logs in; [`Session::close`] logs out and can be called any number of
//! times. A `Session` that is dropped without `close` still releases its
//! socket, which is what happens when an operation times out.

use crate::config::{Account, Security};
use crate::error::{Error, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::WebPkiSupportedAlgorithms;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info, warn};

/// A TLS-wrapped, authenticated IMAP session.
pub(crate) type ImapSession = async_imap::Session<Compat<TlsStream<TcpStream>>>;

/// Liveness of a [`Session`]. A session only exists once it is ready;
/// connection failures surface as errors from [`Session::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    Closed,
    /// LOGOUT did not complete cleanly; the socket is gone either way.
    Failed,
}

pub struct Session {
    imap: Option<ImapSession>,
    state: SessionState,
}

impl Session {
    /// Connect, negotiate TLS and log in.
    ///
    /// # Errors
    ///
    /// TCP, TLS and login failures are returned as-is and never retried.
    pub async fn open(account: &Account) -> Result<Self> {
        let addr = format!("{}:{}", account.host, account.port);
        debug!("Connecting to IMAP server at {} ({:?})", addr, account.security);

        let tcp_stream = TcpStream::connect(&addr).await?;
        let connector = tls_connector(account.accept_invalid_certs)?;
        let server_name = ServerName::try_from(account.host.clone())
            .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

        let tls_stream = match account.security {
            Security::ImplicitTls => connector
                .connect(server_name, tcp_stream)
                .await
                .map_err(|e| Error::Tls(e.to_string()))?,
            Security::StartTls => {
                let mut client = async_imap::Client::new(tcp_stream.compat());
                client
                    .run_command_and_check_ok("STARTTLS", None)
                    .await
                    .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;

                let inner = client.into_inner().into_inner();
                connector
                    .connect(server_name, inner)
                    .await
                    .map_err(|e| Error::Tls(e.to_string()))?
            }
        };

        let imap = async_imap::Client::new(tls_stream.compat())
            .login(&account.address, &account.secret)
            .await
            .map_err(|(e, _)| Error::Auth(e.to_string()))?;

        info!("Logged in to {} as {}", account.host, account.address);
        Ok(Self {
            imap: Some(imap),
            state: SessionState::Ready,
        })
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Log out and release the connection. Idempotent.
    pub async fn close(&mut self) {
        let Some(mut imap) = self.imap.take() else {
            return;
        };
        match imap.logout().await {
            Ok(()) => {
                debug!("Logged out");
                self.state = SessionState::Closed;
            }
            Err(e) => {
                warn!("Logout failed: {}", e);
                self.state = SessionState::Failed;
            }
        }
    }

    pub(crate) fn imap(&mut self) -> Result<&mut ImapSession> {
        self.imap.as_mut().ok_or(Error::SessionClosed)
    }
}

fn tls_connector(accept_invalid_certs: bool) -> Result<TlsConnector> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let algorithms = provider.signature_verification_algorithms;
    let builder = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(e.to_string()))?;

    let config = if accept_invalid_certs {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCert(algorithms)))
            .with_no_client_auth()
    } else {
        let roots = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        builder.with_root_certificates(roots).with_no_client_auth()
    };
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Accepts any server certificate but still checks handshake signatures,
/// so the peer must hold the key for whatever certificate it presents.
#[derive(Debug)]
struct AcceptAnyCert(WebPkiSupportedAlgorithms);

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.0)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.0)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.supported_schemes()
    }
}
