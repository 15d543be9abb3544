//! Raw TCP(S) ingestion transport: a persistent socket fed line-protocol
//! bytes directly, with an optional ECDSA challenge/response handshake on
//! connect.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::address::Address;
use crate::auth::Signer;
use crate::buffer::Buffer;
use crate::config::TlsVerify;
use crate::error::{Error, Result};

/// Below this, `init_buf_size` leaves no room to receive the server's auth
/// challenge line.
const MIN_BUF_SIZE_FOR_AUTH: usize = 512;

/// Builds the `rustls` client configuration for a `tcps` connection,
/// honoring the configured TLS verify mode. `unsafe_off` installs a
/// verifier that accepts any certificate chain, for a self-signed dev
/// server; never use it against production traffic.
pub fn build_tls_config(verify: TlsVerify) -> Result<Arc<ClientConfig>> {
    let config = match verify {
        TlsVerify::On => {
            let mut root_store = RootCertStore::empty();
            let native = rustls_native_certs::load_native_certs();
            for err in &native.errors {
                tracing::warn!(%err, "failed to load a native root certificate");
            }
            for cert in native.certs {
                root_store
                    .add(cert)
                    .map_err(|e| Error::socket(format!("invalid root certificate: {e}")))?;
            }
            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth()
        }
        TlsVerify::UnsafeOff => ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerifier))
            .with_no_client_auth(),
    };
    Ok(Arc::new(config))
}

/// Accepts any server certificate chain. Only ever installed when the
/// configuration explicitly asks for `tls_verify=unsafe_off`.
#[derive(Debug)]
struct NoVerifier;

impl tokio_rustls::rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[tokio_rustls::rustls::pki_types::CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: tokio_rustls::rustls::pki_types::UnixTime,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::ServerCertVerified,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::HandshakeSignatureValid,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &tokio_rustls::rustls::pki_types::CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> std::result::Result<
        tokio_rustls::rustls::client::danger::HandshakeSignatureValid,
        tokio_rustls::rustls::Error,
    > {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<tokio_rustls::rustls::SignatureScheme> {
        vec![
            tokio_rustls::rustls::SignatureScheme::RSA_PKCS1_SHA256,
            tokio_rustls::rustls::SignatureScheme::RSA_PKCS1_SHA384,
            tokio_rustls::rustls::SignatureScheme::RSA_PKCS1_SHA512,
            tokio_rustls::rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            tokio_rustls::rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            tokio_rustls::rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            tokio_rustls::rustls::SignatureScheme::RSA_PSS_SHA256,
            tokio_rustls::rustls::SignatureScheme::RSA_PSS_SHA384,
            tokio_rustls::rustls::SignatureScheme::RSA_PSS_SHA512,
            tokio_rustls::rustls::SignatureScheme::ED25519,
        ]
    }
}

enum Stream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl Stream {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            Stream::Plain(s) => s.write_all(bytes).await.map_err(Error::from),
            Stream::Tls(s) => s.write_all(bytes).await.map_err(Error::from),
        }
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf).await.map_err(Error::from),
            Stream::Tls(s) => s.read(buf).await.map_err(Error::from),
        }
    }
}

pub struct SocketTransport {
    stream: Stream,
    healthy: bool,
}

impl SocketTransport {
    /// Connects to `address`, optionally wrapping the connection in TLS and
    /// running the ECDSA challenge/response handshake when `signer` is
    /// given.
    pub async fn connect(
        address: &Address,
        tls_config: Option<Arc<ClientConfig>>,
        signer: Option<&Signer>,
        auth_timeout: std::time::Duration,
        init_buf_size: usize,
    ) -> Result<Self> {
        if signer.is_some() && init_buf_size < MIN_BUF_SIZE_FOR_AUTH {
            return Err(Error::invalid_api_call(
                "Buffer is too small to receive the message",
            ));
        }

        let tcp = TcpStream::connect((address.host.as_str(), address.port))
            .await
            .map_err(|e| Error::socket(format!("connect to {address} failed: {e}")))?;
        tcp.set_nodelay(true).ok();

        let mut stream = match tls_config {
            Some(config) => {
                let connector = TlsConnector::from(config);
                let server_name = ServerName::try_from(address.host.clone())
                    .map_err(|e| Error::socket(format!("invalid TLS server name: {e}")))?;
                let tls = connector
                    .connect(server_name, tcp)
                    .await
                    .map_err(|e| Error::socket(format!("TLS handshake failed: {e}")))?;
                Stream::Tls(Box::new(tls))
            }
            None => Stream::Plain(tcp),
        };

        if let Some(signer) = signer {
            Self::authenticate(&mut stream, signer, auth_timeout).await?;
        }

        Ok(Self {
            stream,
            healthy: true,
        })
    }

    async fn authenticate(
        stream: &mut Stream,
        signer: &Signer,
        timeout: std::time::Duration,
    ) -> Result<()> {
        let mut username_line = signer.username().to_string();
        username_line.push('\n');
        stream.write_all(username_line.as_bytes()).await?;

        let challenge = tokio::time::timeout(timeout, read_challenge_line(stream))
            .await
            .map_err(|_| Error::authentication("timed out waiting for the auth challenge"))??;

        let reply = signer.sign_challenge(&challenge);
        stream.write_all(&reply).await?;
        Ok(())
    }
}

async fn read_challenge_line(stream: &mut Stream) -> Result<Vec<u8>> {
    let mut challenge = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte).await?;
        if n == 0 {
            return Err(Error::authentication(
                "connection closed before sending an auth challenge",
            ));
        }
        if byte[0] == b'\n' {
            break;
        }
        challenge.push(byte[0]);
    }
    Ok(challenge)
}

#[async_trait]
impl super::Transport for SocketTransport {
    async fn flush(&mut self, buffer: &Buffer) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        for i in 0..buffer.chunk_count_to_write() {
            if let Err(e) = self.stream.write_all(buffer.chunk_bytes(i)).await {
                self.healthy = false;
                return Err(e);
            }
        }
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn flush_writes_every_chunk_to_the_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let mut transport = SocketTransport {
            stream: Stream::Plain(TcpStream::connect(addr).await.unwrap()),
            healthy: true,
        };

        let mut buffer = Buffer::new(8, 1 << 16, 127);
        buffer.table("weather").unwrap();
        buffer.at_now().unwrap();
        let expected = buffer.to_vec();

        transport.flush(&buffer).await.unwrap();
        drop(transport);

        let received = server.await.unwrap();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn connect_rejects_an_undersized_buffer_when_auth_is_configured() {
        use base64::Engine as _;
        use p256::elliptic_curve::rand_core::OsRng;
        use p256::SecretKey;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // no server interaction expected; the check happens before connecting
        drop(listener);

        let secret = SecretKey::random(&mut OsRng);
        let token = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(secret.to_bytes());
        let signer = Signer::new("user", &token).unwrap();

        let address = Address::new(addr.ip().to_string(), addr.port());
        let err = SocketTransport::connect(
            &address,
            None,
            Some(&signer),
            std::time::Duration::from_secs(1),
            256,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidApiCall(_)));
    }
}
