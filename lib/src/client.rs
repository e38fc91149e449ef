use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::WebPkiSupportedAlgorithms;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};

use crate::{Error, HandshakeConfig};

/// Certificate chain and private key presented to servers that request client authentication
#[derive(Debug)]
pub struct ClientAuth {
    cert_chain: Vec<CertificateDer<'static>>,
    private_key: PrivateKeyDer<'static>,
}

impl ClientAuth {
    /// Create from an already loaded chain (end-entity first) and key
    pub fn new(cert_chain: Vec<CertificateDer<'static>>, private_key: PrivateKeyDer<'static>) -> Self {
        Self {
            cert_chain,
            private_key,
        }
    }

    /// Load the chain and key from PEM files. An encrypted PKCS #8 key is expected
    /// when `private_key_password` is provided.
    pub fn from_pem_files(
        cert_chain_path: &Path,
        private_key_path: &Path,
        private_key_password: Option<&str>,
    ) -> Result<Self, Error> {
        let cert_chain = crate::pem::read_certificates(cert_chain_path)?;
        let private_key = crate::pem::read_private_key(private_key_path, private_key_password)?;
        Ok(Self::new(cert_chain, private_key))
    }
}

/// Create a client configuration whose peer identity is checked after the handshake
///
/// The configuration only verifies the handshake signatures made with the peer's key.
/// The peer's certificate chain and identity must be checked once the handshake completes
/// using a [`PeerValidator`](crate::PeerValidator).
pub fn config(
    handshake: &HandshakeConfig,
    client_auth: Option<ClientAuth>,
) -> Result<rustls::ClientConfig, Error> {
    let (provider, versions) = handshake.apply(crate::default_crypto_provider())?;

    let verifier = PostHandshakeVerifier {
        algorithms: provider.signature_verification_algorithms,
    };

    let builder = rustls::ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(versions)
        .map_err(Error::incompatible_parameters)?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier));

    let config = match client_auth {
        Some(auth) => builder.with_client_auth_cert(auth.cert_chain, auth.private_key)?,
        None => builder.with_no_client_auth(),
    };

    Ok(config)
}

#[derive(Debug)]
struct PostHandshakeVerifier {
    algorithms: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for PostHandshakeVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        // the chain and the name are checked by PeerValidator once the handshake completes
        log::debug!(
            "deferring verification of certificate for {:?} with {} intermediate(s)",
            server_name,
            intermediates.len()
        );
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}
