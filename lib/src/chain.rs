use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::ServerCertVerifier;
use rustls::client::WebPkiServerVerifier;
use rustls::{CertificateError, RootCertStore};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};

use crate::Error;

/// Checks the validity of a peer's certificate chain (signatures, expiry, issuer)
///
/// The chain verifier is only invoked after the host name of the peer has been
/// verified, so implementations should not perform any name checks.
pub trait ChainVerifier: std::fmt::Debug + Send + Sync {
    /// Verify the chain consisting of `end_entity` followed by `intermediates` at time `now`
    fn verify_chain(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<(), rustls::Error>;
}

/// Chain verifier that builds a path to one of a set of trust anchors using webpki
///
/// Any revocation lists configured in the rustls verifier are honored.
#[derive(Debug)]
pub struct WebPkiChainVerifier {
    inner: Arc<WebPkiServerVerifier>,
    placeholder: ServerName<'static>,
}

impl WebPkiChainVerifier {
    /// Create the verifier from a store of trust anchors
    pub fn new(roots: RootCertStore) -> Result<Self, Error> {
        let inner = WebPkiServerVerifier::builder_with_provider(
            Arc::new(roots),
            Arc::new(crate::default_crypto_provider()),
        )
        .build()?;

        Ok(Self::with_verifier(inner))
    }

    /// Create the verifier from a PEM file containing one or more CA certificates
    pub fn from_pem_file(ca_cert_path: &Path) -> Result<Self, Error> {
        let mut roots = RootCertStore::empty();
        for cert in crate::pem::read_certificates(ca_cert_path)? {
            roots.add(cert)?;
        }
        Self::new(roots)
    }

    /// Wrap a pre-configured rustls verifier, e.g. one built with revocation lists
    pub fn with_verifier(inner: Arc<WebPkiServerVerifier>) -> Self {
        Self {
            inner,
            placeholder: ServerName::from(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        }
    }
}

impl ChainVerifier for WebPkiChainVerifier {
    fn verify_chain(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<(), rustls::Error> {
        let res =
            self.inner
                .verify_server_cert(end_entity, intermediates, &self.placeholder, &[], now);

        match res {
            Ok(_) => Ok(()),
            // Name verification is the LAST step inside WebPkiServerVerifier so we can safely trap it and then
            // just ignore this error
            Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. },
            )) => Ok(()),
            Err(err) => Err(err),
        }
    }
}
