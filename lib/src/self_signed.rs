use std::path::Path;

use rustls::{CertificateError, Error};
use rustls_pki_types::{CertificateDer, UnixTime};

use crate::chain::ChainVerifier;

/// Chain verifier that accepts exactly one pre-shared peer certificate
#[derive(Debug)]
pub struct SelfSignedVerifier {
    /// expected certificate
    expected_peer_cert: CertificateDer<'static>,
    /// pre-parsed validity
    validity: rx509::x509::Validity,
}

impl SelfSignedVerifier {
    /// Create a verifier specifying the expected peer certificate.
    ///
    /// This method performs a light parsing of the certificate using [rx509](https://crates.io/crates/rx509)
    /// to extract the Validity (not before, not after) time interval for the certificate so that
    /// can be later used during validation. An error is returned if the certificate cannot be parsed.
    pub fn create(expected: CertificateDer<'static>) -> Result<Self, crate::Error> {
        let parsed = rx509::x509::Certificate::parse(expected.as_ref())?;

        let validity = parsed.tbs_certificate.value.validity;

        Ok(Self {
            expected_peer_cert: expected,
            validity,
        })
    }

    /// Create a verifier from a PEM file containing exactly one certificate
    pub fn from_pem_file(peer_cert_path: &Path) -> Result<Self, crate::Error> {
        let cert = crate::pem::read_one_cert(peer_cert_path)?;
        Self::create(cert)
    }
}

impl ChainVerifier for SelfSignedVerifier {
    fn verify_chain(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<(), Error> {
        // Check that no intermediate certificates are present
        if !intermediates.is_empty() {
            let msg = format!(
                "peer sent {} intermediate certificates, expected none",
                intermediates.len()
            );
            return Err(Error::General(msg));
        }

        // Check that presented certificate matches byte-for-byte the expected certificate
        if end_entity.as_ref() != self.expected_peer_cert.as_ref() {
            return Err(Error::InvalidCertificate(CertificateError::UnknownIssuer));
        }

        let now = rx509::der::UtcTime::from_seconds_since_epoch(now.as_secs());

        if !self.validity.is_valid(now) {
            return Err(Error::InvalidCertificate(CertificateError::Expired));
        }

        Ok(())
    }
}
