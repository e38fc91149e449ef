use std::sync::Arc;

use rustls_pki_types::{CertificateDer, UnixTime};

use crate::chain::ChainVerifier;
use crate::endpoint::{resolve_intended_host, EndpointHint, RemoteAddress};
use crate::identity::CertificateIdentities;
use crate::policy::VerificationMode;
use crate::Error;

/// Source of the certificate chain presented by the peer during a completed handshake
pub trait PeerSession {
    /// The peer's chain, end-entity certificate first, if the peer presented one
    fn peer_chain(&self) -> Option<&[CertificateDer<'static>]>;
}

impl PeerSession for rustls::ClientConnection {
    fn peer_chain(&self) -> Option<&[CertificateDer<'static>]> {
        self.peer_certificates()
    }
}

impl PeerSession for [CertificateDer<'static>] {
    fn peer_chain(&self) -> Option<&[CertificateDer<'static>]> {
        Some(self)
    }
}

/// Decides whether a completed TLS session reached the host the caller intended
///
/// The validator is immutable once built and can be shared between connections.
#[derive(Clone, Debug, Default)]
pub struct PeerValidator {
    mode: VerificationMode,
    chain_verifier: Option<Arc<dyn ChainVerifier>>,
}

impl PeerValidator {
    /// Validator using `mode` for name checks, without chain validation
    pub fn new(mode: VerificationMode) -> Self {
        Self {
            mode,
            chain_verifier: None,
        }
    }

    /// Also validate the peer's chain once the name has been accepted
    pub fn with_chain_verifier(self, chain_verifier: Arc<dyn ChainVerifier>) -> Self {
        Self {
            chain_verifier: Some(chain_verifier),
            ..self
        }
    }

    /// The name verification mode
    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    /// Validate `session` against the host taken from `hint`, or from `remote` if
    /// there is no hint
    pub fn validate<S>(
        &self,
        session: &S,
        hint: Option<&EndpointHint>,
        remote: &RemoteAddress,
    ) -> Result<(), Error>
    where
        S: PeerSession + ?Sized,
    {
        self.validate_at(session, hint, remote, UnixTime::now())
    }

    /// Same as [`PeerValidator::validate`] with the chain checked at time `now`
    pub fn validate_at<S>(
        &self,
        session: &S,
        hint: Option<&EndpointHint>,
        remote: &RemoteAddress,
        now: UnixTime,
    ) -> Result<(), Error>
    where
        S: PeerSession + ?Sized,
    {
        let host = resolve_intended_host(hint, remote)?;

        let (end_entity, intermediates) = match session.peer_chain() {
            Some([end_entity, intermediates @ ..]) => (end_entity, intermediates),
            _ => return Err(Error::no_peer_certificate(&host)),
        };

        let identities = match CertificateIdentities::from_der(end_entity) {
            Ok(x) => x,
            Err(err) => {
                log::warn!("unable to parse peer certificate for {host}: {err}");
                CertificateIdentities::default()
            }
        };

        if let Err(err) = self.mode.evaluate(&host, &identities) {
            log::warn!(
                "{err} (mode: {:?}, common names: {:?}, alt names: {:?})",
                self.mode,
                identities.common_names(),
                identities.subject_alt_names()
            );
            return Err(err);
        }

        match &self.chain_verifier {
            Some(verifier) => verifier
                .verify_chain(end_entity, intermediates, now)
                .map_err(|err| {
                    log::warn!("certificate chain of {host} rejected: {err}");
                    Error::chain_validation(&host, err)
                })?,
            None => log::debug!("no chain verifier configured, skipping chain validation for {host}"),
        }

        log::debug!("peer certificate accepted for {host} (remote: {remote})");
        Ok(())
    }
}
