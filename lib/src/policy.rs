use crate::identity::CertificateIdentities;

/// Specifies how the server's name is checked against the identities in its certificate
///
/// The mode is chosen once for a [`PeerValidator`](crate::PeerValidator) and applies to
/// every connection it validates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum VerificationMode {
    /// The host must match the first common name or a subject alternative name. A
    /// wildcard such as `*.foo.com` only matches names one level down, e.g. `a.foo.com`
    /// but not `a.b.foo.com`.
    Strict,
    /// Same as [`VerificationMode::Strict`] except that a wildcard matches all
    /// subdomains, including `a.b.foo.com`
    #[default]
    Default,
    /// Same as [`VerificationMode::Default`], but a host of `localhost`,
    /// `localhost.localdomain`, `127.0.0.1` or `::1` always passes, no matter what
    /// is in the certificate
    DefaultAndLocalhost,
    /// DANGER: Don't perform any name verification
    AllowAll,
}

impl VerificationMode {
    /// Check that `host` is acceptable for a certificate declaring `identities`
    ///
    /// On failure the returned error has kind
    /// [`ErrorKind::HostnameMismatch`](crate::ErrorKind::HostnameMismatch) and carries `host`.
    pub fn evaluate(
        self,
        host: &str,
        identities: &CertificateIdentities,
    ) -> Result<(), crate::Error> {
        let accepted = match self {
            Self::Strict => crate::hostname::matches(host, identities, true),
            Self::Default => crate::hostname::matches(host, identities, false),
            Self::DefaultAndLocalhost => {
                crate::loopback::is_localhost(host)
                    || crate::hostname::matches(host, identities, false)
            }
            Self::AllowAll => true,
        };

        if accepted {
            Ok(())
        } else {
            Err(crate::Error::hostname_mismatch(host))
        }
    }
}
