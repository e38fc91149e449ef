use rustls::crypto::CryptoProvider;
use rustls::SupportedCipherSuite;

use crate::versions::ProtocolVersions;
use crate::Error;

type Restricted = (
    CryptoProvider,
    &'static [&'static rustls::SupportedProtocolVersion],
);

/// Protocol versions and cipher suites a client may negotiate
///
/// Each list is optional. When absent, the defaults of the TLS implementation are left
/// untouched. When present, the handshake is restricted to exactly the listed entries,
/// and cipher suites are offered in the listed order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandshakeConfig {
    protocols: Option<Vec<String>>,
    cipher_suites: Option<Vec<String>>,
}

impl HandshakeConfig {
    /// Configuration that keeps all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the protocol versions, e.g. `["TLSv1.2", "TLSv1.3"]`
    pub fn with_protocols<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            protocols: Some(names.into_iter().map(Into::into).collect()),
            ..self
        }
    }

    /// Restrict the cipher suites, e.g. `["TLS13_AES_256_GCM_SHA384"]`
    ///
    /// Names are those used by Rustls. The IANA names of the TLS 1.3 suites
    /// (`TLS_AES_256_GCM_SHA384`) are accepted as well.
    pub fn with_cipher_suites<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cipher_suites: Some(names.into_iter().map(Into::into).collect()),
            ..self
        }
    }

    /// Configured protocol names, if any
    pub fn protocols(&self) -> Option<&[String]> {
        self.protocols.as_deref()
    }

    /// Configured cipher suite names, if any
    pub fn cipher_suites(&self) -> Option<&[String]> {
        self.cipher_suites.as_deref()
    }

    /// Restrict `provider` and select the protocol versions according to this configuration
    pub(crate) fn apply(&self, mut provider: CryptoProvider) -> Result<Restricted, Error> {
        let versions = match &self.protocols {
            None => ProtocolVersions::all(),
            Some(names) => {
                let versions = ProtocolVersions::from_names(names)?;
                if versions.is_empty() {
                    return Err(Error::empty_parameter_list("protocol versions"));
                }
                versions
            }
        };

        if let Some(names) = &self.cipher_suites {
            if names.is_empty() {
                return Err(Error::empty_parameter_list("cipher suites"));
            }

            let mut selected: Vec<SupportedCipherSuite> = Vec::with_capacity(names.len());
            for name in names {
                let suite = provider
                    .cipher_suites
                    .iter()
                    .find(|x| cipher_suite_has_name(x, name))
                    .copied()
                    .ok_or_else(|| Error::unsupported_cipher_suite(name))?;

                if !selected.iter().any(|x| x.suite() == suite.suite()) {
                    selected.push(suite);
                }
            }

            log::debug!(
                "restricting cipher suites to: {:?}",
                selected.iter().map(|x| x.suite()).collect::<Vec<_>>()
            );
            provider.cipher_suites = selected;
        }

        Ok((provider, versions.versions()))
    }
}

fn cipher_suite_has_name(suite: &SupportedCipherSuite, name: &str) -> bool {
    let name = name.trim();
    let actual = format!("{:?}", suite.suite());

    if actual.eq_ignore_ascii_case(name) {
        return true;
    }

    // TLS 1.3 suites are registered by IANA without the "13"
    match (actual.strip_prefix("TLS13_"), name.get(..4)) {
        (Some(rest), Some(prefix)) if prefix.eq_ignore_ascii_case("TLS_") => {
            name[4..].eq_ignore_ascii_case(rest)
        }
        _ => false,
    }
}
