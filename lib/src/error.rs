use rustls::client::VerifierBuilderError;

/// Opaque error type used by the library that implements [`std::error::Error`].
///
/// Use [`Error::kind`] to decide how to react to a failure and [`Error::host`] to
/// retrieve the host name that was being verified, if any.
#[derive(Debug)]
pub struct Error {
    details: Details,
}

/// Broad classification of an [`Error`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The endpoint hint recorded on the connection is not a URL with a host
    MalformedEndpointHint,
    /// No identity in the peer certificate matches the intended host
    HostnameMismatch,
    /// The chain verifier rejected the peer's certificate chain
    ChainValidationFailure,
    /// A configured protocol version or cipher suite is not supported by the TLS engine
    UnsupportedHandshakeParameter,
    /// The session completed without the peer presenting a certificate
    NoPeerCertificate,
    /// Error loading or building configuration (files, PEM, certificates)
    Configuration,
}

impl Error {
    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match &self.details {
            Details::MalformedEndpointHint { .. } | Details::EndpointHintWithoutHost { .. } => {
                ErrorKind::MalformedEndpointHint
            }
            Details::HostnameMismatch { .. } => ErrorKind::HostnameMismatch,
            Details::ChainValidation { .. } => ErrorKind::ChainValidationFailure,
            Details::UnsupportedProtocol(_)
            | Details::UnsupportedCipherSuite(_)
            | Details::EmptyParameterList(_)
            | Details::IncompatibleParameters(_) => ErrorKind::UnsupportedHandshakeParameter,
            Details::NoPeerCertificate { .. } => ErrorKind::NoPeerCertificate,
            Details::Io(_)
            | Details::Pem(_)
            | Details::X509(_)
            | Details::Tls(_)
            | Details::BuilderError(_) => ErrorKind::Configuration,
        }
    }

    /// The host that was being verified when the error occurred
    pub fn host(&self) -> Option<&str> {
        match &self.details {
            Details::HostnameMismatch { host }
            | Details::ChainValidation { host, .. }
            | Details::NoPeerCertificate { host } => Some(host.as_str()),
            _ => None,
        }
    }

    fn new(details: Details) -> Self {
        Self { details }
    }

    pub(crate) fn hostname_mismatch(host: &str) -> Self {
        Self::new(Details::HostnameMismatch {
            host: host.to_string(),
        })
    }

    pub(crate) fn chain_validation(host: &str, err: rustls::Error) -> Self {
        Self::new(Details::ChainValidation {
            host: host.to_string(),
            err,
        })
    }

    pub(crate) fn no_peer_certificate(host: &str) -> Self {
        Self::new(Details::NoPeerCertificate {
            host: host.to_string(),
        })
    }

    pub(crate) fn malformed_endpoint_hint(hint: &str, err: url::ParseError) -> Self {
        Self::new(Details::MalformedEndpointHint {
            hint: hint.to_string(),
            err,
        })
    }

    pub(crate) fn endpoint_hint_without_host(hint: &str) -> Self {
        Self::new(Details::EndpointHintWithoutHost {
            hint: hint.to_string(),
        })
    }

    pub(crate) fn unsupported_protocol(name: &str) -> Self {
        Self::new(Details::UnsupportedProtocol(name.to_string()))
    }

    pub(crate) fn unsupported_cipher_suite(name: &str) -> Self {
        Self::new(Details::UnsupportedCipherSuite(name.to_string()))
    }

    pub(crate) fn empty_parameter_list(what: &'static str) -> Self {
        Self::new(Details::EmptyParameterList(what))
    }

    pub(crate) fn incompatible_parameters(err: rustls::Error) -> Self {
        Self::new(Details::IncompatibleParameters(err))
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.details {
            Details::Io(err) => Some(err),
            Details::Pem(err) => Some(err),
            Details::Tls(err) => Some(err),
            Details::BuilderError(err) => Some(err),
            Details::MalformedEndpointHint { err, .. } => Some(err),
            Details::ChainValidation { err, .. } => Some(err),
            Details::IncompatibleParameters(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self {
            details: Details::Io(err),
        }
    }
}

impl From<crate::pem::Error> for Error {
    fn from(err: crate::pem::Error) -> Self {
        Self {
            details: Details::Pem(err),
        }
    }
}

impl From<rx509::der::ASNError> for Error {
    fn from(err: rx509::der::ASNError) -> Self {
        Self {
            details: Details::X509(err),
        }
    }
}

impl From<rustls::Error> for Error {
    fn from(err: rustls::Error) -> Self {
        Self {
            details: Details::Tls(err),
        }
    }
}

impl From<VerifierBuilderError> for Error {
    fn from(err: VerifierBuilderError) -> Self {
        Self {
            details: Details::BuilderError(err),
        }
    }
}

#[derive(Debug)]
enum Details {
    /// Error reading PEM data from file
    Io(std::io::Error),
    /// Bad PEM file
    Pem(crate::pem::Error),
    /// RX509 error decoding certificate
    X509(rx509::der::ASNError),
    /// Error returned by Rustls
    Tls(rustls::Error),
    /// Error building a certificate verifier
    BuilderError(VerifierBuilderError),
    /// Endpoint hint could not be parsed as a URL
    MalformedEndpointHint { hint: String, err: url::ParseError },
    /// Endpoint hint is a URL, but has no host component
    EndpointHintWithoutHost { hint: String },
    /// Certificate identities do not match the host
    HostnameMismatch { host: String },
    /// Chain verifier rejected the peer's chain
    ChainValidation { host: String, err: rustls::Error },
    /// Peer did not present a certificate
    NoPeerCertificate { host: String },
    /// Protocol version name not supported by rustls
    UnsupportedProtocol(String),
    /// Cipher suite name not offered by the crypto provider
    UnsupportedCipherSuite(String),
    /// An explicit list of protocols or cipher suites was empty
    EmptyParameterList(&'static str),
    /// Rustls rejected the combination of protocol versions and cipher suites
    IncompatibleParameters(rustls::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.details {
            Details::Io(err) => write!(f, "I/O error: {err}"),
            Details::Pem(err) => write!(f, "PEM error: {err}"),
            Details::X509(err) => write!(f, "RX509 error: {err}"),
            Details::Tls(err) => write!(f, "Rustls error: {err}"),
            Details::BuilderError(err) => write!(f, "Error building certificate verifier: {err}"),
            Details::MalformedEndpointHint { hint, err } => {
                write!(f, "invalid endpoint URL '{hint}': {err}")
            }
            Details::EndpointHintWithoutHost { hint } => {
                write!(f, "endpoint URL '{hint}' does not contain a host")
            }
            Details::HostnameMismatch { host } => {
                write!(f, "host name verification failed for host: {host}")
            }
            Details::ChainValidation { host, err } => {
                write!(f, "certificate chain validation failed for host: {host}: {err}")
            }
            Details::NoPeerCertificate { host } => {
                write!(f, "peer did not present a certificate for host: {host}")
            }
            Details::UnsupportedProtocol(name) => {
                write!(f, "unsupported TLS protocol version: {name}")
            }
            Details::UnsupportedCipherSuite(name) => {
                write!(f, "unsupported cipher suite: {name}")
            }
            Details::EmptyParameterList(what) => write!(f, "empty list of {what} configured"),
            Details::IncompatibleParameters(err) => {
                write!(f, "protocol versions and cipher suites are incompatible: {err}")
            }
        }
    }
}
