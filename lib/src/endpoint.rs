use std::net::SocketAddr;

/// Logical URL of the endpoint a connection is made for, e.g. `https://svc.internal:8443/path`
///
/// When present, the host of this URL is the host the peer's certificate is verified
/// against, regardless of the address the socket is actually connected to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointHint(String);

impl EndpointHint {
    /// Record the URL of the endpoint
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self(url.into())
    }

    /// The URL as provided
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn host(&self) -> Result<String, crate::Error> {
        let url = url::Url::parse(&self.0)
            .map_err(|err| crate::Error::malformed_endpoint_hint(&self.0, err))?;

        match url.host() {
            Some(url::Host::Domain(name)) => Ok(name.to_string()),
            Some(url::Host::Ipv4(addr)) => Ok(addr.to_string()),
            Some(url::Host::Ipv6(addr)) => Ok(addr.to_string()),
            None => Err(crate::Error::endpoint_hint_without_host(&self.0)),
        }
    }
}

impl From<&str> for EndpointHint {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for EndpointHint {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// Transport level address of the peer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteAddress {
    /// IP socket address
    Inet(SocketAddr),
    /// Host name and port the transport was asked to connect to
    Named {
        /// Host name
        host: String,
        /// Port
        port: u16,
    },
    /// Any other kind of address (e.g. a local socket), in its display form
    Other(String),
}

impl RemoteAddress {
    /// The host part of this address
    ///
    /// No name resolution is performed: a socket address yields its IP literal and
    /// [`RemoteAddress::Other`] yields its display form.
    pub fn host(&self) -> String {
        match self {
            Self::Inet(addr) => addr.ip().to_string(),
            Self::Named { host, .. } => host.clone(),
            Self::Other(name) => name.clone(),
        }
    }
}

impl From<SocketAddr> for RemoteAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::Inet(addr)
    }
}

impl std::fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Inet(addr) => write!(f, "{addr}"),
            Self::Named { host, port } => write!(f, "{host}:{port}"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Determine the host the caller intended to reach
///
/// A non-empty `hint` always takes precedence over the `remote` address. A hint that
/// is not a URL, or a URL without a host, is an error of kind
/// [`ErrorKind::MalformedEndpointHint`](crate::ErrorKind::MalformedEndpointHint).
pub fn resolve_intended_host(
    hint: Option<&EndpointHint>,
    remote: &RemoteAddress,
) -> Result<String, crate::Error> {
    match hint {
        Some(hint) if !hint.as_str().is_empty() => hint.host(),
        _ => Ok(remote.host()),
    }
}
