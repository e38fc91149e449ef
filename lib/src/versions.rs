/// Specifies which protocol version should be allowed
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProtocolVersions {
    /// Allow TLS 1.2
    v1_2: bool,
    /// Allow TLS 1.3
    v1_3: bool,
}

impl ProtocolVersions {
    /// Construct ProtocolVersions with nothing enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct ProtocolVersions with TLS 1.2 and TLS 1.3 enabled
    pub fn all() -> Self {
        Self::new().enable_v12().enable_v13()
    }

    /// Construct ProtocolVersions with only TLS 1.2 enabled
    pub fn v12_only() -> Self {
        Self::new().enable_v12()
    }

    /// Construct ProtocolVersions with only TLS 1.3 enabled
    pub fn v13_only() -> Self {
        Self::new().enable_v13()
    }

    /// Enable support for TLS 1.2
    pub fn enable_v12(self) -> Self {
        Self { v1_2: true, ..self }
    }

    /// Enable support for TLS 1.3
    pub fn enable_v13(self) -> Self {
        Self { v1_3: true, ..self }
    }

    /// Enable the versions named in `names`, e.g. `["TLSv1.2", "TLSv1.3"]`
    ///
    /// Names are matched case-insensitively. Versions that Rustls does not implement
    /// (`SSLv3`, `TLSv1`, `TLSv1.1`) or unknown names are rejected with
    /// [`ErrorKind::UnsupportedHandshakeParameter`](crate::ErrorKind::UnsupportedHandshakeParameter).
    pub fn from_names<I, S>(names: I) -> Result<Self, crate::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(Self::new(), |versions, name| {
            let name = name.as_ref();
            match name.trim().to_ascii_uppercase().as_str() {
                "TLSV1.2" | "TLS1.2" => Ok(versions.enable_v12()),
                "TLSV1.3" | "TLS1.3" => Ok(versions.enable_v13()),
                _ => Err(crate::Error::unsupported_protocol(name)),
            }
        })
    }

    /// True if no version is enabled
    pub fn is_empty(self) -> bool {
        !(self.v1_2 || self.v1_3)
    }
}

impl ProtocolVersions {
    pub(crate) fn versions(self) -> &'static [&'static rustls::SupportedProtocolVersion] {
        static V12_ONLY: &[&rustls::SupportedProtocolVersion] = &[&rustls::version::TLS12];
        static V13_ONLY: &[&rustls::SupportedProtocolVersion] = &[&rustls::version::TLS13];
        static V12_AND_V13: &[&rustls::SupportedProtocolVersion] =
            &[&rustls::version::TLS12, &rustls::version::TLS13];

        match (self.v1_2, self.v1_3) {
            (false, false) => &[],
            (false, true) => V13_ONLY,
            (true, false) => V12_ONLY,
            (true, true) => V12_AND_V13,
        }
    }
}
