use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use rustls_pki_types::CertificateDer;
use x509_parser::asn1_rs::Tag;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::{FromDer, X509Certificate};
use x509_parser::x509::AttributeTypeAndValue;

/// An entry of the subject alternative name extension that can identify a host
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubjectAltName {
    /// dNSName entry, possibly a wildcard such as `*.example.com`
    Dns(String),
    /// iPAddress entry
    Ip(IpAddr),
}

/// The names a certificate claims to be valid for
///
/// Only the first common name takes part in host name verification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CertificateIdentities {
    common_names: Vec<String>,
    subject_alt_names: Vec<SubjectAltName>,
}

impl CertificateIdentities {
    /// Construct the identities from already extracted names
    pub fn new(common_names: Vec<String>, subject_alt_names: Vec<SubjectAltName>) -> Self {
        Self {
            common_names,
            subject_alt_names,
        }
    }

    /// Extract the subject common names and the DNS/IP subject alternative names from
    /// a DER-encoded certificate.
    ///
    /// SAN entries of other types (email, URI, ...) are skipped.
    pub fn from_der(cert: &CertificateDer<'_>) -> Result<Self, rustls::Error> {
        let (_, cert) = X509Certificate::from_der(cert.as_ref()).map_err(|err| {
            rustls::Error::General(format!("unable to parse certificate w/ x509-parser: {err}"))
        })?;

        // stop at the first undecodable entry so that a later CN never takes its place
        let common_names = cert
            .subject()
            .iter_common_name()
            .map_while(decode_common_name)
            .collect();

        let mut subject_alt_names = Vec::new();
        if let Ok(Some(ext)) = cert.subject_alternative_name() {
            for name in &ext.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => {
                        subject_alt_names.push(SubjectAltName::Dns(dns.to_string()))
                    }
                    GeneralName::IPAddress(bytes) => {
                        if let Some(ip) = ip_from_octets(bytes) {
                            subject_alt_names.push(SubjectAltName::Ip(ip));
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(Self {
            common_names,
            subject_alt_names,
        })
    }

    /// Common names in the order they appear in the subject, up to the first one that
    /// cannot be decoded
    pub fn common_names(&self) -> &[String] {
        &self.common_names
    }

    /// The common name consulted during verification
    pub fn first_common_name(&self) -> Option<&str> {
        self.common_names.first().map(String::as_str)
    }

    /// Subject alternative names in the order they appear in the extension
    pub fn subject_alt_names(&self) -> &[SubjectAltName] {
        &self.subject_alt_names
    }

    /// True if the certificate declares no common name and no usable SAN entry
    pub fn is_empty(&self) -> bool {
        self.common_names.is_empty() && self.subject_alt_names.is_empty()
    }
}

/// Decode a common name, including the BMPString and UniversalString encodings
fn decode_common_name(cn: &AttributeTypeAndValue<'_>) -> Option<String> {
    if let Ok(x) = cn.as_str() {
        return Some(x.to_string());
    }

    let bytes = cn.as_slice();
    match cn.attr_value().tag() {
        Tag::VisibleString => std::str::from_utf8(bytes).ok().map(str::to_string),
        Tag::BmpString if bytes.len() % 2 == 0 => {
            let units = bytes
                .chunks_exact(2)
                .map(|x| u16::from_be_bytes([x[0], x[1]]));
            char::decode_utf16(units).collect::<Result<String, _>>().ok()
        }
        Tag::UniversalString if bytes.len() % 4 == 0 => bytes
            .chunks_exact(4)
            .map(|x| char::from_u32(u32::from_be_bytes([x[0], x[1], x[2], x[3]])))
            .collect(),
        _ => None,
    }
}

fn ip_from_octets(bytes: &[u8]) -> Option<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Some(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        return Some(IpAddr::V6(Ipv6Addr::from(octets)));
    }
    None
}
