//! Matching of a host name against the identities declared by a certificate.
//!
//! The host must equal either the first common name or one of the subject alternative
//! names. A wildcard may appear as the complete left-most label of any of those names.
//! The only difference between strict and default matching is the depth a wildcard
//! covers: in strict mode `*.example.com` matches `a.example.com` but not
//! `a.b.example.com`, in default mode it matches both.

use std::net::IpAddr;

use crate::identity::{CertificateIdentities, SubjectAltName};

/// Second-level labels under which `*.<label>.<cc>` must never act as a wildcard
const BAD_COUNTRY_2LDS: &[&str] = &[
    "ac", "co", "com", "ed", "edu", "go", "gouv", "gov", "info", "lg", "ne", "net", "or", "org",
];

/// Returns true if `host` matches one of the `identities`.
///
/// Candidates are checked in order: the first common name, then every subject
/// alternative name. IP literal hosts are compared by address against the common name
/// and the iPAddress entries only, and never match a wildcard. DNS hosts are compared
/// against the common name and the dNSName entries. An empty set of identities never
/// matches.
pub fn matches(host: &str, identities: &CertificateIdentities, strict: bool) -> bool {
    if host.is_empty() {
        return false;
    }

    if let Some(addr) = parse_ip_literal(host) {
        let from_cn = identities
            .first_common_name()
            .and_then(parse_ip_literal)
            .into_iter();

        let from_san = identities
            .subject_alt_names()
            .iter()
            .filter_map(|name| match name {
                SubjectAltName::Ip(ip) => Some(*ip),
                SubjectAltName::Dns(_) => None,
            });

        return from_cn.chain(from_san).any(|ip| ip == addr);
    }

    let from_san = identities
        .subject_alt_names()
        .iter()
        .filter_map(|name| match name {
            SubjectAltName::Dns(dns) => Some(dns.as_str()),
            SubjectAltName::Ip(_) => None,
        });

    identities
        .first_common_name()
        .into_iter()
        .chain(from_san)
        .any(|identity| matches_dns_name(host, identity, strict))
}

fn matches_dns_name(host: &str, identity: &str, strict: bool) -> bool {
    match wildcard_suffix(identity) {
        Some(suffix) => matches_wildcard(host, suffix, strict),
        None => host.eq_ignore_ascii_case(identity),
    }
}

/// If `identity` is a usable wildcard (`*.<label>.<label>...`), return the part after `*.`
fn wildcard_suffix(identity: &str) -> Option<&str> {
    let suffix = identity.strip_prefix("*.")?;

    let labels: Vec<&str> = suffix.split('.').collect();

    // at least two labels must follow the wildcard: `*.com` is not a wildcard
    if labels.len() < 2 {
        return None;
    }

    if labels.iter().any(|x| x.is_empty() || x.contains('*')) {
        return None;
    }

    // `*.co.uk` and friends
    if labels.len() == 2
        && labels[1].len() == 2
        && BAD_COUNTRY_2LDS.contains(&labels[0].to_ascii_lowercase().as_str())
    {
        return None;
    }

    Some(suffix)
}

fn matches_wildcard(host: &str, suffix: &str, strict: bool) -> bool {
    // need at least "<label>." in front of the suffix
    if host.len() <= suffix.len() + 1 {
        return false;
    }

    let split = host.len() - suffix.len();
    let (prefix, host_suffix) = match (host.get(..split), host.get(split..)) {
        (Some(prefix), Some(host_suffix)) => (prefix, host_suffix),
        _ => return false,
    };

    if !host_suffix.eq_ignore_ascii_case(suffix) {
        return false;
    }

    let labels = match prefix.strip_suffix('.') {
        Some(x) => x,
        None => return false,
    };

    if labels.split('.').any(str::is_empty) {
        return false;
    }

    !strict || !labels.contains('.')
}

/// Parse `host` as an IPv4 or IPv6 literal
///
/// Surrounding brackets and an IPv6 zone id are ignored.
fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    let host = host
        .strip_prefix('[')
        .and_then(|x| x.strip_suffix(']'))
        .unwrap_or(host);

    let host = match host.split_once('%') {
        Some((addr, _zone)) if addr.contains(':') => addr,
        _ => host,
    };

    host.parse().ok()
}
