use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::sync::Arc;

use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use sfio_rustls_peer::client::ClientAuth;
use sfio_rustls_peer::{
    client, ChainVerifier, EndpointHint, ErrorKind, HandshakeConfig, PeerValidator,
    RemoteAddress, SelfSignedVerifier, VerificationMode, WebPkiChainVerifier,
};
use tokio_rustls::rustls;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};
use tokio_rustls::{TlsAcceptor, TlsConnector};

struct Identity {
    cert: rcgen::Certificate,
    key: KeyPair,
}

impl Identity {
    fn der(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }

    fn private_key(&self) -> PrivateKeyDer<'static> {
        PrivatePkcs8KeyDer::from(self.key.serialize_der()).into()
    }
}

fn params(common_name: &str, alt_names: &[&str]) -> CertificateParams {
    let mut params =
        CertificateParams::new(alt_names.iter().map(|x| x.to_string()).collect::<Vec<_>>())
            .unwrap();
    params.distinguished_name = rcgen::DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    params
}

fn self_signed(common_name: &str, alt_names: &[&str]) -> Identity {
    let key = KeyPair::generate().unwrap();
    let cert = params(common_name, alt_names).self_signed(&key).unwrap();
    Identity { cert, key }
}

fn expired(common_name: &str) -> Identity {
    let mut params = params(common_name, &[]);
    params.not_before = rcgen::date_time_ymd(2000, 1, 1);
    params.not_after = rcgen::date_time_ymd(2001, 1, 1);
    let key = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();
    Identity { cert, key }
}

fn authority(common_name: &str) -> Identity {
    let mut params = params(common_name, &[]);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let key = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();
    Identity { cert, key }
}

fn issued_by(ca: &Identity, common_name: &str, alt_names: &[&str]) -> Identity {
    let key = KeyPair::generate().unwrap();
    let cert = params(common_name, alt_names)
        .signed_by(&key, &ca.cert, &ca.key)
        .unwrap();
    Identity { cert, key }
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("rustls-peer-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

fn server_config(chain: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> rustls::ServerConfig {
    rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::aws_lc_rs::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(chain, key)
    .unwrap()
}

async fn connect() -> (tokio::net::TcpStream, tokio::net::TcpStream) {
    fn local_host(port: u16) -> SocketAddr {
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, port).into()
    }

    let listener = tokio::net::TcpListener::bind(local_host(0)).await.unwrap();
    let assigned_port = listener.local_addr().unwrap().port();
    let client = tokio::net::TcpStream::connect(local_host(assigned_port))
        .await
        .unwrap();
    let (server, _) = listener.accept().await.unwrap();

    (client, server)
}

type ClientStream = tokio_rustls::client::TlsStream<tokio::net::TcpStream>;

/// Perform a handshake against a server presenting `server` and return the client's stream
async fn handshake(
    client_config: rustls::ClientConfig,
    server_config: rustls::ServerConfig,
    name: &'static str,
) -> ClientStream {
    let (client, server) = connect().await;

    let connector = TlsConnector::from(Arc::new(client_config));
    let acceptor = TlsAcceptor::from(Arc::new(server_config));

    let server_task = tokio::spawn(acceptor.accept(server));

    // only used for SNI, the identity is checked by PeerValidator
    let name: ServerName = name.try_into().unwrap();

    let stream = connector.connect(name, client).await.unwrap();
    let _server = server_task.await.unwrap().unwrap();
    stream
}

async fn handshake_with(server: &Identity, name: &'static str) -> ClientStream {
    let client_config = client::config(&HandshakeConfig::new(), None).unwrap();
    handshake(
        client_config,
        server_config(vec![server.der()], server.private_key()),
        name,
    )
    .await
}

fn remote_of(stream: &ClientStream) -> RemoteAddress {
    stream.get_ref().0.peer_addr().unwrap().into()
}

fn validate(
    validator: &PeerValidator,
    stream: &ClientStream,
    hint: Option<&str>,
) -> Result<(), sfio_rustls_peer::Error> {
    let hint = hint.map(EndpointHint::new);
    validator.validate(stream.get_ref().1, hint.as_ref(), &remote_of(stream))
}

#[tokio::test]
async fn strict_and_default_modes_differ_on_nested_wildcards() {
    let server = self_signed("wildcard", &["*.example.com"]);
    let stream = handshake_with(&server, "a.b.example.com").await;

    let hint = Some("https://a.b.example.com/");
    let err = validate(&PeerValidator::new(VerificationMode::Strict), &stream, hint).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HostnameMismatch);
    assert_eq!(err.host(), Some("a.b.example.com"));

    validate(&PeerValidator::new(VerificationMode::Default), &stream, hint).unwrap();
    validate(
        &PeerValidator::new(VerificationMode::Strict),
        &stream,
        Some("https://a.example.com/"),
    )
    .unwrap();
}

#[tokio::test]
async fn hint_takes_precedence_over_socket_address() {
    let server = self_signed("ignored", &["svc.internal"]);
    let stream = handshake_with(&server, "svc.internal").await;
    let validator = PeerValidator::new(VerificationMode::Strict);

    validate(&validator, &stream, Some("https://svc.internal:8443/path")).unwrap();

    // without a hint the host is the IP of the socket, which is not in the certificate
    let err = validate(&validator, &stream, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HostnameMismatch);
    assert_eq!(err.host(), Some("127.0.0.1"));
}

#[tokio::test]
async fn ip_address_matches_ip_alt_name() {
    let server = self_signed("server", &["127.0.0.1"]);
    let stream = handshake_with(&server, "127.0.0.1").await;

    validate(&PeerValidator::new(VerificationMode::Strict), &stream, None).unwrap();
    validate(
        &PeerValidator::new(VerificationMode::Strict),
        &stream,
        Some("https://127.0.0.1:20000"),
    )
    .unwrap();
}

#[tokio::test]
async fn common_name_is_used_for_matching() {
    let server = self_signed("myserver", &[]);
    let stream = handshake_with(&server, "myserver").await;

    validate(
        &PeerValidator::new(VerificationMode::Strict),
        &stream,
        Some("https://MyServer/"),
    )
    .unwrap();
}

#[tokio::test]
async fn localhost_mode_accepts_loopback_connections() {
    let server = self_signed("other", &["other.example.com"]);
    let stream = handshake_with(&server, "other.example.com").await;

    let err = validate(&PeerValidator::new(VerificationMode::Default), &stream, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HostnameMismatch);

    validate(
        &PeerValidator::new(VerificationMode::DefaultAndLocalhost),
        &stream,
        None,
    )
    .unwrap();
    validate(
        &PeerValidator::new(VerificationMode::DefaultAndLocalhost),
        &stream,
        Some("https://localhost:8443"),
    )
    .unwrap();
}

#[tokio::test]
async fn allow_all_accepts_anything() {
    let server = self_signed("other", &["other.example.com"]);
    let stream = handshake_with(&server, "other.example.com").await;

    validate(
        &PeerValidator::new(VerificationMode::AllowAll),
        &stream,
        Some("https://unrelated.example.org/"),
    )
    .unwrap();
}

#[tokio::test]
async fn malformed_hint_is_reported() {
    let server = self_signed("server", &["svc.internal"]);
    let stream = handshake_with(&server, "svc.internal").await;

    let err = validate(
        &PeerValidator::new(VerificationMode::AllowAll),
        &stream,
        Some("svc.internal"),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedEndpointHint);
    assert_eq!(err.host(), None);
}

#[tokio::test]
async fn authority_verifier_accepts_issued_certificate() {
    let ca = authority("ca");
    let server = issued_by(&ca, "server", &["svc.internal"]);
    let ca_path = temp_file("ca.pem", &ca.cert.pem());

    let chain_verifier: Arc<dyn ChainVerifier> =
        Arc::new(WebPkiChainVerifier::from_pem_file(&ca_path).unwrap());
    let validator = PeerValidator::new(VerificationMode::Strict).with_chain_verifier(chain_verifier);

    let stream = handshake_with(&server, "svc.internal").await;
    validate(&validator, &stream, Some("https://svc.internal/")).unwrap();

    // name is checked before the chain
    let err = validate(&validator, &stream, Some("https://other.internal/")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HostnameMismatch);

    std::fs::remove_file(ca_path).unwrap();
}

#[tokio::test]
async fn authority_verifier_rejects_unknown_issuer() {
    let ca = authority("ca");
    let other_ca = authority("other ca");
    let server = issued_by(&other_ca, "server", &["svc.internal"]);

    let mut roots = rustls::RootCertStore::empty();
    roots.add(ca.der()).unwrap();
    let validator = PeerValidator::new(VerificationMode::Strict)
        .with_chain_verifier(Arc::new(WebPkiChainVerifier::new(roots).unwrap()));

    let stream = handshake_with(&server, "svc.internal").await;
    let err = validate(&validator, &stream, Some("https://svc.internal/")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChainValidationFailure);
    assert_eq!(err.host(), Some("svc.internal"));
}

#[tokio::test]
async fn self_signed_verifier_pins_the_certificate() {
    let server = self_signed("server", &["svc.internal"]);
    let impostor = self_signed("server", &["svc.internal"]);

    let cert_path = temp_file("pinned.pem", &server.cert.pem());
    let validator = PeerValidator::new(VerificationMode::Strict).with_chain_verifier(Arc::new(
        SelfSignedVerifier::from_pem_file(&cert_path).unwrap(),
    ));
    std::fs::remove_file(cert_path).unwrap();

    let stream = handshake_with(&server, "svc.internal").await;
    validate(&validator, &stream, Some("https://svc.internal/")).unwrap();

    let stream = handshake_with(&impostor, "svc.internal").await;
    let err = validate(&validator, &stream, Some("https://svc.internal/")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChainValidationFailure);
}

#[tokio::test]
async fn self_signed_verifier_rejects_expired_certificate() {
    let server = expired("server");
    let validator = PeerValidator::new(VerificationMode::AllowAll)
        .with_chain_verifier(Arc::new(SelfSignedVerifier::create(server.der()).unwrap()));

    let stream = handshake_with(&server, "server").await;
    let err = validate(&validator, &stream, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChainValidationFailure);
    assert_eq!(err.host(), Some("127.0.0.1"));
}

#[tokio::test]
async fn handshake_respects_protocol_and_cipher_restrictions() {
    let server = self_signed("server", &["svc.internal"]);

    let config = client::config(&HandshakeConfig::new().with_protocols(["TLSv1.2"]), None).unwrap();
    let stream = handshake(
        config,
        server_config(vec![server.der()], server.private_key()),
        "svc.internal",
    )
    .await;
    assert_eq!(
        stream.get_ref().1.protocol_version(),
        Some(rustls::ProtocolVersion::TLSv1_2)
    );

    let config = client::config(
        &HandshakeConfig::new().with_cipher_suites(["TLS_AES_256_GCM_SHA384"]),
        None,
    )
    .unwrap();
    let stream = handshake(
        config,
        server_config(vec![server.der()], server.private_key()),
        "svc.internal",
    )
    .await;
    assert_eq!(
        stream
            .get_ref()
            .1
            .negotiated_cipher_suite()
            .map(|x| x.suite()),
        Some(rustls::CipherSuite::TLS13_AES_256_GCM_SHA384)
    );
}

#[test]
fn unsupported_handshake_parameters_are_rejected() {
    for config in [
        HandshakeConfig::new().with_protocols(["SSLv3"]),
        HandshakeConfig::new().with_protocols(["TLSv1.1", "TLSv1.2"]),
        HandshakeConfig::new().with_cipher_suites(["TLS_RSA_WITH_AES_128_CBC_SHA"]),
        HandshakeConfig::new().with_protocols(Vec::<String>::new()),
    ] {
        let err = client::config(&config, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedHandshakeParameter);
    }
}

#[tokio::test]
async fn client_authenticates_with_certificate_from_files() {
    let ca = authority("ca");
    let server = issued_by(&ca, "server", &["svc.internal"]);
    let client_id = issued_by(&ca, "client", &["client.internal"]);

    let chain_path = temp_file("client.pem", &client_id.cert.pem());
    let key_path = temp_file("client.key", &client_id.key.serialize_pem());
    let auth = ClientAuth::from_pem_files(&chain_path, &key_path, None).unwrap();
    std::fs::remove_file(chain_path).unwrap();
    std::fs::remove_file(key_path).unwrap();

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mut roots = rustls::RootCertStore::empty();
    roots.add(ca.der()).unwrap();
    let client_verifier =
        rustls::server::WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
            .build()
            .unwrap();
    let server_config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_client_cert_verifier(client_verifier)
        .with_single_cert(vec![server.der()], server.private_key())
        .unwrap();

    let config = client::config(&HandshakeConfig::new(), Some(auth)).unwrap();
    let stream = handshake(config, server_config, "svc.internal").await;

    validate(
        &PeerValidator::new(VerificationMode::Strict),
        &stream,
        Some("https://svc.internal/"),
    )
    .unwrap();
}
