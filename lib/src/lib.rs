#![doc = include_str!("../README.md")]

#[cfg(all(feature = "crypto-ring", feature = "crypto-aws-lc"))]
compile_error!(
    "Features 'crypto-ring' and 'crypto-aws-lc' are mutually exclusive and cannot be enabled together"
);

#[cfg(not(any(feature = "crypto-ring", feature = "crypto-aws-lc")))]
compile_error!("'crypto-ring' OR 'crypto-aws-lc' must be enabled");

#[cfg(feature = "crypto-ring")]
pub(crate) use rustls::crypto::ring::default_provider as default_crypto_provider;

#[cfg(feature = "crypto-aws-lc")]
pub(crate) use rustls::crypto::aws_lc_rs::default_provider as default_crypto_provider;

/// Client configurations
pub mod client;

mod chain;
mod endpoint;
mod error;
mod handshake;
mod hostname;
mod identity;
mod loopback;
mod policy;
mod self_signed;
mod validator;
mod versions;

pub use chain::*;
pub use endpoint::*;
pub use error::*;
pub use handshake::*;
pub use hostname::matches;
pub use identity::*;
pub use loopback::is_localhost;
pub use policy::*;
pub use self_signed::SelfSignedVerifier;
pub use validator::*;
pub use versions::*;

pub(crate) mod pem;
