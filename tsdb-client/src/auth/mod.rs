//! Credentials and request signing.

mod credentials;
mod signer;

pub use credentials::{Credentials, SecureString};
pub use signer::{
    format_iso8601, BceV1Signer, SignOptions, Signer, BCE_AUTH_VERSION, DEFAULT_EXPIRE_SECONDS,
    DEFAULT_HEADERS_TO_SIGN,
};
