//! # Authentication
//!
//! Credentials used to call the gateway on behalf of the server.

pub mod credentials;
pub mod secret;

pub use credentials::{
    CredentialError, CredentialProvider, IssuedToken, ServiceAccountTokenSource,
    StaticTokenSource, TokenSource, CLOUD_PLATFORM_SCOPE,
};
pub use secret::SecretString;
