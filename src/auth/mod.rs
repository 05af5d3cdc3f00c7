//! Bearer-token authentication for the collector

pub mod credential;
pub mod provider;

pub use credential::Credential;
pub use provider::{Authenticator, CredentialProvider, DEFAULT_REFRESH_SKEW};
