//! Credential exchange and token caching

use super::credential::Credential;
use crate::core::{EmitterError, Result};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Tokens this close to expiry are refreshed before use
pub const DEFAULT_REFRESH_SKEW: Duration = Duration::from_secs(30);

const DEFAULT_SIGN_IN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SignInRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Exchanges a username and password for a [`Credential`]
pub struct CredentialProvider {
    client: reqwest::blocking::Client,
    token_url: reqwest::Url,
}

impl CredentialProvider {
    /// Provider posting to `token_url`.
    ///
    /// # Errors
    ///
    /// Returns [`EmitterError::Auth`] when the URL does not parse or the
    /// HTTP client cannot be built.
    pub fn new(token_url: &str) -> Result<Self> {
        Self::with_timeout(token_url, DEFAULT_SIGN_IN_TIMEOUT)
    }

    pub fn with_timeout(token_url: &str, timeout: Duration) -> Result<Self> {
        let token_url = reqwest::Url::parse(token_url)
            .map_err(|e| EmitterError::auth(format!("invalid sign-in URL '{}': {}", token_url, e), None))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmitterError::auth(format!("failed to build HTTP client: {}", e), None))?;

        Ok(Self { client, token_url })
    }

    pub fn token_url(&self) -> &str {
        self.token_url.as_str()
    }

    /// Perform the sign-in exchange.
    ///
    /// # Errors
    ///
    /// Returns [`EmitterError::Auth`] when the request fails, the server
    /// answers with a non-success status, or the body is not a credential.
    pub fn sign_in(&self, username: &str, password: &str) -> Result<Credential> {
        let response = self
            .client
            .post(self.token_url.clone())
            .json(&SignInRequest { username, password })
            .send()
            .map_err(|e| {
                EmitterError::auth(format!("sign-in request to {} failed: {}", self.token_url, e), None)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmitterError::auth(
                format!("sign-in rejected with HTTP {}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let body = response
            .text()
            .map_err(|e| EmitterError::auth(format!("failed to read sign-in response: {}", e), Some(status.as_u16())))?;
        serde_json::from_str(&body).map_err(|e| {
            EmitterError::auth(format!("unparseable sign-in response: {}", e), Some(status.as_u16()))
        })
    }
}

impl fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("token_url", &self.token_url.as_str())
            .finish()
    }
}

/// Signs in once and re-signs only when the cached token is about to expire.
///
/// The cache is guarded by a mutex held across the exchange, so concurrent
/// callers never trigger more than one sign-in.
pub struct Authenticator {
    provider: CredentialProvider,
    username: String,
    password: String,
    cached: Mutex<Option<Credential>>,
    refresh_skew: Duration,
}

impl Authenticator {
    pub fn new(
        provider: CredentialProvider,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            username: username.into(),
            password: password.into(),
            cached: Mutex::new(None),
            refresh_skew: DEFAULT_REFRESH_SKEW,
        }
    }

    #[must_use]
    pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
        self.refresh_skew = skew;
        self
    }

    /// A valid access token, signing in first when needed.
    ///
    /// # Errors
    ///
    /// Propagates [`EmitterError::Auth`] from the exchange; the cache is
    /// left empty so the next call retries.
    pub fn access_token(&self) -> Result<String> {
        self.credential().map(|c| c.access_token().to_string())
    }

    /// Like [`access_token`](Self::access_token), keeping the expiry
    pub fn credential(&self) -> Result<Credential> {
        let mut cached = self.cached.lock();
        if let Some(ref credential) = *cached {
            if !credential.expires_within(self.refresh_skew, Utc::now()) {
                return Ok(credential.clone());
            }
        }

        *cached = None;
        let credential = self.provider.sign_in(&self.username, &self.password)?;
        *cached = Some(credential.clone());
        Ok(credential)
    }

    /// The cached credential, if any
    pub fn cached(&self) -> Option<Credential> {
        self.cached.lock().clone()
    }

    /// Forget the cached credential so the next call signs in again
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("provider", &self.provider)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("refresh_skew", &self.refresh_skew)
            .finish()
    }
}
