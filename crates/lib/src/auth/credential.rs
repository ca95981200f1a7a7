//! Access credential lifecycle.
//!
//! The OAuth app is loaded lazily on first use and kept for the life of the manager. Every call
//! to [`CredentialManager::ensure_valid_token`] performs a fresh exchange and replaces the stored
//! credential; nothing tracks expiry.

use crate::agent::{AgentError, AgentService};
use crate::auth::oauth::{AuthError, JwtOAuthApp};
use std::path::PathBuf;

/// Short-lived bearer token for the agent service.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Current credential and the app (client id) it was issued from.
#[derive(Debug, Clone)]
pub struct AccessCredential {
    pub token: AccessToken,
    pub issued_from: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Configuration missing or invalid; the relay cannot run without it.
    #[error("oauth configuration: {0}")]
    Config(#[from] AuthError),
    #[error("token exchange failed: {0}")]
    Exchange(#[from] AgentError),
}

/// Owns the OAuth app and the current access credential.
#[derive(Debug)]
pub struct CredentialManager {
    config_path: PathBuf,
    app: Option<JwtOAuthApp>,
    current: Option<AccessCredential>,
}

impl CredentialManager {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            app: None,
            current: None,
        }
    }

    /// Manager with an already-loaded app; the config file is never read.
    pub fn with_app(app: JwtOAuthApp) -> Self {
        Self {
            config_path: PathBuf::new(),
            app: Some(app),
            current: None,
        }
    }

    /// Load the OAuth app on first call; later calls reuse it.
    pub fn app(&mut self) -> Result<&JwtOAuthApp, AuthError> {
        match self.app {
            Some(ref app) => Ok(app),
            None => {
                log::info!("loading oauth config from {}", self.config_path.display());
                let app = JwtOAuthApp::load(&self.config_path)?;
                Ok(self.app.insert(app))
            }
        }
    }

    /// Exchange the app for a fresh access token and store it.
    pub async fn ensure_valid_token(
        &mut self,
        service: &dyn AgentService,
    ) -> Result<&AccessCredential, CredentialError> {
        let app = self.app()?;
        let token = service.exchange_credential(app).await?;
        let credential = AccessCredential {
            token,
            issued_from: app.client_id().to_string(),
        };
        log::info!("obtained new access token for app {}", credential.issued_from);
        Ok(self.current.insert(credential))
    }
}
