//! Agent-service authentication: JWT OAuth app and the process-wide access credential.

mod credential;
mod oauth;

pub use credential::{AccessCredential, AccessToken, CredentialError, CredentialManager};
pub use oauth::{load_oauth_config, AuthError, JwtOAuthApp, OAuthAppConfig};
