//! JWT OAuth application: config file loading and signed assertions for the token exchange.
//!
//! The assertion is an RS256 JWT whose `kid` is the app's public key id, issued by the client id
//! and addressed to the API host.

use crate::config::AGENT_API_BASE;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::Deserialize;
use sha2::Sha256;
use std::path::{Path, PathBuf};

/// Lifetime of a signed assertion, in seconds.
const ASSERTION_TTL_SECS: i64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("reading oauth config from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing oauth config from {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unsupported oauth client type {0:?} (expected \"jwt\")")]
    UnsupportedClientType(String),
    #[error("invalid oauth config: {0}")]
    Invalid(String),
    #[error("invalid private key: {0}")]
    PrivateKey(String),
    #[error("signing assertion: {0}")]
    Sign(String),
}

/// OAuth app file as exported by the agent platform.
#[derive(Clone, Deserialize)]
pub struct OAuthAppConfig {
    pub client_type: String,
    pub client_id: String,
    pub public_key_id: String,
    /// PEM-encoded RSA private key (PKCS#8 or PKCS#1).
    pub private_key: String,
    #[serde(default)]
    pub coze_api_base: Option<String>,
    #[serde(default)]
    pub coze_www_base: Option<String>,
}

impl std::fmt::Debug for OAuthAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthAppConfig")
            .field("client_type", &self.client_type)
            .field("client_id", &self.client_id)
            .field("public_key_id", &self.public_key_id)
            .field("private_key", &"[REDACTED]")
            .field("coze_api_base", &self.coze_api_base)
            .field("coze_www_base", &self.coze_www_base)
            .finish()
    }
}

/// Read and parse the OAuth app file.
pub fn load_oauth_config(path: &Path) -> Result<OAuthAppConfig, AuthError> {
    let s = std::fs::read_to_string(path).map_err(|source| AuthError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&s).map_err(|source| AuthError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Host part of a base URL, used as the JWT audience.
fn host_of(base_url: &str) -> &str {
    let rest = base_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(base_url);
    rest.split('/').next().unwrap_or(rest)
}

/// Loaded JWT OAuth app, ready to sign assertions.
#[derive(Clone)]
pub struct JwtOAuthApp {
    client_id: String,
    public_key_id: String,
    api_base: String,
    signing_key: SigningKey<Sha256>,
}

impl std::fmt::Debug for JwtOAuthApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtOAuthApp")
            .field("client_id", &self.client_id)
            .field("public_key_id", &self.public_key_id)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl JwtOAuthApp {
    pub fn from_config(config: &OAuthAppConfig) -> Result<Self, AuthError> {
        if !config.client_type.eq_ignore_ascii_case("jwt") {
            return Err(AuthError::UnsupportedClientType(config.client_type.clone()));
        }
        if config.client_id.trim().is_empty() {
            return Err(AuthError::Invalid("client_id is empty".to_string()));
        }
        if config.public_key_id.trim().is_empty() {
            return Err(AuthError::Invalid("public_key_id is empty".to_string()));
        }
        let pem = config.private_key.trim();
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| AuthError::PrivateKey(e.to_string()))?;
        let api_base = config
            .coze_api_base
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(AGENT_API_BASE)
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            client_id: config.client_id.trim().to_string(),
            public_key_id: config.public_key_id.trim().to_string(),
            api_base,
            signing_key: SigningKey::<Sha256>::new(key),
        })
    }

    /// Load and validate the app from a config file.
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        Self::from_config(&load_oauth_config(path)?)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// API base the token endpoint lives under.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Sign an assertion issued at `issued_at` (unix seconds) with the given unique id.
    pub fn build_assertion(&self, issued_at: i64, jti: &str) -> Result<String, AuthError> {
        let header = serde_json::json!({
            "alg": "RS256",
            "typ": "JWT",
            "kid": self.public_key_id,
        });
        let claims = serde_json::json!({
            "iss": self.client_id,
            "aud": host_of(&self.api_base),
            "iat": issued_at,
            "exp": issued_at + ASSERTION_TTL_SECS,
            "jti": jti,
        });
        let header_b64 = URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&header).map_err(|e| AuthError::Sign(e.to_string()))?);
        let claims_b64 = URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&claims).map_err(|e| AuthError::Sign(e.to_string()))?);
        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = self
            .signing_key
            .try_sign(signing_input.as_bytes())
            .map_err(|e| AuthError::Sign(e.to_string()))?;
        let sig_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());
        Ok(format!("{signing_input}.{sig_b64}"))
    }

    /// Assertion issued now with a fresh random id.
    pub fn assertion_now(&self) -> Result<String, AuthError> {
        let jti = uuid::Uuid::new_v4().simple().to_string();
        self.build_assertion(chrono::Utc::now().timestamp(), &jti)
    }
}
