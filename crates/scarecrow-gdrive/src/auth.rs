//! Service-account authentication for the Google Drive API
//!
//! A service account authenticates by signing a short-lived JWT with its
//! private key (RS256) and exchanging it at the key's token endpoint for a
//! bearer access token (RFC 7523 JWT bearer grant).
//!
//! ## Components
//!
//! - [`ServiceAccountKey`] - The downloaded key JSON
//! - [`AccessTokenSource`] - Anything that can hand out a bearer token
//! - [`StaticToken`] - Fixed token, for tests and pre-issued tokens
//! - [`ServiceAccountAuth`] - Signs, exchanges and caches tokens

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::DriveError;

/// Default OAuth2 token endpoint
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Full read/write access to Drive files
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Grant type of the JWT bearer token exchange
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion (the maximum Google accepts)
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are replaced this long before they expire
const REFRESH_MARGIN_SECS: i64 = 300;

// ============================================================================
// ServiceAccountKey
// ============================================================================

/// Service-account key as downloaded from the Google Cloud console
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Account identity, used as the JWT issuer
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: String,
    /// Identifier of the private key, sent as the JWT `kid`
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// Token endpoint, also the JWT audience
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Loads a key file
    ///
    /// # Errors
    /// Returns [`DriveError::Auth`] if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, DriveError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DriveError::Auth(format!(
                "Failed to read service account file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parses key JSON
    ///
    /// # Errors
    /// Returns [`DriveError::Auth`] if required fields are missing
    pub fn from_json(content: &str) -> Result<Self, DriveError> {
        serde_json::from_str(content)
            .map_err(|e| DriveError::Auth(format!("Invalid service account key: {e}")))
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// AccessTokenSource
// ============================================================================

/// Source of bearer tokens for API requests
#[async_trait::async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Returns a token valid for at least the next few minutes
    async fn access_token(&self) -> Result<String, DriveError>;
}

/// A fixed bearer token
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait::async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, DriveError> {
        Ok(self.0.clone())
    }
}

// ============================================================================
// ServiceAccountAuth
// ============================================================================

/// JWT claims of a service-account assertion
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// An access token and the instant it stops being valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Returns true if the token expires within the refresh margin of `now`
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) <= now
    }
}

/// Token source backed by a service-account key
///
/// Tokens are cached and exchanged again once they are within five minutes
/// of expiry.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Creates a token source for `key` with the full Drive scope
    ///
    /// # Errors
    /// Returns [`DriveError::Auth`] if the private key is not a valid RSA PEM
    pub fn new(key: ServiceAccountKey) -> Result<Self, DriveError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| DriveError::Auth(format!("Invalid private key: {e}")))?;
        Ok(Self {
            key,
            encoding_key,
            scope: DRIVE_SCOPE.to_string(),
            http: Client::new(),
            cached: Mutex::new(None),
        })
    }

    /// Loads the key file at `path` and creates a token source for it
    pub fn from_file(path: &Path) -> Result<Self, DriveError> {
        Self::new(ServiceAccountKey::load(path)?)
    }

    /// Requests `scope` instead of the full Drive scope
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// The service account's e-mail address
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Signs an assertion issued at `now`
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String, DriveError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| DriveError::Auth(format!("Failed to sign assertion: {e}")))
    }

    /// Exchanges a fresh assertion for an access token
    async fn exchange(&self) -> Result<CachedToken, DriveError> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;
        debug!(token_uri = %self.key.token_uri, "Exchanging service account assertion");

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| DriveError::Auth(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            return Err(DriveError::Auth(format!(
                "Token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DriveError::Auth(format!("Invalid token response: {e}")))?;
        info!(
            account = %self.key.client_email,
            expires_in = token.expires_in,
            "Obtained access token"
        );
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

#[async_trait::async_trait]
impl AccessTokenSource for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String, DriveError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.needs_refresh(Utc::now()) {
                return Ok(token.access_token.clone());
            }
        }
        let token = self.exchange().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}

impl std::fmt::Debug for ServiceAccountAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountAuth")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
