//! Bearer-token acquisition for gateway calls.
//!
//! A [`CredentialProvider`] owns one [`TokenSource`] and caches the last token
//! until it is about to expire. Refresh happens at most once per call and is
//! never retried here.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};
use yup_oauth2::authenticator::DefaultAuthenticator;

use crate::auth::SecretString;
use crate::config::Settings;
use crate::errors::{AppError, Result};

/// OAuth scope granting access to the Apigee management API.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Failed to read service account key: {0}")]
    KeyFile(#[from] std::io::Error),

    #[error("OAuth token request failed: {0}")]
    OAuth(#[from] yup_oauth2::Error),

    #[error("{0}")]
    Other(String),
}

/// Token as returned by a source; `value` may be absent.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub value: Option<SecretString>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> std::result::Result<IssuedToken, CredentialError>;

    /// Short label for logs
    fn kind(&self) -> &'static str;
}

/// Service-account key file exchanged for access tokens via yup-oauth2.
///
/// The key is read lazily on the first refresh, so a bad path surfaces as an
/// authentication failure on the first tool call rather than at startup.
pub struct ServiceAccountTokenSource {
    key_path: PathBuf,
    scopes: Vec<String>,
    authenticator: OnceCell<DefaultAuthenticator>,
}

impl ServiceAccountTokenSource {
    pub fn new<P: Into<PathBuf>>(key_path: P) -> Self {
        Self {
            key_path: key_path.into(),
            scopes: vec![CLOUD_PLATFORM_SCOPE.to_string()],
            authenticator: OnceCell::new(),
        }
    }

    async fn authenticator(&self) -> std::result::Result<&DefaultAuthenticator, CredentialError> {
        self.authenticator
            .get_or_try_init(|| async {
                let key = yup_oauth2::read_service_account_key(&self.key_path).await?;
                let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key).build().await?;
                info!(key_path = %self.key_path.display(), "Loaded service account credentials");
                Ok::<_, CredentialError>(auth)
            })
            .await
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn fetch_token(&self) -> std::result::Result<IssuedToken, CredentialError> {
        let auth = self.authenticator().await?;
        let token = auth.token(&self.scopes).await?;

        Ok(IssuedToken {
            value: token.token().map(SecretString::new),
            expires_at: token
                .expiration_time()
                .and_then(|at| DateTime::from_timestamp(at.unix_timestamp(), 0)),
        })
    }

    fn kind(&self) -> &'static str {
        "service_account"
    }
}

/// Pre-minted bearer token that never expires locally.
pub struct StaticTokenSource {
    token: SecretString,
}

impl StaticTokenSource {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn fetch_token(&self) -> std::result::Result<IssuedToken, CredentialError> {
        Ok(IssuedToken { value: Some(self.token.clone()), expires_at: None })
    }

    fn kind(&self) -> &'static str {
        "static_token"
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at - ChronoDuration::seconds(EXPIRY_SKEW_SECS) > now,
            None => true,
        }
    }
}

pub struct CredentialProvider {
    source: Option<Arc<dyn TokenSource>>,
    cached: Mutex<Option<CachedToken>>,
}

impl CredentialProvider {
    pub fn new(source: Option<Arc<dyn TokenSource>>) -> Self {
        Self { source, cached: Mutex::new(None) }
    }

    /// A key file wins over a static token; with neither, every call fails.
    pub fn from_settings(settings: &Settings) -> Self {
        let source: Option<Arc<dyn TokenSource>> =
            match (&settings.google_credentials_path, &settings.access_token) {
                (Some(path), _) if !path.trim().is_empty() => {
                    Some(Arc::new(ServiceAccountTokenSource::new(path.trim())))
                }
                (_, Some(token)) if !token.is_empty() => {
                    Some(Arc::new(StaticTokenSource::new(token.clone())))
                }
                _ => None,
            };
        Self::new(source)
    }

    pub fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    /// Return a valid bearer token, refreshing the cached one if needed.
    pub async fn get_token(&self) -> Result<SecretString> {
        let source = self.source.as_ref().ok_or_else(|| {
            AppError::authentication("Google Cloud credentials not configured")
                .with_detail("reason", "credentials_path_not_set")
        })?;

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_valid(Utc::now())) {
            return Ok(token.value.clone());
        }

        debug!(source = source.kind(), "Refreshing access token");
        let issued = source.fetch_token().await.map_err(|e| {
            AppError::authentication("Failed to refresh authentication token")
                .with_detail("reason", e.to_string())
                .with_source(e)
        })?;

        let value = issued.value.filter(|v| !v.is_empty()).ok_or_else(|| {
            AppError::authentication("Failed to obtain authentication token")
                .with_detail("reason", "token_is_none")
        })?;

        *cached = Some(CachedToken { value: value.clone(), expires_at: issued.expires_at });
        Ok(value)
    }

    /// Drop the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        value: Option<&'static str>,
        lifetime_secs: Option<i64>,
        fail: bool,
    }

    impl CountingSource {
        fn new(value: Option<&'static str>, lifetime_secs: Option<i64>) -> Self {
            Self { calls: AtomicUsize::new(0), value, lifetime_secs, fail: false }
        }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> std::result::Result<IssuedToken, CredentialError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CredentialError::Other("metadata server unreachable".into()));
            }
            Ok(IssuedToken {
                value: self.value.map(|v| SecretString::new(format!("{}-{}", v, n))),
                expires_at: self.lifetime_secs.map(|s| Utc::now() + ChronoDuration::seconds(s)),
            })
        }

        fn kind(&self) -> &'static str {
            "counting"
        }
    }

    fn reason(error: &AppError) -> Option<&str> {
        error.details().get("reason").and_then(|v| v.as_str())
    }

    #[tokio::test]
    async fn test_unconfigured_provider_fails() {
        let provider = CredentialProvider::new(None);
        let error = provider.get_token().await.expect_err("no source");
        assert_eq!(error.kind(), &ErrorKind::Authentication);
        assert_eq!(reason(&error), Some("credentials_path_not_set"));
    }

    #[tokio::test]
    async fn test_valid_token_is_cached() {
        let source = Arc::new(CountingSource::new(Some("tok"), Some(3600)));
        let provider = CredentialProvider::new(Some(source.clone()));

        let first = provider.get_token().await.expect("token");
        let second = provider.get_token().await.expect("token");
        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_near_expiry_is_refreshed() {
        let source = Arc::new(CountingSource::new(Some("tok"), Some(30)));
        let provider = CredentialProvider::new(Some(source.clone()));

        let first = provider.get_token().await.expect("token");
        let second = provider.get_token().await.expect("token");
        assert_ne!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let source = Arc::new(CountingSource::new(Some("tok"), None));
        let provider = CredentialProvider::new(Some(source.clone()));

        provider.get_token().await.expect("token");
        provider.invalidate().await;
        provider.get_token().await.expect("token");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_token_value() {
        let provider = CredentialProvider::new(Some(Arc::new(CountingSource::new(None, None))));
        let error = provider.get_token().await.expect_err("empty token");
        assert_eq!(error.message(), "Failed to obtain authentication token");
        assert_eq!(reason(&error), Some("token_is_none"));
    }

    #[tokio::test]
    async fn test_refresh_failure_carries_reason() {
        let source = CountingSource { fail: true, ..CountingSource::new(Some("tok"), None) };
        let provider = CredentialProvider::new(Some(Arc::new(source)));

        let error = provider.get_token().await.expect_err("refresh fails");
        assert_eq!(error.status(), 401);
        assert_eq!(reason(&error), Some("metadata server unreachable"));
    }

    #[tokio::test]
    async fn test_from_settings_prefers_key_file() {
        let settings = Settings {
            access_token: Some(SecretString::new("static")),
            ..Default::default()
        };
        let provider = CredentialProvider::from_settings(&settings);
        assert_eq!(provider.get_token().await.expect("static").expose_secret(), "static");

        let missing = tempfile::tempdir().expect("tempdir").path().join("missing.json");
        let settings = Settings {
            google_credentials_path: Some(missing.display().to_string()),
            access_token: Some(SecretString::new("static")),
            ..Default::default()
        };
        let provider = CredentialProvider::from_settings(&settings);
        let error = provider.get_token().await.expect_err("key file is absent");
        assert_eq!(error.message(), "Failed to refresh authentication token");

        assert!(!CredentialProvider::from_settings(&Settings::default()).is_configured());
    }
}
