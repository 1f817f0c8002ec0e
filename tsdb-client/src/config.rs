use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::auth::{Credentials, SecureString, SignOptions};
use crate::error::{Result, TsdbError};
use crate::http::{BackoffRetryPolicy, RetryPolicy};

pub const ENV_ENDPOINT: &str = "TSDB_ENDPOINT";
pub const ENV_ACCESS_KEY: &str = "TSDB_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "TSDB_SECRET_KEY";
pub const ENV_DATABASE: &str = "TSDB_DATABASE";
pub const ENV_PROXY_URL: &str = "TSDB_PROXY_URL";
pub const ENV_SESSION_TOKEN: &str = "TSDB_SESSION_TOKEN";

/// Default per-request timeout, matching the service SDKs.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1200);

/// Configuration for a [`TsdbClient`](crate::TsdbClient).
#[derive(Debug, Clone)]
pub struct TsdbConfig {
    endpoint: String,
    access_key: String,
    secret_key: SecureString,
    session_token: Option<SecureString>,
    database: Option<String>,
    proxy_url: Option<String>,
    timeout: Duration,
    retry_policy: Arc<dyn RetryPolicy>,
    user_agent: String,
    sign_options: SignOptions,
}

impl TsdbConfig {
    /// Create a configuration for `endpoint` (e.g. `http://tsdb.example.com`)
    /// using the given access key pair.
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: SecureString::new(secret_key.into()),
            session_token: None,
            database: None,
            proxy_url: None,
            timeout: DEFAULT_TIMEOUT,
            retry_policy: Arc::new(BackoffRetryPolicy::default()),
            user_agent: format!("tsdb-client-rust/{}", env!("CARGO_PKG_VERSION")),
            sign_options: SignOptions::default(),
        }
    }

    /// Build a configuration from `TSDB_*` environment variables.
    ///
    /// `TSDB_ENDPOINT`, `TSDB_ACCESS_KEY` and `TSDB_SECRET_KEY` are required;
    /// `TSDB_DATABASE`, `TSDB_PROXY_URL` and `TSDB_SESSION_TOKEN` are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| TsdbError::Configuration {
                    message: format!("environment variable {key} is not set"),
                })
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(
            required(ENV_ENDPOINT)?,
            required(ENV_ACCESS_KEY)?,
            required(ENV_SECRET_KEY)?,
        );
        if let Some(database) = optional(ENV_DATABASE) {
            config = config.with_database(database);
        }
        if let Some(proxy) = optional(ENV_PROXY_URL) {
            config = config.with_proxy_url(proxy);
        }
        if let Some(token) = optional(ENV_SESSION_TOKEN) {
            config = config.with_session_token(token);
        }
        Ok(config)
    }

    /// Scope every request to `database`.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        let database = database.into();
        self.database = (!database.is_empty()).then_some(database);
        self
    }

    /// Route requests through an HTTP(S) proxy.
    pub fn with_proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        let proxy_url = proxy_url.into();
        self.proxy_url = (!proxy_url.is_empty()).then_some(proxy_url);
        self
    }

    /// Temporary (STS) session token sent as `x-bce-security-token`.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.session_token = (!token.is_empty()).then(|| SecureString::new(token));
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry_policy = Arc::new(policy);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Headers to sign and default expiration for every request.
    pub fn with_sign_options(mut self, options: SignOptions) -> Self {
        self.sign_options = options;
        self
    }

    /// Get the endpoint as configured.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Get the secret key.
    ///
    /// # Security
    /// Use `expose()` to read the value. Avoid storing or logging it.
    pub fn secret_key(&self) -> &SecureString {
        &self.secret_key
    }

    pub fn session_token(&self) -> Option<&SecureString> {
        self.session_token.as_ref()
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> &Arc<dyn RetryPolicy> {
        &self.retry_policy
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn sign_options(&self) -> &SignOptions {
        &self.sign_options
    }

    /// Validate and split the endpoint into its normalized form (no trailing
    /// slash) and the `host[:port]` used for the `Host` header.
    pub(crate) fn resolve_endpoint(&self) -> Result<(String, String)> {
        let invalid = |message: String| TsdbError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            message,
        };

        let url = Url::parse(self.endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?;
        // Request paths are signed as-is, so the endpoint cannot add a prefix.
        if url.path() != "/" {
            return Err(invalid(format!("unexpected path '{}'", url.path())));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("unexpected query or fragment".to_string()));
        }
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok((self.endpoint.trim().trim_end_matches('/').to_string(), host))
    }

    pub(crate) fn credentials(&self) -> Result<Credentials> {
        let credentials = Credentials::new(self.access_key.clone(), self.secret_key.clone())?;
        Ok(match &self.session_token {
            Some(token) => credentials.with_session_token(token.clone()),
            None => credentials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_builder() {
        let config = TsdbConfig::new("http://tsdb.example.com", "ak", "sk")
            .with_database("db1")
            .with_proxy_url("http://proxy.local:3128")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("custom/1.0")
            .with_retry_policy(BackoffRetryPolicy::new(
                1,
                Duration::from_secs(1),
                Duration::from_millis(10),
            ));

        assert_eq!(config.endpoint(), "http://tsdb.example.com");
        assert_eq!(config.access_key(), "ak");
        assert_eq!(config.secret_key().expose(), "sk");
        assert_eq!(config.database(), Some("db1"));
        assert_eq!(config.proxy_url(), Some("http://proxy.local:3128"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.user_agent(), "custom/1.0");
    }

    #[test]
    fn test_defaults() {
        let config = TsdbConfig::new("http://tsdb.example.com", "ak", "sk");
        assert_eq!(config.database(), None);
        assert_eq!(config.proxy_url(), None);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.sign_options().expire_seconds, 1800);
        assert!(config.user_agent().starts_with("tsdb-client-rust/"));
    }

    #[test]
    fn test_empty_database_means_none() {
        let config = TsdbConfig::new("http://tsdb.example.com", "ak", "sk").with_database("");
        assert_eq!(config.database(), None);
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = TsdbConfig::new("http://tsdb.example.com", "ak", "top-secret");
        assert!(!format!("{config:?}").contains("top-secret"));
    }

    #[test]
    fn test_resolve_endpoint_host() {
        let (endpoint, host) = TsdbConfig::new("http://tsdb.example.com/", "ak", "sk")
            .resolve_endpoint()
            .unwrap();
        assert_eq!(endpoint, "http://tsdb.example.com");
        assert_eq!(host, "tsdb.example.com");

        let (_, host) = TsdbConfig::new("https://127.0.0.1:8443", "ak", "sk")
            .resolve_endpoint()
            .unwrap();
        assert_eq!(host, "127.0.0.1:8443");
    }

    #[test]
    fn test_resolve_endpoint_rejects_malformed() {
        for bad in [
            "",
            "tsdb.example.com",
            "://nohost",
            "ftp://tsdb.example.com",
            "http://",
            "http://tsdb.example.com/api",
            "http://tsdb.example.com/api/",
            "http://tsdb.example.com:8080//",
            "http://tsdb.example.com?region=bj",
            "http://tsdb.example.com/#top",
        ] {
            let result = TsdbConfig::new(bad, "ak", "sk").resolve_endpoint();
            assert!(
                matches!(result, Err(TsdbError::InvalidEndpoint { .. })),
                "expected InvalidEndpoint for {bad:?}"
            );
        }
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_ENDPOINT, "http://tsdb.example.com"),
            (ENV_ACCESS_KEY, "ak"),
            (ENV_SECRET_KEY, "sk"),
            (ENV_DATABASE, "db1"),
        ]
        .into_iter()
        .collect();

        let config = TsdbConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.endpoint(), "http://tsdb.example.com");
        assert_eq!(config.database(), Some("db1"));
        assert_eq!(config.proxy_url(), None);
    }

    #[test]
    fn test_from_lookup_missing_required() {
        let result = TsdbConfig::from_lookup(|k| {
            (k == ENV_ENDPOINT).then(|| "http://tsdb.example.com".to_string())
        });
        assert!(matches!(result, Err(TsdbError::Configuration { .. })));
    }
}
