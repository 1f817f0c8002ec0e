use zeroize::ZeroizeOnDrop;

use crate::error::{Result, TsdbError};

/// A secret string that clears its contents when dropped.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct SecureString(String);

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl SecureString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the secret. Avoid storing or logging the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Access key pair used to sign requests, plus an optional STS session token.
#[derive(Debug, Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: SecureString,
    session_token: Option<SecureString>,
}

impl Credentials {
    /// Build credentials from an access key id and secret access key.
    ///
    /// # Errors
    ///
    /// Returns [`TsdbError::InvalidCredentials`] if either key is empty.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<SecureString>,
    ) -> Result<Self> {
        let access_key_id = access_key_id.into();
        let secret_access_key = secret_access_key.into();

        if access_key_id.trim().is_empty() {
            return Err(TsdbError::InvalidCredentials {
                message: "access key id should not be empty".to_string(),
            });
        }
        if secret_access_key.is_empty() {
            return Err(TsdbError::InvalidCredentials {
                message: "secret access key should not be empty".to_string(),
            });
        }

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: None,
        })
    }

    /// Attach a temporary session token.
    pub fn with_session_token(mut self, token: impl Into<SecureString>) -> Self {
        let token = token.into();
        self.session_token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &SecureString {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&SecureString> {
        self.session_token.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_string_debug_hides_value() {
        let secret = SecureString::new("hunter2");
        assert_eq!(format!("{secret:?}"), "SecureString(***)");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_credentials_reject_empty_keys() {
        assert!(matches!(
            Credentials::new("", "sk"),
            Err(TsdbError::InvalidCredentials { .. })
        ));
        assert!(matches!(
            Credentials::new("ak", ""),
            Err(TsdbError::InvalidCredentials { .. })
        ));
    }

    #[test]
    fn test_credentials_debug_does_not_leak_secret() {
        let creds = Credentials::new("ak", "very-secret")
            .unwrap()
            .with_session_token("token-value");
        let printed = format!("{creds:?}");
        assert!(printed.contains("ak"));
        assert!(!printed.contains("very-secret"));
        assert!(!printed.contains("token-value"));
    }

    #[test]
    fn test_empty_session_token_is_ignored() {
        let creds = Credentials::new("ak", "sk").unwrap().with_session_token("");
        assert!(creds.session_token().is_none());
    }
}
