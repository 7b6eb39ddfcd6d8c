use secrecy::{ExposeSecret, SecretString};

/// Wraps an API key with secrecy protection (zeroized on drop, redacted in Debug).
#[derive(Clone)]
pub struct ApiKey(pub SecretString);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let key = ApiKey::new("sk-ant-secret");
        let dbg = format!("{key:?}");
        assert!(!dbg.contains("secret"));
        assert_eq!(dbg, "ApiKey([REDACTED])");
    }

    #[test]
    fn expose_returns_raw_key() {
        let key = ApiKey::new("sk-ant-123");
        assert_eq!(key.expose(), "sk-ant-123");
    }
}
