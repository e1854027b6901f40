//! Inbound webhook configuration

use secrecy::SecretString;
use serde::Deserialize;

/// Inbound webhook configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret; unset or blank disables the check
    pub secret: Option<String>,
}

impl WebhookConfig {
    pub fn secret(&self) -> Option<SecretString> {
        self.secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::new(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_blank_secret_is_disabled() {
        let config = WebhookConfig {
            secret: Some("  ".to_string()),
        };
        assert!(config.secret().is_none());
        assert!(WebhookConfig::default().secret().is_none());
    }

    #[test]
    fn test_secret_is_trimmed() {
        let config = WebhookConfig {
            secret: Some(" s3cret ".to_string()),
        };
        assert_eq!(config.secret().unwrap().expose_secret(), "s3cret");
    }
}
