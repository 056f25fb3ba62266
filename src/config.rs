//! Configuration loading and management.
//!
//! Loads configuration from the embedded config.toml with environment
//! variable overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub oauth: OAuthConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub tenant: String,
    /// Only read from the `CLIENT_SECRET` environment variable; never
    /// written into config.toml.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Accepted for parity with redirect-based flows, unused by device code.
    #[serde(default)]
    pub redirect_uri: String,
    pub scopes: ScopesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScopesConfig {
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub graph_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    /// Load configuration from the embedded config.toml with environment
    /// variable overrides.
    pub fn load() -> Result<Self> {
        // Parse embedded config
        let mut config: Config =
            toml::from_str(CONFIG_TOML).context("Failed to parse embedded config.toml")?;

        // Apply environment variable overrides
        if let Ok(client_id) = env::var("CLIENT_ID") {
            config.oauth.client_id = client_id;
        }

        if let Ok(tenant) = env::var("TENANT_ID") {
            config.oauth.tenant = tenant;
        }

        if let Ok(secret) = env::var("CLIENT_SECRET") {
            config.oauth.client_secret = Some(secret);
        }

        if let Ok(redirect_uri) = env::var("REDIRECT_URI") {
            config.oauth.redirect_uri = redirect_uri;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            config.logging.level = log_level;
        }

        // Validate required fields
        config.validate()?;

        Ok(config)
    }

    /// Validate that required configuration is present.
    fn validate(&self) -> Result<()> {
        if self.oauth.client_id.is_empty() || self.oauth.client_id == "YOUR_CLIENT_ID" {
            anyhow::bail!(
                "client_id not configured. Set the CLIENT_ID environment variable \
                 or update config.toml"
            );
        }

        if self.oauth.tenant.is_empty() {
            anyhow::bail!(
                "tenant not configured. Set the TENANT_ID environment variable \
                 or update config.toml"
            );
        }

        Ok(())
    }

    /// Get the token endpoint for the configured tenant.
    pub fn token_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.oauth.tenant
        )
    }

    /// Get the device-code endpoint for the configured tenant.
    pub fn devicecode_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/devicecode",
            self.oauth.tenant
        )
    }

    /// Space-separated delegated scopes for the device-code flow.
    pub fn delegated_scope(&self) -> String {
        self.oauth.scopes.scopes.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            app: AppConfig {
                name: "driveup".into(),
            },
            oauth: OAuthConfig {
                client_id: "test-client".into(),
                tenant: "test-tenant".into(),
                client_secret: None,
                redirect_uri: String::new(),
                scopes: ScopesConfig {
                    scopes: vec!["offline_access".into(), "Files.ReadWrite".into()],
                },
            },
            api: ApiConfig {
                graph_base_url: "https://graph.microsoft.com/v1.0".into(),
            },
            logging: LoggingConfig {
                level: "info".into(),
            },
        }
    }

    #[test]
    fn test_config_parsing() {
        // The embedded file carries a placeholder client_id, so validation
        // would fail, but parsing must succeed.
        let result = toml::from_str::<Config>(CONFIG_TOML);
        assert!(result.is_ok(), "Config parsing failed: {:?}", result.err());
    }

    #[test]
    fn test_urls() {
        let config = test_config();

        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/test-tenant/oauth2/v2.0/token"
        );
        assert_eq!(
            config.devicecode_url(),
            "https://login.microsoftonline.com/test-tenant/oauth2/v2.0/devicecode"
        );
    }

    #[test]
    fn test_delegated_scope() {
        let config = test_config();
        assert_eq!(config.delegated_scope(), "offline_access Files.ReadWrite");
    }

    #[test]
    fn test_validate_rejects_placeholder() {
        let mut config = test_config();
        config.oauth.client_id = "YOUR_CLIENT_ID".into();
        assert!(config.validate().is_err());
    }
}
