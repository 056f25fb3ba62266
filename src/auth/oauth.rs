//! OAuth2 client for the Microsoft identity platform.
//!
//! Two grants are supported: client credentials (app-only, daemon-style)
//! and device code (interactive, sign-in happens in a browser on any
//! device). Neither grant is ever retried; a provider rejection is final.

use crate::config::Config;
use crate::error::AuthError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Scope requested by the client-credential grant.
const APP_ONLY_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Grant type identifier for device-code token polling.
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// OAuth2 client for the configured tenant.
pub struct OAuth2Client {
    client_id: String,
    client_secret: Option<String>,
    delegated_scope: String,
    token_endpoint: String,
    devicecode_endpoint: String,
    http_client: reqwest::Client,
}

impl OAuth2Client {
    /// Create a new OAuth2 client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client_id: config.oauth.client_id.clone(),
            client_secret: config.oauth.client_secret.clone(),
            delegated_scope: config.delegated_scope(),
            token_endpoint: config.token_url(),
            devicecode_endpoint: config.devicecode_url(),
            http_client,
        })
    }

    /// Acquire a token with the client-credential grant.
    ///
    /// Requires a client secret; used by the app-only upload path.
    pub async fn client_credentials_token(&self) -> Result<TokenResponse, AuthError> {
        let secret = self.client_secret.as_deref().ok_or_else(|| {
            AuthError::RequestFailed(
                "CLIENT_SECRET is required for the app-only flow".to_string(),
            )
        })?;

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", secret),
            ("grant_type", "client_credentials"),
            ("scope", APP_ONLY_SCOPE),
        ];

        let response = self
            .http_client
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            tracing::error!("Client-credential grant failed: HTTP {}", status);
            return Err(provider_error(&body, status.as_u16()));
        }

        parse_token_response(&body)
    }

    /// Start the device-code flow.
    ///
    /// Returns the authorization the shell must present to the user. A
    /// response missing `device_code` or `user_code` fails here, before
    /// any polling starts.
    pub async fn request_device_code(&self) -> Result<DeviceAuthorization, AuthError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("scope", self.delegated_scope.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.devicecode_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            tracing::error!("Device code request failed: HTTP {}", status);
            return Err(provider_error(&body, status.as_u16()));
        }

        parse_device_authorization(&body)
    }

    /// Poll the token endpoint until the user completes sign-in.
    ///
    /// Sleeps the provider-suggested interval between polls, backs off on
    /// `slow_down`, and gives up when the device code's lifetime elapses.
    /// The user declining is terminal, as is any unrecognized error code.
    pub async fn poll_until_authorized(
        &self,
        authorization: &DeviceAuthorization,
    ) -> Result<TokenResponse, AuthError> {
        let mut interval = authorization.interval.max(1);
        let deadline = Instant::now() + Duration::from_secs(authorization.expires_in);

        let params = [
            ("grant_type", DEVICE_CODE_GRANT),
            ("client_id", self.client_id.as_str()),
            ("device_code", authorization.device_code.as_str()),
        ];

        loop {
            tokio::time::sleep(Duration::from_secs(interval)).await;

            if Instant::now() >= deadline {
                return Err(AuthError::CodeExpired);
            }

            let response = self
                .http_client
                .post(&self.token_endpoint)
                .form(&params)
                .send()
                .await
                .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

            if status.is_success() {
                return parse_token_response(&body);
            }

            match provider_error(&body, status.as_u16()) {
                AuthError::Provider { ref error, .. } if error == "authorization_pending" => {
                    debug!("Authorization pending, polling again in {}s", interval);
                }
                AuthError::Provider { ref error, .. } if error == "slow_down" => {
                    interval += 2;
                    debug!("Provider asked to slow down, interval now {}s", interval);
                }
                AuthError::Provider { ref error, .. } if error == "expired_token" => {
                    return Err(AuthError::CodeExpired);
                }
                AuthError::Provider { ref error, .. }
                    if error == "authorization_declined" || error == "access_denied" =>
                {
                    return Err(AuthError::Declined);
                }
                terminal => return Err(terminal),
            }
        }
    }
}

/// Token response from the identity provider.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: String,
}

/// Device authorization issued at the start of a device-code flow.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    /// Lifetime of the code in seconds.
    pub expires_in: u64,
    /// Suggested seconds between token polls.
    #[serde(default = "default_poll_interval")]
    pub interval: u64,
    /// Provider-composed instruction text, when present.
    #[serde(default)]
    pub message: Option<String>,
}

fn default_poll_interval() -> u64 {
    5
}

/// Map a non-success provider body to an `AuthError`, surfacing the
/// payload's `error` and `error_description` fields when parseable.
fn provider_error(body: &str, status: u16) -> AuthError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => AuthError::Provider {
            error: parsed.error,
            error_description: parsed.error_description.unwrap_or_default(),
        },
        Err(_) => AuthError::RequestFailed(format!("HTTP {}", status)),
    }
}

fn parse_token_response(body: &str) -> Result<TokenResponse, AuthError> {
    serde_json::from_str(body).map_err(|e| AuthError::MalformedResponse(e.to_string()))
}

fn parse_device_authorization(body: &str) -> Result<DeviceAuthorization, AuthError> {
    serde_json::from_str(body).map_err(|e| AuthError::MalformedResponse(e.to_string()))
}
