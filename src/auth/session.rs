//! Session values and the device sign-in task.
//!
//! A `Session` is the only way a bearer token travels through the
//! application: authentication produces one, every Graph call borrows it.
//! There is no global token state and no automatic refresh; signing in
//! again replaces the session wholesale.

use crate::auth::oauth::{DeviceAuthorization, OAuth2Client, TokenResponse};
use crate::error::AuthError;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use zeroize::Zeroizing;

/// How a session's token was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    DeviceCode,
    ClientCredentials,
}

/// An authenticated session against the Microsoft identity platform.
pub struct Session {
    /// Bearer token; zeroed on drop.
    access_token: Zeroizing<String>,
    pub flow: AuthFlow,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a freshly acquired token.
    pub fn from_token_response(response: TokenResponse, flow: AuthFlow) -> Self {
        Self {
            expires_at: Utc::now() + Duration::seconds(response.expires_in as i64),
            access_token: Zeroizing::new(response.access_token),
            flow,
        }
    }

    /// The bearer token for an Authorization header.
    pub fn bearer(&self) -> &str {
        self.access_token.as_str()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Events emitted by a device sign-in task, in order: at most one
/// `Prompt`, then exactly one `Completed`.
pub enum SignInEvent {
    /// The provider issued a user code; display it and wait.
    Prompt(DeviceAuthorization),
    /// Terminal outcome of the flow.
    Completed(Result<Session, AuthError>),
}

/// Run the device-code sign-in on a background task.
///
/// The caller drains the returned channel: render the `Prompt`, then block
/// on `Completed`. If the device-code request itself fails, `Completed`
/// arrives without a preceding `Prompt` and no polling ever happens. The
/// poll is not cancelled by dropping the receiver; it runs to its own
/// deadline.
pub fn spawn_device_sign_in(oauth: Arc<OAuth2Client>) -> mpsc::Receiver<SignInEvent> {
    let (tx, rx) = mpsc::channel(2);

    tokio::spawn(async move {
        let authorization = match oauth.request_device_code().await {
            Ok(authorization) => authorization,
            Err(e) => {
                let _ = tx.send(SignInEvent::Completed(Err(e))).await;
                return;
            }
        };

        let _ = tx.send(SignInEvent::Prompt(authorization.clone())).await;

        let outcome = oauth
            .poll_until_authorized(&authorization)
            .await
            .map(|token| Session::from_token_response(token, AuthFlow::DeviceCode));

        if outcome.is_ok() {
            info!("Device sign-in completed");
        }

        let _ = tx.send(SignInEvent::Completed(outcome)).await;
    });

    rx
}
