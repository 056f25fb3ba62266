//! Error types for the driveup application.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and
//! `Error` implementations. Per-file upload failures are data, not errors;
//! they live in `UploadResult` so one bad file never aborts a batch.

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Authentication-related errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    RequestFailed(String),

    /// The identity provider rejected the request; `error` and
    /// `error_description` are surfaced from its payload verbatim.
    #[error("{error}: {error_description}")]
    Provider {
        error: String,
        error_description: String,
    },

    #[error("Malformed identity provider response: {0}")]
    MalformedResponse(String),

    #[error("Device code expired before sign-in completed")]
    CodeExpired,

    #[error("Sign-in was declined")]
    Declined,

    #[error("Sign-in task ended without a result")]
    ChannelClosed,
}

/// Graph API errors raised by folder listing and profile lookup.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Graph API request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),

    #[error("Unauthorized (401): Token may be expired")]
    Unauthorized,

    #[error("Forbidden (403): Insufficient permissions")]
    Forbidden,

    #[error("Rate limited (429): Too many requests")]
    RateLimited,
}

/// Invalid user input supplied through the shell.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("No files selected for upload")]
    NoFiles,

    #[error("No destination folder selected")]
    NoFolder,
}
