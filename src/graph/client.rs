//! Microsoft Graph API client for drive listing and file upload.

use crate::auth::session::Session;
use crate::config::Config;
use crate::error::ApiError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Graph rejects single-shot PUT uploads above roughly this size; larger
/// files would need an upload session, which this tool does not create.
pub const SINGLE_PUT_LIMIT: u64 = 4 * 1024 * 1024;

/// Microsoft Graph API client.
pub struct GraphClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl GraphClient {
    /// Create a new Graph client.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.api.graph_base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// List the folders at the drive root, in server order.
    ///
    /// Non-folder items are filtered out. An empty root is a valid result,
    /// not an error.
    pub async fn list_folders(&self, session: &Session) -> Result<Vec<Folder>, ApiError> {
        let url = format!("{}/me/drive/root/children", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(session.bearer())
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        match response.status().as_u16() {
            200 => {
                let listing: DriveChildren = response
                    .json()
                    .await
                    .map_err(|e| ApiError::ParseFailed(e.to_string()))?;
                Ok(folders_from_children(listing))
            }
            401 => Err(ApiError::Unauthorized),
            403 => Err(ApiError::Forbidden),
            429 => Err(ApiError::RateLimited),
            status => Err(ApiError::RequestFailed(format!("HTTP {}", status))),
        }
    }

    /// Fetch the signed-in user's profile.
    pub async fn get_user_profile(&self, session: &Session) -> Result<UserProfile, ApiError> {
        let url = format!("{}/me", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(session.bearer())
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        match response.status().as_u16() {
            200 => {
                let profile: UserProfile = response
                    .json()
                    .await
                    .map_err(|e| ApiError::ParseFailed(e.to_string()))?;
                Ok(profile)
            }
            401 => Err(ApiError::Unauthorized),
            403 => Err(ApiError::Forbidden),
            429 => Err(ApiError::RateLimited),
            status => Err(ApiError::RequestFailed(format!("HTTP {}", status))),
        }
    }

    /// Upload one local file into `folder_name` with a single PUT.
    ///
    /// The whole file is read into memory and sent as
    /// `application/octet-stream`. Always returns an `UploadResult`;
    /// failures are recorded in it, never raised, so a batch can continue
    /// past a bad file.
    pub async fn upload_file(
        &self,
        session: &Session,
        folder_name: &str,
        local_path: &Path,
    ) -> UploadResult {
        let file_name = match local_path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => {
                return UploadResult::rejected(
                    local_path.display().to_string(),
                    "path has no file name",
                )
            }
        };

        let data = match tokio::fs::read(local_path).await {
            Ok(data) => data,
            Err(e) => {
                return UploadResult::rejected(file_name, format!("failed to read file: {}", e))
            }
        };

        if data.len() as u64 > SINGLE_PUT_LIMIT {
            warn!(
                "{} is {} bytes, above the single-shot upload limit; the server will likely reject it",
                file_name,
                data.len()
            );
        }

        let url = upload_url(&self.base_url, folder_name, &file_name);
        debug!("PUT {} ({} bytes)", url, data.len());

        let response = match self
            .http_client
            .put(&url)
            .bearer_auth(session.bearer())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return UploadResult::rejected(file_name, e.to_string()),
        };

        let status = response.status().as_u16();
        if status == 200 || status == 201 {
            UploadResult::uploaded(file_name, status)
        } else {
            let body = response.text().await.unwrap_or_default();
            UploadResult::failed(file_name, status, body)
        }
    }
}

/// Destination URL for a single-shot content upload.
fn upload_url(base_url: &str, folder_name: &str, file_name: &str) -> String {
    format!(
        "{}/me/drive/root:/{}/{}:/content",
        base_url,
        urlencoding::encode(folder_name),
        urlencoding::encode(file_name)
    )
}

/// Keep only the folder-faceted children, preserving server order.
fn folders_from_children(listing: DriveChildren) -> Vec<Folder> {
    listing
        .value
        .into_iter()
        .filter(|item| item.folder.is_some())
        .map(|item| {
            let child_count = item.folder.and_then(|f| f.child_count);
            Folder {
                name: item.name,
                child_count,
            }
        })
        .collect()
}

/// Listing response from `/me/drive/root/children`.
#[derive(Debug, Deserialize)]
struct DriveChildren {
    #[serde(default)]
    value: Vec<DriveItem>,
}

/// A drive item as returned by the children listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItem {
    name: String,
    /// Present iff the item is a folder.
    #[serde(default)]
    folder: Option<FolderFacet>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderFacet {
    #[serde(default)]
    child_count: Option<u32>,
}

/// A selectable destination folder at the drive root.
#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub child_count: Option<u32>,
}

impl Folder {
    /// Display text for the folder list.
    pub fn display_text(&self) -> String {
        match self.child_count {
            Some(count) => format!("{} ({} items)", self.name, count),
            None => self.name.clone(),
        }
    }
}

/// Outcome of a single file upload.
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub file_name: String,
    pub succeeded: bool,
    /// HTTP status of the PUT; absent when the file never left the machine.
    pub status: Option<u16>,
    pub message: Option<String>,
}

impl UploadResult {
    pub fn uploaded(file_name: impl Into<String>, status: u16) -> Self {
        Self {
            file_name: file_name.into(),
            succeeded: true,
            status: Some(status),
            message: None,
        }
    }

    pub fn failed(file_name: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            file_name: file_name.into(),
            succeeded: false,
            status: Some(status),
            message: (!message.is_empty()).then_some(message),
        }
    }

    /// A failure with no HTTP status: the upload never reached the server.
    pub fn rejected(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            succeeded: false,
            status: None,
            message: Some(message.into()),
        }
    }

    /// One line for the per-file report.
    pub fn display_text(&self) -> String {
        match (self.succeeded, self.status, &self.message) {
            (true, Some(status), _) => format!("{}: uploaded (HTTP {})", self.file_name, status),
            (false, Some(status), Some(message)) => {
                format!("{}: failed (HTTP {}): {}", self.file_name, status, message)
            }
            (false, Some(status), None) => format!("{}: failed (HTTP {})", self.file_name, status),
            (false, None, Some(message)) => format!("{}: failed: {}", self.file_name, message),
            _ => format!("{}: failed", self.file_name),
        }
    }
}

/// User profile from the Graph `/me` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub display_name: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
}

impl UserProfile {
    /// Get the best available display name.
    pub fn display_name_or_upn(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_else(|| "Unknown User".to_string())
    }

    /// Get the best available email.
    pub fn email(&self) -> String {
        self.mail
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_else(|| "No email".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folders_from_children_filters_files() {
        let listing: DriveChildren = serde_json::from_str(
            r#"{"value": [
                {"name": "Docs", "folder": {"childCount": 3}},
                {"name": "readme.txt", "size": 120},
                {"name": "Pictures", "folder": {}}
            ]}"#,
        )
        .unwrap();

        let folders = folders_from_children(listing);
        let names: Vec<&str> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Docs", "Pictures"]);
        assert_eq!(folders[0].child_count, Some(3));
        assert_eq!(folders[1].child_count, None);
    }

    #[test]
    fn test_folders_from_children_empty_listing() {
        let listing: DriveChildren = serde_json::from_str(r#"{"value": []}"#).unwrap();
        assert!(folders_from_children(listing).is_empty());
    }

    #[test]
    fn test_upload_url_encodes_segments() {
        let url = upload_url(
            "https://graph.microsoft.com/v1.0",
            "Reports Q3",
            "summary 2024.pdf",
        );
        assert_eq!(
            url,
            "https://graph.microsoft.com/v1.0/me/drive/root:/Reports%20Q3/summary%202024.pdf:/content"
        );
    }

    #[test]
    fn test_upload_result_display() {
        let ok = UploadResult::uploaded("a.txt", 201);
        assert_eq!(ok.display_text(), "a.txt: uploaded (HTTP 201)");

        let denied = UploadResult::failed("a.txt", 403, "Access denied");
        assert!(!denied.succeeded);
        assert_eq!(denied.status, Some(403));
        assert_eq!(denied.display_text(), "a.txt: failed (HTTP 403): Access denied");

        let unread = UploadResult::rejected("b.txt", "failed to read file: not found");
        assert_eq!(unread.status, None);
        assert_eq!(
            unread.display_text(),
            "b.txt: failed: failed to read file: not found"
        );
    }

    #[test]
    fn test_upload_result_empty_body_message() {
        let result = UploadResult::failed("a.txt", 502, "");
        assert_eq!(result.message, None);
        assert_eq!(result.display_text(), "a.txt: failed (HTTP 502)");
    }

    #[test]
    fn test_user_profile_fallback() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"displayName": null, "mail": null, "userPrincipalName": "user@tenant.com"}"#,
        )
        .unwrap();

        assert_eq!(profile.display_name_or_upn(), "user@tenant.com");
        assert_eq!(profile.email(), "user@tenant.com");
    }
}
