//! Sequential multi-file upload orchestration.

use crate::auth::session::Session;
use crate::error::InputError;
use crate::graph::client::{GraphClient, UploadResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Seam between the orchestrator and the per-file Graph call.
#[async_trait]
pub trait FileUploader {
    async fn upload(
        &self,
        session: &Session,
        folder_name: &str,
        local_path: &Path,
    ) -> UploadResult;
}

#[async_trait]
impl FileUploader for GraphClient {
    async fn upload(
        &self,
        session: &Session,
        folder_name: &str,
        local_path: &Path,
    ) -> UploadResult {
        self.upload_file(session, folder_name, local_path).await
    }
}

/// Upload every path into `folder_name`, strictly in the supplied order.
///
/// Inputs are validated before anything touches the network: an empty
/// batch or a blank folder name is an `InputError` and zero uploads are
/// attempted. Uploads are best-effort; a failed file never aborts the rest
/// of the batch, and nothing already uploaded is rolled back. Returns one
/// `UploadResult` per input path, in input order.
pub async fn upload_all<U>(
    uploader: &U,
    session: &Session,
    folder_name: &str,
    paths: &[PathBuf],
) -> Result<Vec<UploadResult>, InputError>
where
    U: FileUploader + ?Sized,
{
    if folder_name.trim().is_empty() {
        return Err(InputError::NoFolder);
    }
    if paths.is_empty() {
        return Err(InputError::NoFiles);
    }

    info!("Uploading {} file(s) to {}", paths.len(), folder_name);

    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        results.push(uploader.upload(session, folder_name, path).await);
    }

    Ok(results)
}

/// Aggregate view of a finished batch, rendered by the shell.
#[derive(Debug)]
pub struct UploadReport {
    pub results: Vec<UploadResult>,
}

impl UploadReport {
    pub fn new(results: Vec<UploadResult>) -> Self {
        Self { results }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// One line per file, in upload order.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.results.iter().map(|r| r.display_text())
    }

    pub fn summary_text(&self) -> String {
        format!("{} uploaded, {} failed", self.succeeded(), self.failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::oauth::TokenResponse;
    use crate::auth::session::AuthFlow;
    use std::sync::Mutex;

    /// Scripted uploader: responds per file name, records call order.
    struct FakeUploader {
        responses: Vec<(&'static str, u16)>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeUploader {
        fn new(responses: Vec<(&'static str, u16)>) -> Self {
            Self {
                responses,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl FileUploader for FakeUploader {
        async fn upload(
            &self,
            _session: &Session,
            _folder_name: &str,
            local_path: &Path,
        ) -> UploadResult {
            let name = local_path.file_name().unwrap().to_string_lossy().into_owned();
            self.calls.lock().unwrap().push(name.clone());

            let status = self
                .responses
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, s)| *s)
                .unwrap_or(201);

            if status == 200 || status == 201 {
                UploadResult::uploaded(name, status)
            } else {
                UploadResult::failed(name, status, "rejected by server")
            }
        }
    }

    fn test_session() -> Session {
        Session::from_token_response(
            TokenResponse {
                access_token: "tok".into(),
                token_type: "Bearer".into(),
                expires_in: 3600,
                scope: String::new(),
            },
            AuthFlow::DeviceCode,
        )
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn test_one_result_per_path_in_order() {
        let uploader = FakeUploader::new(vec![]);
        let session = test_session();
        let input = paths(&["c.txt", "a.txt", "b.txt"]);

        let results = upload_all(&uploader, &session, "Docs", &input).await.unwrap();

        assert_eq!(results.len(), 3);
        let names: Vec<&str> = results.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["c.txt", "a.txt", "b.txt"]);
        assert!(results.iter().all(|r| r.succeeded));
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let uploader = FakeUploader::new(vec![("a.txt", 403)]);
        let session = test_session();
        let input = paths(&["a.txt", "b.txt"]);

        let results = upload_all(&uploader, &session, "Docs", &input).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(!results[0].succeeded);
        assert_eq!(results[0].status, Some(403));
        assert!(results[1].succeeded);
        assert_eq!(results[1].status, Some(201));
        assert_eq!(uploader.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_paths_fails_fast() {
        let uploader = FakeUploader::new(vec![]);
        let session = test_session();

        let result = upload_all(&uploader, &session, "Docs", &[]).await;

        assert_eq!(result.unwrap_err(), InputError::NoFiles);
        assert_eq!(uploader.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_folder_fails_fast() {
        let uploader = FakeUploader::new(vec![]);
        let session = test_session();
        let input = paths(&["a.txt"]);

        let result = upload_all(&uploader, &session, "  ", &input).await;

        assert_eq!(result.unwrap_err(), InputError::NoFolder);
        assert_eq!(uploader.call_count(), 0);
    }

    #[tokio::test]
    async fn test_report_aggregation() {
        let uploader = FakeUploader::new(vec![("a.txt", 500)]);
        let session = test_session();
        let input = paths(&["a.txt", "b.txt", "c.txt"]);

        let results = upload_all(&uploader, &session, "Docs", &input).await.unwrap();
        let report = UploadReport::new(results);

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert!(!report.all_succeeded());
        assert_eq!(report.summary_text(), "2 uploaded, 1 failed");
        assert_eq!(report.lines().count(), 3);
    }
}
