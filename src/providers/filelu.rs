//! FileLu Cloud Storage Provider
//!
//! Implements StorageProvider for FileLu using the REST API.
//! Authentication: API key passed as query parameter `key=`.
//! No OAuth flow required, the user generates an API key from account settings.
//!
//! API Base: https://filelu.com/api
//! Folders: identified by `fld_id` (u64), root = 0
//! Files: identified by `file_code` (String)
//! Upload: 2-step, get upload server URL + session, then multipart POST.
//! The upload endpoint may drop the file in the root folder, so non-root
//! destinations are fixed up with a `file/set_folder` call afterwards.

use async_trait::async_trait;
use reqwest::multipart;
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::http::{send_with_retry, HttpRetryConfig};
use super::{FileLuConfig, FilePayload, ProviderError, ProviderKind, StorageProvider};

const API_BASE: &str = "https://filelu.com/api";

// ─── API Response Types ──────────────────────────────────────────────────

/// Generic API response wrapper used by FileLu for all endpoints
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: Option<u32>,
    msg: Option<String>,
    result: Option<T>,
}

/// A folder entry returned by /folder/list
#[derive(Debug, Deserialize)]
struct FolderEntry {
    fld_id: u64,
    name: Option<String>,
}

/// Folder listing response. Files in the listing are irrelevant here, only
/// subfolders matter for resolving a destination path.
#[derive(Debug, Deserialize)]
struct FolderListResult {
    #[serde(default)]
    folders: Vec<FolderEntry>,
}

/// Folder create response
#[derive(Debug, Deserialize)]
struct FolderCreateResult {
    fld_id: Option<u64>,
}

/// Top-level upload server response from /upload/server
/// NOTE: sess_id is at response root, result is a plain URL string.
#[derive(Debug, Deserialize)]
struct UploadServerResponse {
    status: Option<u32>,
    msg: Option<String>,
    sess_id: Option<String>,
    result: Option<String>, // the upload URL
}

#[derive(Debug, Deserialize)]
struct StatusOnlyResponse {
    status: Option<u32>,
    msg: Option<String>,
}

/// Upload response entry returned by the upload CGI endpoint
#[derive(Debug, Deserialize)]
struct UploadResultEntry {
    file_code: Option<String>,
}

/// First 200 characters of a response body, clipped on a char boundary, for
/// error messages.
fn body_snippet(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ─── Provider ────────────────────────────────────────────────────────────

pub struct FileLuProvider {
    config: FileLuConfig,
    client: reqwest::Client,
    base_url: String,
}

impl FileLuProvider {
    pub fn new(config: FileLuConfig) -> Self {
        Self::with_base_url(config, API_BASE.to_string())
    }

    /// Construct against a different API base. Used by tests.
    pub fn with_base_url(config: FileLuConfig, base_url: String) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            base_url,
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    fn api_key(&self) -> &str {
        self.config.api_key.expose_secret()
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}?key={}", self.base_url, endpoint, self.api_key())
    }

    fn api_url_with(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        let mut url = self.api_url(endpoint);
        for (k, v) in params {
            url.push('&');
            url.push_str(k);
            url.push('=');
            url.push_str(&urlencoding::encode(v));
        }
        url
    }

    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response, ProviderError> {
        let request = self
            .client
            .get(url)
            .build()
            .map_err(|e| ProviderError::Unknown(format!("Build GET failed: {}", e)))?;
        send_with_retry(&self.client, request, &HttpRetryConfig::default())
            .await
            .map_err(|e| ProviderError::Unknown(e.to_string()))
    }

    /// Parse a FileLu API response, enforcing HTTP success and API status 200.
    async fn parse_api<T: for<'de> serde::Deserialize<'de>>(
        resp: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::Unknown(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::NetworkError(text));
        }

        let api_resp: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            ProviderError::Unknown(format!(
                "JSON parse error: {}. Body: {}",
                e,
                body_snippet(&text)
            ))
        })?;

        match api_resp.status {
            Some(s) if s != 200 => Err(ProviderError::Other(format!(
                "Unknown response from server (status: {}): {}",
                s,
                api_resp.msg.unwrap_or_default()
            ))),
            _ => api_resp.result.ok_or_else(|| {
                ProviderError::ParseError("API response missing 'result' field".to_string())
            }),
        }
    }

    async fn ensure_api_ok(resp: reqwest::Response) -> Result<(), ProviderError> {
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::Unknown(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::NetworkError(text));
        }

        let parsed: StatusOnlyResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::Unknown(format!(
                "JSON parse error: {}. Body: {}",
                e,
                body_snippet(&text)
            ))
        })?;

        match parsed.status {
            Some(s) if s != 200 => Err(ProviderError::Other(format!(
                "Unknown response from server (status: {}): {}",
                s,
                parsed.msg.unwrap_or_default()
            ))),
            _ => Ok(()),
        }
    }

    // ─── Folder Resolution ───────────────────────────────────────────────

    /// Resolve the fld_id for an absolute directory path, creating missing
    /// folders along the way.
    ///
    /// FileLu folder names are matched case-insensitively. Once one segment
    /// has to be created, every deeper segment is created without another
    /// listing, since a freshly created folder can only be empty.
    async fn resolve_folder_id(&self, directory: &str) -> Result<u64, ProviderError> {
        let mut fld_id: u64 = 0;
        let mut create_mode = false;

        for segment in directory.split('/').filter(|s| !s.is_empty()) {
            if !create_mode {
                match self.find_subfolder(fld_id, segment).await? {
                    Some(existing) => {
                        fld_id = existing;
                        continue;
                    }
                    None => create_mode = true,
                }
            }
            fld_id = self.create_folder(fld_id, segment).await?;
        }

        Ok(fld_id)
    }

    async fn find_subfolder(
        &self,
        parent_id: u64,
        name: &str,
    ) -> Result<Option<u64>, ProviderError> {
        let parent_str = parent_id.to_string();
        let url = self.api_url_with("folder/list", &[("fld_id", &parent_str)]);
        let resp = self.get_with_retry(&url).await?;
        let result = Self::parse_api::<FolderListResult>(resp).await?;

        let wanted = name.to_lowercase();
        let found = result.folders.iter().find(|folder| {
            folder
                .name
                .as_deref()
                .map(|n| n.to_lowercase() == wanted)
                .unwrap_or(false)
        });
        Ok(found.map(|folder| folder.fld_id))
    }

    async fn create_folder(&self, parent_id: u64, name: &str) -> Result<u64, ProviderError> {
        let parent_str = parent_id.to_string();
        let url = self.api_url_with(
            "folder/create",
            &[("parent_id", &parent_str), ("name", name)],
        );
        tracing::debug!("Creating FileLu folder '{}' under {}", name, parent_id);
        let resp = self.get_with_retry(&url).await?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::Unknown(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::NetworkError(text));
        }

        let parsed: ApiResponse<FolderCreateResult> = serde_json::from_str(&text).map_err(|e| {
            ProviderError::Unknown(format!(
                "JSON parse error: {}. Body: {}",
                e,
                body_snippet(&text)
            ))
        })?;

        let ApiResponse { status: api_status, msg, result } = parsed;
        let fld_id = match api_status {
            Some(200) => result.and_then(|r| r.fld_id),
            _ => None,
        };
        fld_id.ok_or_else(|| {
            ProviderError::Other(format!(
                "Failed to create folder (status: {}): {}",
                api_status.unwrap_or_default(),
                msg.unwrap_or_default()
            ))
        })
    }

    // ─── Upload ──────────────────────────────────────────────────────────

    /// Fetch the upload endpoint URL and session id for this account.
    async fn upload_server(&self) -> Result<(String, String), ProviderError> {
        let url = self.api_url("upload/server");
        let resp = self.get_with_retry(&url).await?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::Unknown(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::NetworkError(text));
        }

        let info: UploadServerResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::Unknown(format!(
                "JSON parse error: {}. Body: {}",
                e,
                body_snippet(&text)
            ))
        })?;

        if info.status != Some(200) {
            return Err(ProviderError::Other(format!(
                "Unknown response from server (status: {}): {}",
                info.status.unwrap_or_default(),
                info.msg.unwrap_or_default()
            )));
        }
        let sess_id = info.sess_id.ok_or_else(|| {
            ProviderError::ParseError("API response missing 'sess_id' field".to_string())
        })?;
        let upload_url = info.result.ok_or_else(|| {
            ProviderError::ParseError("API response missing 'result' field".to_string())
        })?;
        Ok((upload_url, sess_id))
    }
}

// ─── StorageProvider Trait ───────────────────────────────────────────────

#[async_trait]
impl StorageProvider for FileLuProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::FileLu
    }

    async fn validate_credentials(&self) -> bool {
        let url = format!("{}/account/info", self.base_url);
        let body = format!("key={}", urlencoding::encode(self.api_key()));
        let request = match self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .build()
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!("Unknown error: {}", e);
                return false;
            }
        };

        let resp = match send_with_retry(&self.client, request, &HttpRetryConfig::default()).await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!("Unknown error: {}", e);
                return false;
            }
        };

        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Unknown error: {}", e);
                return false;
            }
        };
        if !status.is_success() {
            tracing::error!("Network error: {}", text);
            return false;
        }

        match serde_json::from_str::<StatusOnlyResponse>(&text) {
            Ok(parsed) if parsed.status == Some(200) => true,
            Ok(parsed) => {
                tracing::error!(
                    "Unknown response from server (status: {}): {}",
                    parsed.status.unwrap_or_default(),
                    parsed.msg.unwrap_or_default()
                );
                false
            }
            Err(_) => {
                tracing::error!("Unknown response from server: {}", text);
                false
            }
        }
    }

    async fn upload_file(
        &self,
        directory: &str,
        file_name: &str,
        payload: &FilePayload,
    ) -> Result<String, ProviderError> {
        let fld_id = self.resolve_folder_id(directory).await?;
        let (upload_url, sess_id) = self.upload_server().await?;

        let part = multipart::Part::bytes(payload.bytes.clone())
            .file_name(file_name.to_string())
            .mime_str(&payload.content_type)
            .map_err(|e| ProviderError::TransferFailed(format!("Multipart error: {}", e)))?;

        let form = multipart::Form::new()
            .text("sess_id", sess_id)
            .text("utype", "prem")
            .part("file_0", part);

        let request = self
            .client
            .post(&upload_url)
            .multipart(form)
            .build()
            .map_err(|e| ProviderError::Unknown(format!("Build upload request failed: {}", e)))?;
        let resp = send_with_retry(&self.client, request, &HttpRetryConfig::default())
            .await
            .map_err(|e| ProviderError::Unknown(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ProviderError::Unknown(format!("Failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(ProviderError::NetworkError(body));
        }

        // The upload endpoint answers with a JSON array, one entry per file.
        let entries: Vec<UploadResultEntry> = serde_json::from_str(&body)
            .map_err(|_| ProviderError::Other(format!("Unknown response from server: {}", body)))?;
        let file_code = entries
            .into_iter()
            .next()
            .and_then(|entry| entry.file_code)
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                ProviderError::Other(format!("Unknown response from server: {}", body))
            })?;

        if fld_id != 0 {
            let fld_id_str = fld_id.to_string();
            let url = self.api_url_with(
                "file/set_folder",
                &[("file_code", &file_code), ("fld_id", &fld_id_str)],
            );
            let resp = self.get_with_retry(&url).await?;
            Self::ensure_api_ok(resp).await?;
        }

        tracing::info!("Uploaded {} to {} (file_code {})", file_name, directory, file_code);
        Ok(file_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn test_provider(server: &mockito::Server) -> FileLuProvider {
        let config = FileLuConfig {
            api_key: "test-key".to_string().into(),
        };
        FileLuProvider::with_base_url(config, server.url())
    }

    fn payload() -> FilePayload {
        FilePayload {
            bytes: vec![1, 2, 3],
            content_type: "image/png".to_string(),
            description: None,
        }
    }

    fn query(params: &[(&str, &str)]) -> Matcher {
        let mut all = vec![Matcher::UrlEncoded("key".into(), "test-key".into())];
        for (k, v) in params {
            all.push(Matcher::UrlEncoded((*k).into(), (*v).into()));
        }
        Matcher::AllOf(all)
    }

    #[test]
    fn test_api_url_with_encodes_values() {
        let config = FileLuConfig {
            api_key: "k".to_string().into(),
        };
        let provider = FileLuProvider::new(config);
        let url = provider.api_url_with("folder/create", &[("name", "a b&c")]);
        assert_eq!(
            url,
            "https://filelu.com/api/folder/create?key=k&name=a%20b%26c"
        );
    }

    #[test]
    fn test_body_snippet_clips_on_char_boundary() {
        let long = format!("{}é{}", "a".repeat(199), "b".repeat(40));
        let clipped = body_snippet(&long);
        assert_eq!(clipped.chars().count(), 200);
        assert!(clipped.ends_with('é'));
        assert_eq!(body_snippet("short"), "short");
    }

    #[tokio::test]
    async fn test_resolve_folder_id_switches_to_create_mode() {
        let mut server = mockito::Server::new_async().await;
        let provider = test_provider(&server);

        // Root listing has "A", so "/a" resolves case-insensitively.
        let list_root = server
            .mock("GET", "/folder/list")
            .match_query(query(&[("fld_id", "0")]))
            .with_body(r#"{"status":200,"msg":"OK","result":{"folders":[{"fld_id":101,"name":"A"}]}}"#)
            .create_async()
            .await;
        // "b" is missing under 101, flipping the walk into create mode.
        let list_a = server
            .mock("GET", "/folder/list")
            .match_query(query(&[("fld_id", "101")]))
            .with_body(r#"{"status":200,"msg":"OK","result":{"folders":[]}}"#)
            .create_async()
            .await;
        let create_b = server
            .mock("GET", "/folder/create")
            .match_query(query(&[("parent_id", "101"), ("name", "b")]))
            .with_body(r#"{"status":200,"msg":"OK","result":{"fld_id":202}}"#)
            .create_async()
            .await;
        let create_c = server
            .mock("GET", "/folder/create")
            .match_query(query(&[("parent_id", "202"), ("name", "c")]))
            .with_body(r#"{"status":200,"msg":"OK","result":{"fld_id":303}}"#)
            .create_async()
            .await;
        // Once in create mode there must be no listing of freshly made
        // folders, even when a folder named "c" already exists remotely.
        let list_b = server
            .mock("GET", "/folder/list")
            .match_query(query(&[("fld_id", "202")]))
            .with_body(r#"{"status":200,"msg":"OK","result":{"folders":[{"fld_id":999,"name":"c"}]}}"#)
            .expect(0)
            .create_async()
            .await;

        let fld_id = provider.resolve_folder_id("/a/b/c").await.unwrap();
        assert_eq!(fld_id, 303);
        list_root.assert_async().await;
        list_a.assert_async().await;
        create_b.assert_async().await;
        create_c.assert_async().await;
        list_b.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_file_to_root() {
        let mut server = mockito::Server::new_async().await;
        let provider = test_provider(&server);

        let upload_server = server
            .mock("GET", "/upload/server")
            .match_query(query(&[]))
            .with_body(format!(
                r#"{{"status":200,"sess_id":"sess1","result":"{}/cgi/upload","msg":"OK"}}"#,
                server.url()
            ))
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/cgi/upload")
            .with_body(r#"[{"file_code":"abc123"}]"#)
            .create_async()
            .await;

        let file_code = provider.upload_file("/", "img.jpg", &payload()).await.unwrap();
        assert_eq!(file_code, "abc123");
        upload_server.assert_async().await;
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_file_sets_destination_folder() {
        let mut server = mockito::Server::new_async().await;
        let provider = test_provider(&server);

        server
            .mock("GET", "/folder/list")
            .match_query(query(&[("fld_id", "0")]))
            .with_body(r#"{"status":200,"msg":"OK","result":{"folders":[{"fld_id":7,"name":"pics"}]}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/upload/server")
            .match_query(query(&[]))
            .with_body(format!(
                r#"{{"status":200,"sess_id":"sess1","result":"{}/cgi/upload","msg":"OK"}}"#,
                server.url()
            ))
            .create_async()
            .await;
        server
            .mock("POST", "/cgi/upload")
            .with_body(r#"[{"file_code":"zzz"}]"#)
            .create_async()
            .await;
        let set_folder = server
            .mock("GET", "/file/set_folder")
            .match_query(query(&[("file_code", "zzz"), ("fld_id", "7")]))
            .with_body(r#"{"status":200,"msg":"OK"}"#)
            .create_async()
            .await;

        let file_code = provider.upload_file("/pics", "img.jpg", &payload()).await.unwrap();
        assert_eq!(file_code, "zzz");
        set_folder.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_file_surfaces_api_error() {
        let mut server = mockito::Server::new_async().await;
        let provider = test_provider(&server);

        server
            .mock("GET", "/folder/list")
            .match_query(query(&[("fld_id", "0")]))
            .with_body(r#"{"status":403,"msg":"Invalid key"}"#)
            .create_async()
            .await;

        let err = provider.upload_file("/pics", "img.jpg", &payload()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown response from server (status: 403): Invalid key"
        );
    }

    #[tokio::test]
    async fn test_upload_file_reports_non_json_multibyte_body() {
        let mut server = mockito::Server::new_async().await;
        let provider = test_provider(&server);

        // Byte 200 lands inside the two-byte 'é'; the clipped snippet in the
        // error must not split it.
        let body = format!("{}é{}", "a".repeat(199), "b".repeat(40));
        server
            .mock("GET", "/folder/list")
            .match_query(query(&[("fld_id", "0")]))
            .with_body(body)
            .create_async()
            .await;

        let err = provider.upload_file("/pics", "img.jpg", &payload()).await.unwrap_err();
        assert!(err.to_string().starts_with("Unknown error: JSON parse error:"));
    }

    #[tokio::test]
    async fn test_upload_file_rejects_non_array_response() {
        let mut server = mockito::Server::new_async().await;
        let provider = test_provider(&server);

        server
            .mock("GET", "/upload/server")
            .match_query(query(&[]))
            .with_body(format!(
                r#"{{"status":200,"sess_id":"sess1","result":"{}/cgi/upload","msg":"OK"}}"#,
                server.url()
            ))
            .create_async()
            .await;
        server
            .mock("POST", "/cgi/upload")
            .with_body("<html>busy</html>")
            .create_async()
            .await;

        let err = provider.upload_file("/", "img.jpg", &payload()).await.unwrap_err();
        assert!(err.to_string().starts_with("Unknown response from server:"));
    }

    #[tokio::test]
    async fn test_validate_credentials() {
        let mut server = mockito::Server::new_async().await;
        let provider = test_provider(&server);

        let ok = server
            .mock("POST", "/account/info")
            .match_body(Matcher::Exact("key=test-key".to_string()))
            .with_body(r#"{"status":200,"msg":"OK"}"#)
            .create_async()
            .await;
        assert!(provider.validate_credentials().await);
        ok.assert_async().await;

        server
            .mock("POST", "/account/info")
            .with_body(r#"{"status":403,"msg":"bad key"}"#)
            .create_async()
            .await;
        assert!(!provider.validate_credentials().await);
    }
}
