//! The save pipeline.
//!
//! Takes image bytes plus the page they came from, resolves the destination
//! through the naming templates, optionally encrypts the payload, and hands
//! the result to the configured storage provider.

use url::Url;

use crate::config::WicConfig;
use crate::crypto::{self, CryptoError, ENCRYPTED_EXT};
use crate::providers::{FilePayload, ProviderError, ProviderFactory};
use crate::template::{match_templates, TemplateError};

/// Content type used when the source MIME type is unknown and for encrypted
/// containers.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// An image to save and the page context it was grabbed from.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub page_url: Url,
    pub page_title: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Where an image ended up.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// Provider-side identifier, a file code or object key
    pub remote_id: String,
    pub directory: String,
    pub file_name: String,
    /// False when the image went to the default path
    pub matched: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("No storage provider is configured")]
    NoProvider,
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Save one image through the configured provider.
pub async fn save_image(config: &WicConfig, request: SaveRequest) -> Result<SaveOutcome, SaveError> {
    let settings = config.provider.as_ref().ok_or(SaveError::NoProvider)?;

    let resolved = match_templates(
        &config.templates,
        &request.page_url,
        &request.page_title,
        request.mime_type.as_deref(),
    )?;

    let mut file_name = format!("{}{}", resolved.file_name, resolved.extension);
    let mut content_type = request
        .mime_type
        .clone()
        .unwrap_or_else(|| OCTET_STREAM.to_string());
    let mut bytes = request.bytes;

    if resolved.encryption {
        match config.cipher_password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => {
                bytes = crypto::encrypt_payload(password, &bytes)?;
                file_name.push_str(ENCRYPTED_EXT);
                content_type = OCTET_STREAM.to_string();
            }
            None => {
                tracing::warn!(
                    "Template asked for encryption but no cipher password is set, uploading as-is"
                );
            }
        }
    }

    let provider = ProviderFactory::create(settings)?;
    let payload = FilePayload {
        bytes,
        content_type,
        description: resolved.description.clone(),
    };
    let remote_id = provider
        .upload_file(&resolved.directory, &file_name, &payload)
        .await?;

    if resolved.is_matched {
        tracing::info!("Saved {} to {}/{}", remote_id, resolved.directory, file_name);
    } else {
        tracing::warn!(
            "No template matched {}, saved to default path {}/{}",
            request.page_url,
            resolved.directory,
            file_name
        );
    }

    Ok(SaveOutcome {
        remote_id,
        directory: resolved.directory,
        file_name,
        matched: resolved.is_matched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderSettings;
    use crate::template::Template;
    use mockito::Matcher;

    fn request(mime: Option<&str>) -> SaveRequest {
        SaveRequest {
            page_url: Url::parse("https://example.com/photos/1").unwrap(),
            page_title: "t".to_string(),
            mime_type: mime.map(|m| m.to_string()),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }
    }

    fn s3_config(server: &mockito::Server) -> WicConfig {
        WicConfig {
            provider: Some(ProviderSettings::AwsS3 {
                access_id: "id".to_string(),
                secret_key: "secret".to_string(),
                host_name: server.url(),
                region: Some("auto".to_string()),
                bucket_name: "bucket".to_string(),
                use_path_style: true,
            }),
            templates: Vec::new(),
            cipher_password: None,
        }
    }

    #[tokio::test]
    async fn test_save_without_provider_fails() {
        let config = WicConfig::default();
        let err = save_image(&config, request(None)).await.unwrap_err();
        assert!(matches!(err, SaveError::NoProvider));
        assert_eq!(err.to_string(), "No storage provider is configured");
    }

    #[tokio::test]
    async fn test_save_with_matching_template() {
        let mut server = mockito::Server::new_async().await;
        let mut config = s3_config(&server);
        config.templates = vec![Template {
            url: "https://example.com/*".to_string(),
            directory: Some("/shots".to_string()),
            file_name: Some("{host}".to_string()),
            ..Default::default()
        }];

        let put = server
            .mock("PUT", "/bucket/shots/example.com.png")
            .match_header("content-type", "image/png")
            .with_status(200)
            .create_async()
            .await;

        let outcome = save_image(&config, request(Some("image/png"))).await.unwrap();
        assert!(outcome.matched);
        assert_eq!(outcome.remote_id, "shots/example.com.png");
        assert_eq!(outcome.directory, "/shots");
        assert_eq!(outcome.file_name, "example.com.png");
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_save_falls_back_to_default_path() {
        let mut server = mockito::Server::new_async().await;
        let config = s3_config(&server);

        let put = server
            .mock(
                "PUT",
                Matcher::Regex(r"^/bucket/WebImageCategorizer/example\.com/\d{14}\.jpg$".to_string()),
            )
            .with_status(200)
            .create_async()
            .await;

        let outcome = save_image(&config, request(None)).await.unwrap();
        assert!(!outcome.matched);
        assert_eq!(outcome.directory, "/WebImageCategorizer/example.com");
        assert_eq!(outcome.file_name.len(), "00000000000000.jpg".len());
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_save_encrypts_when_template_asks() {
        let mut server = mockito::Server::new_async().await;
        let mut config = s3_config(&server);
        config.cipher_password = Some("hunter2".to_string());
        config.templates = vec![Template {
            url: "*".to_string(),
            directory: Some("/enc".to_string()),
            file_name: Some("{host}".to_string()),
            encryption: true,
            ..Default::default()
        }];

        let put = server
            .mock("PUT", "/bucket/enc/example.com.png.enc")
            .match_header("content-type", OCTET_STREAM)
            .with_status(200)
            .create_async()
            .await;

        let outcome = save_image(&config, request(Some("image/png"))).await.unwrap();
        assert_eq!(outcome.file_name, "example.com.png.enc");
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_save_surfaces_template_errors() {
        let server = mockito::Server::new_async().await;
        let mut config = s3_config(&server);
        config.templates = vec![Template {
            url: "*".to_string(),
            directory: Some("/{bogus}".to_string()),
            ..Default::default()
        }];

        let err = save_image(&config, request(None)).await.unwrap_err();
        match err {
            SaveError::Template(TemplateError::UnsupportedToken(token)) => {
                assert_eq!(token, "{bogus}");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
