//! Storage Providers Module
//!
//! This module provides a unified abstraction layer for the storage backends
//! images can be filed to. All providers implement the `StorageProvider`
//! trait, so the save pipeline works against a common interface regardless
//! of whether uploads go to FileLu, FileLu S5 or an S3-compatible service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        StorageProvider Trait        │
//! │  validate_credentials, upload_file  │
//! └─────────────────────────────────────┘
//!                  │
//!       ┌──────────┼──────────┐
//!       ▼          ▼          ▼
//!  ┌────────┐ ┌─────────┐ ┌────────┐
//!  │ FileLu │ │FileLu S5│ │ AWS S3 │
//!  └────────┘ └─────────┘ └────────┘
//! ```
//!
//! FileLu S5 is not a separate implementation: it is the S3 provider pinned
//! to the s5lu.com endpoint with path-style addressing.

pub mod filelu;
pub mod http;
pub mod s3;
pub mod types;

pub use filelu::FileLuProvider;
pub use s3::S3Provider;
pub use types::*;

use async_trait::async_trait;

/// File content and metadata handed to a provider for upload.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub description: Option<String>,
}

/// Unified storage provider trait
///
/// All storage backends must implement this trait. Providers are stateless
/// HTTP clients; there is no connection to open or close.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Get the provider kind identifier
    fn kind(&self) -> ProviderKind;

    /// Check that the configured credentials are usable.
    ///
    /// Never returns an error: any failure is logged and reported as
    /// `false` so callers can surface a simple yes/no to the user.
    async fn validate_credentials(&self) -> bool;

    /// Upload a file into `directory` under `file_name`, creating missing
    /// folders along the way. Returns a provider-specific identifier for
    /// the stored file.
    async fn upload_file(
        &self,
        directory: &str,
        file_name: &str,
        payload: &FilePayload,
    ) -> Result<String, ProviderError>;
}

/// Provider factory for creating provider instances
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a new provider instance based on configuration
    pub fn create(settings: &ProviderSettings) -> Result<Box<dyn StorageProvider>, ProviderError> {
        match settings {
            ProviderSettings::FileLu { api_key } => {
                if api_key.is_empty() {
                    return Err(ProviderError::InvalidConfig(
                        "API key is required for FileLu".to_string(),
                    ));
                }
                let config = FileLuConfig {
                    api_key: api_key.clone().into(),
                };
                Ok(Box::new(FileLuProvider::new(config)))
            }
            ProviderSettings::FileLuS5 {
                access_id,
                secret_key,
                bucket_name,
            } => {
                if access_id.is_empty() || secret_key.is_empty() {
                    return Err(ProviderError::InvalidConfig(
                        "Access ID and secret key are required for FileLu S5".to_string(),
                    ));
                }
                if bucket_name.is_empty() {
                    return Err(ProviderError::InvalidConfig(
                        "Bucket name is required for FileLu S5".to_string(),
                    ));
                }
                Ok(Box::new(S3Provider::filelu_s5(access_id, secret_key, bucket_name)))
            }
            ProviderSettings::AwsS3 {
                access_id,
                secret_key,
                host_name,
                region,
                bucket_name,
                use_path_style,
            } => {
                if access_id.is_empty() || secret_key.is_empty() {
                    return Err(ProviderError::InvalidConfig(
                        "Access ID and secret key are required for S3".to_string(),
                    ));
                }
                if host_name.is_empty() {
                    return Err(ProviderError::InvalidConfig(
                        "Host name is required for S3".to_string(),
                    ));
                }
                if bucket_name.is_empty() {
                    return Err(ProviderError::InvalidConfig(
                        "Bucket name is required for S3".to_string(),
                    ));
                }
                let config = S3Config {
                    host_name: host_name.clone(),
                    region: region
                        .clone()
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "auto".to_string()),
                    access_id: access_id.clone(),
                    secret_key: secret_key.clone().into(),
                    bucket_name: bucket_name.clone(),
                    path_style: *use_path_style,
                };
                Ok(Box::new(S3Provider::new(config)))
            }
        }
    }

    /// Get list of all supported provider kinds
    pub fn supported_kinds() -> Vec<ProviderKind> {
        vec![ProviderKind::FileLu, ProviderKind::FileLuS5, ProviderKind::AwsS3]
    }
}
