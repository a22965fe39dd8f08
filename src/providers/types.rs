//! Shared provider types
//!
//! Configuration shapes for the supported storage backends plus the common
//! error type. `ProviderSettings` is the serde-facing form stored in config
//! files; the per-provider config structs hold runtime state with secrets
//! wrapped so they stay out of logs.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    FileLu,
    FileLuS5,
    AwsS3,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderKind::FileLu => "FileLu",
            ProviderKind::FileLuS5 => "FileLu S5",
            ProviderKind::AwsS3 => "AWS S3",
        };
        write!(f, "{}", name)
    }
}

/// Provider settings as stored in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProviderSettings {
    #[serde(rename_all = "camelCase")]
    FileLu { api_key: String },
    #[serde(rename_all = "camelCase")]
    FileLuS5 {
        access_id: String,
        secret_key: String,
        bucket_name: String,
    },
    #[serde(rename_all = "camelCase")]
    AwsS3 {
        access_id: String,
        secret_key: String,
        host_name: String,
        #[serde(default)]
        region: Option<String>,
        bucket_name: String,
        #[serde(default)]
        use_path_style: bool,
    },
}

impl ProviderSettings {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderSettings::FileLu { .. } => ProviderKind::FileLu,
            ProviderSettings::FileLuS5 { .. } => ProviderKind::FileLuS5,
            ProviderSettings::AwsS3 { .. } => ProviderKind::AwsS3,
        }
    }
}

/// Runtime configuration for the FileLu API client.
#[derive(Debug, Clone)]
pub struct FileLuConfig {
    pub api_key: SecretString,
}

/// Runtime configuration for S3-compatible services.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub host_name: String,
    pub region: String,
    pub access_id: String,
    pub secret_key: SecretString,
    pub bucket_name: String,
    pub path_style: bool,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_display() {
        assert_eq!(ProviderKind::FileLu.to_string(), "FileLu");
        assert_eq!(ProviderKind::FileLuS5.to_string(), "FileLu S5");
        assert_eq!(ProviderKind::AwsS3.to_string(), "AWS S3");
    }

    #[test]
    fn test_provider_settings_kind() {
        let settings = ProviderSettings::FileLu { api_key: "k".to_string() };
        assert_eq!(settings.kind(), ProviderKind::FileLu);
    }

    #[test]
    fn test_provider_settings_deserialize_filelu() {
        let json = r#"{"type":"FileLu","apiKey":"abc123"}"#;
        let settings: ProviderSettings = serde_json::from_str(json).unwrap();
        match settings {
            ProviderSettings::FileLu { api_key } => assert_eq!(api_key, "abc123"),
            other => panic!("unexpected settings: {:?}", other),
        }
    }

    #[test]
    fn test_provider_settings_deserialize_aws_s3_defaults() {
        let json = r#"{
            "type": "AwsS3",
            "accessId": "id",
            "secretKey": "secret",
            "hostName": "s3.us-east-1.amazonaws.com",
            "bucketName": "bucket"
        }"#;
        let settings: ProviderSettings = serde_json::from_str(json).unwrap();
        match settings {
            ProviderSettings::AwsS3 { region, use_path_style, host_name, .. } => {
                assert_eq!(region, None);
                assert!(!use_path_style);
                assert_eq!(host_name, "s3.us-east-1.amazonaws.com");
            }
            other => panic!("unexpected settings: {:?}", other),
        }
    }

    #[test]
    fn test_provider_settings_serialize_tagged() {
        let settings = ProviderSettings::FileLuS5 {
            access_id: "id".to_string(),
            secret_key: "secret".to_string(),
            bucket_name: "bucket".to_string(),
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["type"], "FileLuS5");
        assert_eq!(value["bucketName"], "bucket");
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::NetworkError("timed out".to_string());
        assert_eq!(err.to_string(), "Network error: timed out");
        let err = ProviderError::Other("upload rejected".to_string());
        assert_eq!(err.to_string(), "upload rejected");
    }
}
