use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

// Presigned upload URLs expire after 10 minutes.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// StorageError
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid presigning configuration: {0}")]
    Presigning(String),
    #[error("storage request failed: {0}")]
    Request(String),
    #[error("simulated storage failure")]
    Simulated,
}

/// StorageService
///
/// Contract for the object storage holding course images. Handlers only ever see this
/// trait, so tests swap in `MockStorageService`.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in `Env::Local` to provision MinIO.
    async fn ensure_bucket_exists(&self) -> Result<(), StorageError>;

    /// Generates a signed URL allowing a client to PUT one object directly to the bucket.
    ///
    /// # Arguments
    /// * `key`: The final object key in the bucket.
    /// * `content_type`: The MIME type the upload is constrained to (e.g. "image/png").
    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Key prefix of every course image object.
pub const COURSE_IMAGE_PREFIX: &str = "courses/";

/// Builds the object key for a course image from the client's filename:
/// `courses/<uuid>.<ext>`, falling back to `bin` when there is no extension.
pub fn course_image_key(filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(sanitize_extension)
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".to_string());
    format!("{}{}.{}", COURSE_IMAGE_PREFIX, Uuid::new_v4(), extension)
}

fn sanitize_extension(ext: &str) -> String {
    ext.chars()
        .filter(char::is_ascii_alphanumeric)
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase()
}

/// S3StorageClient
///
/// The AWS SDK implementation. S3 compatibility covers both a dockerized MinIO in local
/// development and a hosted S3 endpoint in production.
///
/// `force_path_style(true)` is required for MinIO.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    /// Constructs the S3 client from the storage fields of `AppConfig`.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_bucket_exists
    ///
    /// Treats "already owned by you" as success so startup can call this unconditionally.
    async fn ensure_bucket_exists(&self) -> Result<(), StorageError> {
        match self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket_name, "created storage bucket");
                Ok(())
            }
            Err(e) => {
                let already_there = e
                    .as_service_error()
                    .is_some_and(|svc| svc.is_bucket_already_owned_by_you() || svc.is_bucket_already_exists());
                if already_there {
                    Ok(())
                } else {
                    Err(StorageError::Request(e.to_string()))
                }
            }
        }
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
            .map_err(|e| StorageError::Presigning(e.to_string()))?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            // The client's PUT must carry this exact Content-Type.
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        Ok(presigned_req.uri().to_string())
    }
}

/// sanitize_key
///
/// Removes directory navigation components (`..`, `.`) and empty segments from a key.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// `StorageService` for tests: deterministic local-style URLs, no network.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) -> Result<(), StorageError> {
        if self.should_fail {
            return Err(StorageError::Simulated);
        }
        Ok(())
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Simulated);
        }

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
