//! S3 object storage client
//!
//! Provides [`S3Client`] for fetching objects from the configured bucket,
//! the [`download`] entry point, and [`RemoteCsvExtractor`] which feeds a
//! downloaded CSV into the ETL pipeline.

use crate::error::{BoxError, PlatformError};
use crate::etl::Extractor;
use crate::settings::{S3Config, Settings};
use crate::storage::{ensure_dir, read_csv};

use arrow::record_batch::RecordBatch;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use eyre::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Bucket-scoped S3 client
///
/// Built from an already validated [`S3Config`]; building the client does
/// not touch the network.
#[derive(Clone, Debug)]
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    pub fn new(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            config.session_token.clone(),
            None,
            "data-platform",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint_url {
            // S3-compatible stores (MinIO, localstack) want path-style URLs
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Stream object `key` into the local file `dest_path`
    ///
    /// # Errors
    /// [`PlatformError::Transfer`] for any request or stream failure; local
    /// file errors are reported as I/O errors.
    pub async fn download_to(&self, key: &str, dest_path: &Path) -> Result<()> {
        let transfer = |source: BoxError| PlatformError::Transfer {
            key: key.to_string(),
            source,
        };

        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| transfer(Box::new(e)))?;

        let mut file = tokio::fs::File::create(dest_path)
            .await
            .with_context(|| format!("Failed to create {}", dest_path.display()))?;

        let mut body = object.body;
        let mut written = 0usize;
        while let Some(chunk) = body.try_next().await.map_err(|e| transfer(Box::new(e)))? {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", dest_path.display()))?;
            written += chunk.len();
        }
        file.flush().await?;

        log::debug!("Wrote {} bytes to {}", written, dest_path.display());
        Ok(())
    }

    /// Upload `body` as object `key` with the given user metadata
    pub async fn upload(&self, key: &str, body: Vec<u8>, metadata: &[(&str, String)]) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body));
        for (name, value) in metadata {
            request = request.metadata(*name, value);
        }

        request.send().await.map_err(|e| PlatformError::Transfer {
            key: key.to_string(),
            source: Box::new(e),
        })?;
        Ok(())
    }
}

/// Local file name for an object key: the last `/`-separated segment
pub fn object_file_name(key: &str) -> Result<&str> {
    match key.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => Ok(name),
        _ => eyre::bail!("S3 key '{}' does not name a file", key),
    }
}

/// Download `key` from the configured bucket
///
/// The object lands in `destination_dir` (default: the raw directory) under
/// the key's base file name; directory components of the key are dropped.
///
/// # Errors
/// - [`PlatformError::Configuration`] if the bucket or credentials are
///   missing, before any network call
/// - [`PlatformError::Transfer`] if the fetch fails
pub async fn download(
    settings: &Settings,
    key: &str,
    destination_dir: Option<&Path>,
) -> Result<PathBuf> {
    let config = settings.s3()?;
    let file_name = object_file_name(key)?;
    let dest_dir = ensure_dir(destination_dir.unwrap_or(&settings.raw_dir))?;
    let dest_path = dest_dir.join(file_name);

    let client = S3Client::new(&config);
    log::info!(
        "Downloading s3://{}/{} to {}",
        client.bucket(),
        key,
        dest_path.display()
    );
    client.download_to(key, &dest_path).await?;

    Ok(dest_path)
}

/// Extracts a table from a CSV object in S3
///
/// The object is first downloaded into the raw directory, then read like a
/// local file.
pub struct RemoteCsvExtractor<'a> {
    settings: &'a Settings,
    key: String,
}

impl<'a> RemoteCsvExtractor<'a> {
    pub fn new(settings: &'a Settings, key: impl Into<String>) -> Self {
        Self {
            settings,
            key: key.into(),
        }
    }
}

impl Extractor for RemoteCsvExtractor<'_> {
    type Item = RecordBatch;

    async fn extract(&self) -> Result<Self::Item> {
        let local_path = download(self.settings, &self.key, None).await?;
        log::info!("Downloaded {} to {}", self.key, local_path.display());
        read_csv(&local_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_object_file_name() {
        assert_eq!(object_file_name("exports/2024/input.csv").unwrap(), "input.csv");
        assert_eq!(object_file_name("input.csv").unwrap(), "input.csv");
        assert!(object_file_name("exports/").is_err());
        assert!(object_file_name("exports/..").is_err());
        assert!(object_file_name("").is_err());
    }

    #[tokio::test]
    async fn test_download_without_bucket_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let settings = Settings {
            aws_access_key_id: Some("AKIA".to_string()),
            aws_secret_access_key: Some("secret".to_string()),
            ..Settings::with_data_dir(temp.path())
        };

        let err = download(&settings, "exports/input.csv", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PlatformError>(),
            Some(PlatformError::Configuration(_))
        ));
        // Nothing was prepared locally either
        assert!(!settings.raw_dir.exists());
    }

    #[tokio::test]
    async fn test_remote_extractor_without_credentials() {
        let settings = Settings {
            s3_bucket: Some("landing".to_string()),
            ..Settings::default()
        };

        let err = RemoteCsvExtractor::new(&settings, "input.csv")
            .extract()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("AWS credentials"));
    }

    #[test]
    fn test_client_is_bucket_scoped() {
        let config = S3Config {
            bucket: "landing".to_string(),
            access_key_id: "AKIA".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
            region: "eu-west-1".to_string(),
            endpoint_url: Some("http://localhost:9000".to_string()),
        };

        let client = S3Client::new(&config);
        assert_eq!(client.bucket(), "landing");
    }
}
