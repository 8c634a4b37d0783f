use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use s3::types::{Delete, ObjectIdentifier};
use std::sync::{Arc, Mutex};

/// StorageService
///
/// Abstract contract for the object storage layer: a key-value blob store
/// with upload, public-URL retrieval and batched delete-by-key. The concrete
/// implementation is the AWS S3 client (MinIO locally, Supabase Storage in
/// production); tests substitute the in-memory mock.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the named bucket exists. Idempotent; used at local startup to
    /// provision the MinIO buckets.
    async fn ensure_bucket_exists(&self, bucket: &str);

    /// Uploads a blob. Returns an opaque error string; callers decide whether
    /// the failure is fatal or a per-item skip.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), String>;

    /// The public URL under which an uploaded key is served. Pure; no I/O.
    fn public_url(&self, bucket: &str, key: &str) -> String;

    /// Batched delete-by-key. A single failure fails the whole batch report,
    /// but callers treat that as log-and-continue (see the media manager).
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), String>;
}

/// StorageState
///
/// The shared trait-object handle stored in the application state.
pub type StorageState = Arc<dyn StorageService>;

// Bucket names, one per attachment kind.
pub const BUCKET_ACTIVITY_MEDIA: &str = "activity-media";
pub const BUCKET_NEWS_MEDIA: &str = "news-media";
pub const BUCKET_ORGANIZATION_IMAGES: &str = "organization-images";
pub const BUCKET_AVATARS: &str = "avatars";
pub const BUCKET_CREDENTIALS: &str = "credentials";

pub const ALL_BUCKETS: &[&str] = &[
    BUCKET_ACTIVITY_MEDIA,
    BUCKET_NEWS_MEDIA,
    BUCKET_ORGANIZATION_IMAGES,
    BUCKET_AVATARS,
    BUCKET_CREDENTIALS,
];

/// S3StorageClient
///
/// Concrete implementation over the AWS SDK. Path-style addressing is forced
/// for MinIO and Supabase Storage gateway compatibility, and public URLs are
/// derived path-style from the configured endpoint.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    endpoint: String,
}

impl S3StorageClient {
    pub async fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str) -> Self {
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
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self, bucket: &str) {
        // CreateBucket is idempotent; errors here are non-fatal at startup.
        let _ = self.client.create_bucket().bucket(bucket).send().await;
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), String> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint,
            bucket,
            urlencoding::encode(key)
        )
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), String> {
        if keys.is_empty() {
            return Ok(());
        }

        let objects = keys
            .iter()
            .map(|k| ObjectIdentifier::builder().key(k).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|e| e.to_string())?;

        self.client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

// --- Mock implementation for tests ---

#[derive(Default)]
struct MockInner {
    uploads: Vec<(String, String)>, // (bucket, key)
    deleted: Vec<(String, String)>,
}

/// MockStorageService
///
/// In-memory `StorageService` used by unit and integration tests. Records
/// every upload and delete so assertions can inspect blob traffic, and can
/// simulate per-file upload failures through a key marker.
#[derive(Clone, Default)]
pub struct MockStorageService {
    inner: Arc<Mutex<MockInner>>,
    fail_all: bool,
    // Uploads whose key contains this marker fail; everything else succeeds.
    fail_key_marker: Option<String>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn failing_keys_containing(marker: &str) -> Self {
        Self {
            fail_key_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub fn uploaded_keys(&self, bucket: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .uploads
            .iter()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn deleted_keys(&self, bucket: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .deleted
            .iter()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self, _bucket: &str) {}

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), String> {
        if self.fail_all {
            return Err("Mock Storage Error: simulated outage".to_string());
        }
        if let Some(marker) = &self.fail_key_marker {
            if key.contains(marker.as_str()) {
                return Err(format!("Mock Storage Error: refusing key {key}"));
            }
        }
        self.inner
            .lock()
            .unwrap()
            .uploads
            .push((bucket.to_string(), key.to_string()));
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "http://localhost:9000/{}/{}",
            bucket,
            urlencoding::encode(key)
        )
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), String> {
        if self.fail_all {
            return Err("Mock Storage Error: simulated outage".to_string());
        }
        let mut inner = self.inner.lock().unwrap();
        for key in keys {
            inner.deleted.push((bucket.to_string(), key.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_records_uploads_per_bucket() {
        let mock = MockStorageService::new();
        mock.upload(BUCKET_AVATARS, "a.png", vec![1], "image/png")
            .await
            .unwrap();
        mock.upload(BUCKET_NEWS_MEDIA, "b.png", vec![2], "image/png")
            .await
            .unwrap();

        assert_eq!(mock.uploaded_keys(BUCKET_AVATARS), vec!["a.png"]);
        assert_eq!(mock.uploaded_keys(BUCKET_NEWS_MEDIA), vec!["b.png"]);
    }

    #[tokio::test]
    async fn mock_fails_marked_keys_only() {
        let mock = MockStorageService::failing_keys_containing("broken");
        assert!(mock
            .upload(BUCKET_NEWS_MEDIA, "1-broken.png", vec![], "image/png")
            .await
            .is_err());
        assert!(mock
            .upload(BUCKET_NEWS_MEDIA, "1-fine.png", vec![], "image/png")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn mock_public_url_percent_encodes() {
        let mock = MockStorageService::new();
        let url = mock.public_url(BUCKET_ACTIVITY_MEDIA, "17000-my file.png");
        assert!(url.ends_with("/activity-media/17000-my%20file.png"));
    }

    #[tokio::test]
    async fn s3_client_construction_does_not_panic() {
        let _client = S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
        )
        .await;
    }
}
