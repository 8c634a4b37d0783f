use chrono::Utc;
use futures::future::join_all;

use crate::storage::StorageService;

/// UploadedFile
///
/// One file buffer lifted out of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// StoredBlob
///
/// The durable outcome of one successful upload: everything a media row
/// needs. `order` is the file's 0-based position within the submitted batch.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub media_url: String,
    pub content_type: String,
    pub format: String,
    pub size: i64,
    pub order: i32,
}

/// Storage key for an upload: time-based prefix plus the original filename,
/// collision-resistant enough for a single bucket namespace.
pub fn storage_key(file_name: &str) -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), file_name)
}

/// File extension recorded as the media `format`. Mirrors a trailing-segment
/// split: a name without a dot yields the whole name.
pub fn file_format(file_name: &str) -> String {
    file_name.rsplit('.').next().unwrap_or(file_name).to_string()
}

/// Recovers the storage key from a public URL by percent-decoding its
/// trailing path segment. `None` only for a URL with no path segments.
pub fn storage_key_from_url(url: &str) -> Option<String> {
    let segment = url.rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }
    Some(
        urlencoding::decode(segment)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| segment.to_string()),
    )
}

/// MediaManager
///
/// Generic attach/detach logic over the blob store, shared by activity
/// media, news media, organization images, avatars and credential photos.
/// Row persistence stays with the caller; this type only owns blob traffic
/// and the per-batch failure policy.
pub struct MediaManager<'a> {
    storage: &'a dyn StorageService,
}

impl<'a> MediaManager<'a> {
    pub fn new(storage: &'a dyn StorageService) -> Self {
        Self { storage }
    }

    /// Uploads one file, returning what the media row needs. Used for the
    /// single-file fields (organization image, avatar, credential photo).
    pub async fn attach_one(
        &self,
        bucket: &str,
        file: &UploadedFile,
    ) -> Result<StoredBlob, String> {
        let key = storage_key(&file.file_name);
        self.storage
            .upload(bucket, &key, file.bytes.clone(), &file.content_type)
            .await?;
        Ok(StoredBlob {
            media_url: self.storage.public_url(bucket, &key),
            content_type: file.content_type.clone(),
            format: file_format(&file.file_name),
            size: file.bytes.len() as i64,
            order: 0,
        })
    }

    /// Uploads a batch concurrently, one task per file, joined before
    /// returning. A failed file is logged and skipped rather than aborting
    /// the batch; the caller decides what an empty result means. Each
    /// success carries its submission index as `order`.
    pub async fn attach_batch(
        &self,
        bucket: &str,
        files: &[UploadedFile],
    ) -> Vec<StoredBlob> {
        let uploads = files.iter().enumerate().map(|(index, file)| async move {
            let key = storage_key(&file.file_name);
            match self
                .storage
                .upload(bucket, &key, file.bytes.clone(), &file.content_type)
                .await
            {
                Ok(()) => Some(StoredBlob {
                    media_url: self.storage.public_url(bucket, &key),
                    content_type: file.content_type.clone(),
                    format: file_format(&file.file_name),
                    size: file.bytes.len() as i64,
                    order: index as i32,
                }),
                Err(e) => {
                    tracing::error!(bucket, key, error = %e, "media upload failed, skipping file");
                    None
                }
            }
        });

        join_all(uploads).await.into_iter().flatten().collect()
    }

    /// Batched blob delete keyed off public URLs. Failures are logged and
    /// swallowed: row deletion must never be blocked by the blob store,
    /// which can leave orphaned blobs (known, accepted gap).
    pub async fn detach_batch(&self, bucket: &str, urls: &[String]) {
        let keys: Vec<String> = urls.iter().filter_map(|u| storage_key_from_url(u)).collect();
        if keys.is_empty() {
            return;
        }
        if let Err(e) = self.storage.delete_objects(bucket, &keys).await {
            tracing::error!(bucket, error = %e, "blob delete failed, rows removed anyway");
        }
    }
}
