//! Object storage gateway.
//!
//! Named buckets with a declared MIME/size policy, uploads, and time-limited
//! signed URLs. Buckets are provisioned idempotently at startup; a failure to
//! create one is logged, not fatal.

use async_trait::async_trait;
use bytes::Bytes;

pub mod s3_client;

pub use s3_client::S3Storage;

/// Logical bucket names. Physical names are `{prefix}-{logical}`.
pub const COURSE_MATERIALS: &str = "course-materials";
pub const BLOG_THUMBNAILS: &str = "blog-thumbnails";
pub const BLOG_IMAGES: &str = "blog-images";
pub const BLOG_VIDEOS: &str = "blog-videos";

/// Signed-URL lifetime recorded on a material at upload time.
pub const UPLOAD_URL_TTL_SECS: u32 = 60 * 60 * 24 * 365;
/// Signed-URL lifetime for URLs re-issued on every list/read.
pub const LIST_URL_TTL_SECS: u32 = 60 * 60 * 24;

pub struct BucketSpec {
    pub logical: &'static str,
    pub public: bool,
    pub allowed_mime_types: &'static [&'static str],
    pub max_size_bytes: usize,
}

impl BucketSpec {
    /// Enforce the declared policy before an upload reaches the backend.
    pub fn check_upload(&self, content_type: &str, size: usize) -> Result<(), StorageError> {
        if !self.allowed_mime_types.contains(&content_type) {
            return Err(StorageError::PolicyViolation(format!(
                "content type {} not allowed in bucket {}",
                content_type, self.logical
            )));
        }
        if size > self.max_size_bytes {
            return Err(StorageError::PolicyViolation(format!(
                "object of {} bytes exceeds {} byte limit for bucket {}",
                size, self.max_size_bytes, self.logical
            )));
        }
        Ok(())
    }
}

pub const BUCKETS: &[BucketSpec] = &[
    BucketSpec {
        logical: COURSE_MATERIALS,
        public: false,
        allowed_mime_types: &[
            "application/pdf",
            "application/msword",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "video/mp4",
            "video/webm",
            "image/jpeg",
            "image/png",
            "image/webp",
            "text/plain",
        ],
        max_size_bytes: 100 * 1024 * 1024,
    },
    BucketSpec {
        logical: BLOG_THUMBNAILS,
        public: true,
        allowed_mime_types: &["image/jpeg", "image/png", "image/webp", "image/gif"],
        max_size_bytes: 5 * 1024 * 1024,
    },
    BucketSpec {
        logical: BLOG_IMAGES,
        public: true,
        allowed_mime_types: &["image/jpeg", "image/png", "image/webp", "image/gif"],
        max_size_bytes: 10 * 1024 * 1024,
    },
    BucketSpec {
        logical: BLOG_VIDEOS,
        public: true,
        allowed_mime_types: &["video/mp4", "video/webm", "video/quicktime"],
        max_size_bytes: 200 * 1024 * 1024,
    },
];

pub fn bucket_spec(logical: &str) -> Option<&'static BucketSpec> {
    BUCKETS.iter().find(|spec| spec.logical == logical)
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object storage error: {0}")]
    Backend(String),

    #[error("{0}")]
    PolicyViolation(String),

    #[error("unknown bucket: {0}")]
    UnknownBucket(String),
}

/// Binary object storage, addressed by logical bucket name and object path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;

    async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        ttl_secs: u32,
    ) -> Result<String, StorageError>;

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), StorageError>;
}
