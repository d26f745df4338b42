use async_trait::async_trait;
use bytes::Bytes;
use s3::bucket::Bucket;
use s3::bucket_ops::BucketConfiguration;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use std::collections::HashMap;
use tracing::{error, info};

use super::{bucket_spec, ObjectStore, StorageError, BUCKETS};
use crate::config::StorageConfig;

impl From<S3Error> for StorageError {
    fn from(err: S3Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// S3-compatible storage gateway. Buckets are addressed by logical name and
/// resolved to `{prefix}-{logical}`; requests use path-style addressing so
/// MinIO-style endpoints work unchanged.
pub struct S3Storage {
    buckets: HashMap<&'static str, Box<Bucket>>,
    region: Region,
    credentials: Credentials,
    prefix: String,
}

impl S3Storage {
    pub fn new(config: &StorageConfig) -> anyhow::Result<Self> {
        let region = Region::Custom {
            region: config.s3_region.clone(),
            endpoint: config.s3_endpoint.clone(),
        };
        let credentials = Credentials::new(
            config.s3_access_key_id.as_deref(),
            config.s3_secret_access_key.as_deref(),
            None,
            None,
            None,
        )?;

        let mut buckets = HashMap::new();
        for spec in BUCKETS {
            let name = format!("{}-{}", config.bucket_prefix, spec.logical);
            let bucket =
                Bucket::new(&name, region.clone(), credentials.clone())?.with_path_style();
            buckets.insert(spec.logical, Box::new(bucket));
        }

        Ok(Self {
            buckets,
            region,
            credentials,
            prefix: config.bucket_prefix.clone(),
        })
    }

    fn bucket(&self, logical: &str) -> Result<&Bucket, StorageError> {
        self.buckets
            .get(logical)
            .map(|b| b.as_ref())
            .ok_or_else(|| StorageError::UnknownBucket(logical.to_string()))
    }

    /// Create every declared bucket that does not exist yet. Failures are
    /// logged and skipped so a partially-available backend never blocks boot.
    pub async fn ensure_buckets(&self) {
        for spec in BUCKETS {
            let name = format!("{}-{}", self.prefix, spec.logical);
            let bucket = match self.bucket(spec.logical) {
                Ok(bucket) => bucket,
                Err(_) => continue,
            };

            match bucket.exists().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => {
                    error!("Could not check bucket {}: {}", name, err);
                    continue;
                }
            }

            info!("Creating bucket {}", name);
            let configuration = if spec.public {
                BucketConfiguration::public()
            } else {
                BucketConfiguration::default()
            };
            if let Err(err) = Bucket::create_with_path_style(
                &name,
                self.region.clone(),
                self.credentials.clone(),
                configuration,
            )
            .await
            {
                error!("Error creating bucket {}: {}", name, err);
            } else {
                info!("Bucket {} created successfully", name);
            }
        }
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let spec = bucket_spec(bucket)
            .ok_or_else(|| StorageError::UnknownBucket(bucket.to_string()))?;
        spec.check_upload(content_type, bytes.len())?;

        self.bucket(bucket)?
            .put_object_with_content_type(path, &bytes, content_type)
            .await?;
        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        ttl_secs: u32,
    ) -> Result<String, StorageError> {
        let url = self.bucket(bucket)?.presign_get(path, ttl_secs, None).await?;
        Ok(url)
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        self.bucket(bucket)?.delete_object(path).await?;
        Ok(())
    }
}
