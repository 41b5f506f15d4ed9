//! S3 object store
//!
//! Streams an upload into S3 using the multipart upload API: payload chunks
//! are accumulated into parts of at least 5 MiB (the S3 minimum for all but
//! the last part) and uploaded as they fill, so the full encoded object is
//! never held in memory. A failed upload aborts the multipart session so S3
//! does not retain orphaned parts.

use crate::config::S3Config;
use crate::error::{AppError, Result};
use crate::services::storage::{
    BytePayload, IdGenerator, ObjectStore, UploadRequest, UuidIdGenerator,
};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// S3 minimum size for every part except the last
const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Streaming S3 uploader
pub struct S3Store {
    client: Client,
    region: String,
    ids: Arc<dyn IdGenerator>,
}

// `ids` is a trait object, so Debug cannot be derived
impl fmt::Debug for S3Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Store")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3Store {
    /// Create a store with the default UUID object-name generator.
    ///
    /// Fails fast with `AppError::Config` on invalid configuration; this is
    /// a construction-time check, never surfaced per-request.
    pub async fn from_config(config: &S3Config) -> Result<Self> {
        Self::with_id_generator(config, Arc::new(UuidIdGenerator)).await
    }

    /// Create a store with a custom object-name generator
    pub async fn with_id_generator(
        config: &S3Config,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(AppError::Config(
                "S3 bucket name is required to create an uploader".to_string(),
            ));
        }
        if config.access_key_id.is_some() != config.secret_access_key.is_some() {
            return Err(AppError::Config(
                "AWS access key and secret must be provided together".to_string(),
            ));
        }

        let client = build_client(config).await;
        info!(bucket = %config.bucket, region = %config.region, "S3 store initialized");

        Ok(Self {
            client,
            region: config.region.clone(),
            ids,
        })
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<CompletedPart> {
        let resp = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                AppError::Upload(format!("failed to upload part {part_number} of {key}: {e}"))
            })?;

        let etag = resp.e_tag().unwrap_or_default().to_string();
        Ok(CompletedPart::builder()
            .part_number(part_number)
            .e_tag(etag)
            .build())
    }

    /// Drain the payload into numbered parts, uploading each as it fills
    async fn stream_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        payload: &mut BytePayload,
    ) -> Result<Vec<CompletedPart>> {
        let mut parts = Vec::new();
        let mut buf = BytesMut::new();
        let mut part_number: i32 = 1;

        while let Some(chunk) = payload.next().await {
            let chunk =
                chunk.map_err(|e| AppError::Internal(format!("image encoding failed: {e}")))?;
            buf.extend_from_slice(&chunk);

            if buf.len() >= MIN_PART_SIZE {
                let body = buf.split().freeze();
                parts.push(
                    self.upload_part(bucket, key, upload_id, part_number, body)
                        .await?,
                );
                part_number += 1;
            }
        }

        // Final part; S3 requires at least one part to complete the upload
        if !buf.is_empty() || parts.is_empty() {
            let body = buf.split().freeze();
            parts.push(
                self.upload_part(bucket, key, upload_id, part_number, body)
                    .await?,
            );
        }

        Ok(parts)
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("https://{bucket}.s3.{}.amazonaws.com/{key}", self.region)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn upload(&self, mut request: UploadRequest) -> Result<String> {
        let filename = self.ids.generate();
        let key = request.key(&filename);

        let create = self
            .client
            .create_multipart_upload()
            .bucket(&request.bucket)
            .key(&key)
            .content_type(&request.content_type)
            .send()
            .await
            .map_err(|e| {
                AppError::Upload(format!("failed to start multipart upload for {key}: {e}"))
            })?;
        let upload_id = create
            .upload_id()
            .ok_or_else(|| {
                AppError::Upload(format!("S3 returned no upload id for {key}"))
            })?
            .to_string();

        let parts = match self
            .stream_parts(&request.bucket, &key, &upload_id, &mut request.payload)
            .await
        {
            Ok(parts) => parts,
            Err(e) => {
                // Best effort: leave no orphaned parts behind
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&request.bucket)
                    .key(&key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(key = %key, "failed to abort multipart upload: {abort_err}");
                }
                return Err(e);
            }
        };

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();
        let out = self
            .client
            .complete_multipart_upload()
            .bucket(&request.bucket)
            .key(&key)
            .upload_id(&upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| {
                AppError::Upload(format!("failed to complete multipart upload for {key}: {e}"))
            })?;

        let location = out
            .location()
            .map(str::to_string)
            .unwrap_or_else(|| self.object_url(&request.bucket, &key));
        info!(key = %key, location = %location, "object uploaded");

        Ok(location)
    }
}

/// Build an S3 client from configuration.
///
/// Explicit credentials are used when provided; otherwise the default AWS
/// credential chain applies (IAM role, env, profile). A custom endpoint
/// supports S3-compatible storage like MinIO.
async fn build_client(config: &S3Config) -> Client {
    use aws_sdk_s3::config::Region;

    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.region.clone()));

    if let (Some(access_key_id), Some(secret_access_key)) =
        (&config.access_key_id, &config.secret_access_key)
    {
        use aws_sdk_s3::config::Credentials;

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "image_service_s3",
        );
        builder = builder.credentials_provider(credentials);
    }

    if let Some(endpoint) = &config.endpoint {
        builder = builder.endpoint_url(endpoint);
    }

    Client::new(&builder.load().await)
}
