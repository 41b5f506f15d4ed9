//! Upload pipeline orchestrator
//!
//! Drives a raw upload through decode, concurrent fan-out resize, and N
//! concurrent streaming encode/upload pipes, then joins everything and
//! returns the ordered list of storage locations.
//!
//! Failure policy: await-all. Every in-flight upload completes before the
//! call returns; the first failure in spec order is then surfaced. Nothing
//! outlives `run` — if the caller abandons the future, the pipe receivers
//! drop and every encoder unblocks with a broken-pipe error.

pub mod pipe;

use crate::error::{AppError, Result};
use crate::services::resize::{resize_all, CropSize, Resizer};
use crate::services::storage::ObjectStore;
use bytes::Bytes;
use futures::future;
use image::GenericImageView;
use std::sync::Arc;
use tracing::{error, info};

/// Explicit pipeline configuration; replaces the fixed crop-size globals of
/// older designs so nothing process-wide is mutable.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Bucket all variants are uploaded to
    pub bucket: String,
    /// Key prefix, ends with '/'
    pub path_prefix: String,
    /// Variants produced when the caller does not supply its own set
    pub crop_sizes: Vec<CropSize>,
    /// JPEG quality (0-100)
    pub jpeg_quality: u8,
}

impl PipelineConfig {
    pub fn new(bucket: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path_prefix: path_prefix.into(),
            crop_sizes: vec![CropSize::LARGE, CropSize::MEDIUM, CropSize::SMALL],
            jpeg_quality: 85,
        }
    }
}

/// Orchestrates decode -> fan-out resize -> N streaming uploads
pub struct ImagePipeline {
    resizer: Resizer,
    store: Arc<dyn ObjectStore>,
    config: PipelineConfig,
}

impl ImagePipeline {
    pub fn new(store: Arc<dyn ObjectStore>, config: PipelineConfig) -> Self {
        Self {
            resizer: Resizer::new(),
            store,
            config,
        }
    }

    /// Run the pipeline with the configured default crop sizes
    pub async fn run(
        &self,
        data: Bytes,
        content_type: &str,
        file_extension: &str,
    ) -> Result<Vec<String>> {
        self.run_with_sizes(data, content_type, file_extension, &self.config.crop_sizes)
            .await
    }

    /// Run the pipeline for an explicit set of crop sizes.
    ///
    /// Returns one location per size, in the same order the sizes were
    /// supplied.
    pub async fn run_with_sizes(
        &self,
        data: Bytes,
        content_type: &str,
        file_extension: &str,
        sizes: &[CropSize],
    ) -> Result<Vec<String>> {
        if sizes.is_empty() {
            return Err(AppError::BadRequest("no crop sizes supplied".to_string()));
        }

        // Decoding
        let resizer = self.resizer;
        let image = tokio::task::spawn_blocking(move || resizer.decode(&data)).await??;
        let image = Arc::new(image);
        let (width, height) = image.dimensions();
        info!(width, height, variants = sizes.len(), "image decoded");

        // FanningOutResize
        let variants = resize_all(self.resizer, Arc::clone(&image), sizes).await?;

        // StreamingUpload: the key folder comes from the actual output
        // dimensions, which may differ from the requested spec when a
        // dimension was derived from the aspect ratio.
        let uploads: Vec<_> = variants
            .into_iter()
            .map(|variant| {
                let props = variant.props();
                let target = pipe::UploadTarget {
                    bucket: self.config.bucket.clone(),
                    content_type: content_type.to_string(),
                    upload_path: format!("{}{}/", self.config.path_prefix, props.folder()),
                    file_extension: file_extension.to_string(),
                };
                pipe::encode_and_upload(
                    Arc::clone(&self.store),
                    Arc::new(variant.image),
                    self.config.jpeg_quality,
                    target,
                )
            })
            .collect();

        // Aggregating: join every pipe, then surface the first failure
        let results = future::join_all(uploads).await;

        let mut locations = Vec::with_capacity(results.len());
        for (idx, result) in results.into_iter().enumerate() {
            match result {
                Ok(location) => locations.push(location),
                Err(e) => {
                    let size = sizes[idx];
                    error!(
                        index = idx,
                        height = size.height,
                        width = size.width,
                        "variant upload failed: {e}"
                    );
                    return Err(e);
                }
            }
        }

        info!(count = locations.len(), "all variants uploaded");
        Ok(locations)
    }
}
