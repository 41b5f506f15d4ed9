//! Fan-out scheduler for concurrent resizing
//!
//! Runs one blocking resize task per crop size against a shared read-only
//! source image and joins them all before returning. Results come back in
//! the order the sizes were supplied, regardless of task completion order.
//!
//! Failure policy: await-all. A failing branch never cancels its siblings;
//! every task runs to completion and all branch failures are aggregated
//! into a single [`AppError::Resize`].

use crate::error::{AppError, Result};
use crate::services::resize::{CropSize, ResizedVariant, Resizer};
use image::DynamicImage;
use std::sync::Arc;
use tracing::debug;

/// Resize the source image once per crop size, concurrently.
pub async fn resize_all(
    resizer: Resizer,
    image: Arc<DynamicImage>,
    sizes: &[CropSize],
) -> Result<Vec<ResizedVariant>> {
    fan_out(
        move |source: &DynamicImage, size| resizer.resize(source, size),
        image,
        sizes,
    )
    .await
}

/// One blocking task per crop size; `op` does the per-branch work.
async fn fan_out<F>(
    op: F,
    image: Arc<DynamicImage>,
    sizes: &[CropSize],
) -> Result<Vec<ResizedVariant>>
where
    F: Fn(&DynamicImage, CropSize) -> Result<DynamicImage> + Clone + Send + 'static,
{
    let handles: Vec<_> = sizes
        .iter()
        .copied()
        .map(|size| {
            let image = Arc::clone(&image);
            let op = op.clone();
            tokio::task::spawn_blocking(move || {
                op(&image, size).map(|resized| ResizedVariant {
                    size,
                    image: resized,
                })
            })
        })
        .collect();

    // Index-ordered join: output position i always corresponds to sizes[i].
    let mut variants = Vec::with_capacity(handles.len());
    let mut failures = Vec::new();
    for (idx, handle) in handles.into_iter().enumerate() {
        let size = sizes[idx];
        match handle.await {
            Ok(Ok(variant)) => {
                let props = variant.props();
                debug!(
                    requested_height = size.height,
                    requested_width = size.width,
                    height = props.height,
                    width = props.width,
                    "variant resized"
                );
                variants.push(variant);
            }
            Ok(Err(AppError::Resize(msg))) => failures.push(format!("index {idx}: {msg}")),
            Ok(Err(e)) => failures.push(format!("index {idx} ({}X{}): {e}", size.height, size.width)),
            Err(e) => failures.push(format!(
                "index {idx} ({}X{}): resize task panicked: {e}",
                size.height, size.width
            )),
        }
    }

    if failures.is_empty() {
        Ok(variants)
    } else {
        Err(AppError::Resize(failures.join("; ")))
    }
}
