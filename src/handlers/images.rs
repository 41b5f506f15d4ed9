/// Image upload handler
///
/// Accepts a multipart form with a field named `image`, runs the
/// resize/upload pipeline, and responds with the ordered storage locations.
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{MessageResponse, UploadData, UploadResponse};
use crate::services::ImagePipeline;

/// Content type recorded on stored objects, from the uploaded file name
fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Upload an image and create resized variants
///
/// `POST /api/v1/images`
#[utoipa::path(
    post,
    path = "/api/v1/images",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Variants uploaded", body = UploadResponse),
        (status = 400, description = "Invalid image or pipeline failure", body = MessageResponse),
    ),
    tag = "images"
)]
pub async fn upload_image(
    pipeline: web::Data<Arc<ImagePipeline>>,
    config: web::Data<Config>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let max_bytes = config.upload.max_upload_bytes;

    let mut data = BytesMut::new();
    let mut filename = String::new();
    let mut found_field = false;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("multipart error: {e}")))?;

        let Some(cd) = field.content_disposition() else {
            continue;
        };
        if cd.get_name() != Some("image") {
            continue;
        }
        found_field = true;
        if let Some(name) = cd.get_filename() {
            filename = name.to_string();
        }

        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::BadRequest(format!("error reading upload: {e}")))?;
            if data.len() + chunk.len() > max_bytes {
                return Err(AppError::BadRequest(format!(
                    "image exceeds maximum upload size of {max_bytes} bytes"
                )));
            }
            data.extend_from_slice(&chunk);
        }
    }

    if !found_field || data.is_empty() {
        return Err(AppError::BadRequest("Invalid image".to_string()));
    }

    let extension = filename
        .rsplit('.')
        .next()
        .filter(|ext| !ext.is_empty())
        .map(str::to_lowercase)
        .unwrap_or_else(|| "jpg".to_string());
    let content_type = content_type_for(&extension);

    let locations = pipeline
        .run(Bytes::from(data), content_type, &extension)
        .await?;

    Ok(HttpResponse::Created().json(UploadResponse {
        message: "Image successfully uploaded".to_string(),
        data: UploadData { locations },
    }))
}
