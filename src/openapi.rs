/// OpenAPI documentation for the image service
use utoipa::OpenApi;

use crate::models::{MessageResponse, UploadData, UploadResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Image Service API",
        description = "Concurrent image resizing and streaming upload to object storage",
        version = "0.1.0"
    ),
    paths(crate::handlers::images::upload_image),
    components(schemas(UploadResponse, UploadData, MessageResponse)),
    tags((name = "images", description = "Image upload and resizing"))
)]
pub struct ApiDoc;
