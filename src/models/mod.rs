/// API response models
use serde::Serialize;
use utoipa::ToSchema;

/// Success envelope for the upload endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub data: UploadData,
}

/// Storage locations of the uploaded variants, in requested-spec order
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadData {
    pub locations: Vec<String>,
}

/// Plain message envelope (welcome, errors)
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
