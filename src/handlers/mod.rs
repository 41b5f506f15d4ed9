/// HTTP handlers for image upload endpoints
pub mod images;

pub use images::upload_image;
