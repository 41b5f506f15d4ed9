/// Service layer for the resize/upload pipeline
///
/// - `resize`: image decoding, variant resizing, and the fan-out scheduler
/// - `storage`: blob-store abstraction and the S3 implementation
/// - `pipeline`: streaming encode/upload pipes and the orchestrator
pub mod pipeline;
pub mod resize;
pub mod storage;

pub use pipeline::{ImagePipeline, PipelineConfig};
pub use resize::{CropSize, ImageProps, ResizedVariant, Resizer};
pub use storage::{IdGenerator, ObjectStore, S3Store, UploadRequest, UuidIdGenerator};
