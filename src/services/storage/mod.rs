//! Object storage abstraction
//!
//! The pipeline talks to a [`ObjectStore`] trait object so the streaming
//! encode/upload path can be exercised against an in-memory store in tests.
//! The production implementation is the S3 store in [`s3`].

pub mod s3;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

pub use s3::S3Store;

/// Ordered byte stream fed into an upload, produced incrementally by the
/// encoder. An `Err` item signals that the producer failed mid-stream.
pub type BytePayload = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + 'static>>;

/// Request structure for a single streamed upload
pub struct UploadRequest {
    /// Bucket the object is written to
    pub bucket: String,
    /// Content type recorded on the stored object
    pub content_type: String,
    /// Logical folder prefix, ends with '/'
    pub upload_path: String,
    /// Extension appended to the generated object name
    pub file_extension: String,
    /// The encoded bytes, streamed
    pub payload: BytePayload,
}

impl UploadRequest {
    /// Full object key for the given generated file name
    pub fn key(&self, filename: &str) -> String {
        format!("{}{}.{}", self.upload_path, filename, self.file_extension)
    }
}

/// Blob store contract: consume a streamed payload, return the location URI
/// of the stored object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, request: UploadRequest) -> Result<String>;
}

/// Pluggable generator for unique object names, injectable in tests
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Default generator: random v4 UUID, hyphens stripped, uppercased
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().simple().to_string().to_uppercase()
    }
}
