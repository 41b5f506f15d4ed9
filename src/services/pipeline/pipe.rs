//! Streaming encoder/uploader pipe
//!
//! Connects a JPEG encoder (producer) to an object-store upload (consumer)
//! through a bounded in-memory byte channel. Encoding runs on the blocking
//! thread pool and overlaps with the upload; the full encoded output is
//! never materialized. The channel is bounded, so a slow consumer
//! back-pressures the encoder instead of letting it run ahead.
//!
//! Shutdown semantics:
//! - dropping the writer closes the channel, which the consumer sees as a
//!   clean end-of-stream;
//! - an encode failure pushes an explicit `Err` chunk first, so a truncated
//!   stream is never mistaken for end-of-stream;
//! - if the consumer goes away first, the writer's next send fails with
//!   `BrokenPipe` and the encoder stops promptly instead of blocking.

use crate::error::{AppError, Result};
use crate::services::storage::{BytePayload, ObjectStore, UploadRequest};
use bytes::{Bytes, BytesMut};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Chunks the pipe buffers before the producer blocks
const PIPE_CAPACITY: usize = 4;
/// Target size of each chunk pushed through the pipe
const CHUNK_SIZE: usize = 32 * 1024;

/// Everything the upload side needs besides the payload itself
pub(crate) struct UploadTarget {
    pub bucket: String,
    pub content_type: String,
    pub upload_path: String,
    pub file_extension: String,
}

/// `std::io::Write` adapter that feeds the byte channel in fixed-size
/// chunks. Must only be used from a blocking context.
struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buf: BytesMut,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buf: BytesMut::with_capacity(CHUNK_SIZE),
        }
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = self.buf.split().freeze();
        self.tx.blocking_send(Ok(chunk)).map_err(|_| {
            io::Error::new(
                io::ErrorKind::BrokenPipe,
                "upload side of the pipe is gone",
            )
        })
    }

    /// Push an explicit error marker to the consumer before closing
    fn fail(self, err: io::Error) {
        let _ = self.tx.blocking_send(Err(err));
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_SIZE {
            self.send_buffered()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8, writer: &mut ChannelWriter) -> io::Result<()> {
    // JPEG has no alpha channel; encode from an RGB view of the raster
    let rgb = image.to_rgb8();
    JpegEncoder::new_with_quality(&mut *writer, quality)
        .encode_image(&rgb)
        .map_err(|e| match e {
            ImageError::IoError(io_err) => io_err,
            other => io::Error::new(io::ErrorKind::Other, other),
        })?;
    writer.flush()
}

/// Encode the image as JPEG and upload it concurrently, returning the
/// stored object's location.
///
/// Returns only after both the encode task and the upload call have
/// completed; no background work survives this function.
pub(crate) async fn encode_and_upload(
    store: Arc<dyn ObjectStore>,
    image: Arc<DynamicImage>,
    quality: u8,
    target: UploadTarget,
) -> Result<String> {
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(PIPE_CAPACITY);

    let encoder = tokio::task::spawn_blocking(move || {
        let mut writer = ChannelWriter::new(tx);
        match encode_jpeg(&image, quality, &mut writer) {
            Ok(()) => Ok(()),
            Err(err) => {
                let reported = io::Error::new(err.kind(), err.to_string());
                writer.fail(reported);
                Err(err)
            }
        }
        // writer (or its tx clone inside fail) is dropped here: end-of-stream
    });

    let payload: BytePayload = Box::pin(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }));

    let upload = store.upload(UploadRequest {
        bucket: target.bucket,
        content_type: target.content_type,
        upload_path: target.upload_path,
        file_extension: target.file_extension,
        payload,
    });

    let (encode_result, upload_result) = tokio::join!(encoder, upload);

    // The upload result decides unless the encoder failed on its own; a
    // BrokenPipe write error only says the consumer vanished first, and the
    // upload error carries the actual cause.
    let encode_failure = match encode_result {
        Ok(Ok(())) => None,
        Ok(Err(err)) if err.kind() == io::ErrorKind::BrokenPipe => None,
        Ok(Err(err)) => Some(AppError::Internal(format!("image encoding failed: {err}"))),
        Err(join_err) => Some(AppError::Internal(format!("encode task panicked: {join_err}"))),
    };

    match (encode_failure, upload_result) {
        (Some(err), _) => Err(err),
        (None, result) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn target() -> UploadTarget {
        UploadTarget {
            bucket: "test-bucket".to_string(),
            content_type: "image/jpeg".to_string(),
            upload_path: "images/100X100/".to_string(),
            file_extension: "jpg".to_string(),
        }
    }

    /// High-frequency texture so the JPEG output stays large
    fn noisy_image(width: u32, height: u32) -> Arc<DynamicImage> {
        Arc::new(DynamicImage::ImageRgb8(image::RgbImage::from_fn(
            width,
            height,
            |x, y| {
                let v = ((x.wrapping_mul(31)) ^ (y.wrapping_mul(17))) as u8;
                image::Rgb([v, v.wrapping_mul(3), v.wrapping_add(97)])
            },
        )))
    }

    /// Drains the payload, counting chunks and keeping the bytes
    struct DrainingStore {
        chunks_seen: AtomicUsize,
        data: Mutex<Vec<u8>>,
    }

    impl DrainingStore {
        fn new() -> Self {
            Self {
                chunks_seen: AtomicUsize::new(0),
                data: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for DrainingStore {
        async fn upload(&self, mut request: UploadRequest) -> Result<String> {
            let mut data = Vec::new();
            while let Some(chunk) = request.payload.next().await {
                let chunk = chunk
                    .map_err(|e| AppError::Internal(format!("image encoding failed: {e}")))?;
                self.chunks_seen.fetch_add(1, Ordering::SeqCst);
                data.extend_from_slice(&chunk);
            }
            *self.data.lock().unwrap() = data;
            Ok(format!("memory://{}", request.key("TEST")))
        }
    }

    /// Reads one chunk, then fails without draining the rest
    struct FailingStore;

    #[async_trait]
    impl ObjectStore for FailingStore {
        async fn upload(&self, mut request: UploadRequest) -> Result<String> {
            let _ = request.payload.next().await;
            Err(AppError::Upload("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn encoding_and_upload_overlap() {
        let store = Arc::new(DrainingStore::new());
        let image = noisy_image(1500, 1500);

        let location = encode_and_upload(store.clone(), image, 90, target())
            .await
            .unwrap();
        assert_eq!(location, "memory://images/100X100/TEST.jpg");

        // More chunks than the pipe can hold means the consumer was reading
        // while the encoder was still producing.
        let chunks = store.chunks_seen.load(Ordering::SeqCst);
        assert!(
            chunks > PIPE_CAPACITY,
            "expected more than {PIPE_CAPACITY} chunks, got {chunks}"
        );

        // The streamed bytes are a complete JPEG
        let data = store.data.lock().unwrap();
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(image::GenericImageView::dimensions(&decoded), (1500, 1500));
    }

    #[tokio::test]
    async fn upload_failure_unblocks_the_encoder() {
        let err = encode_and_upload(Arc::new(FailingStore), noisy_image(1500, 1500), 90, target())
            .await
            .unwrap_err();
        // Returns the upload error, and returns at all: the encoder was not
        // left blocked on a full pipe.
        assert!(matches!(err, AppError::Upload(_)));
    }

    #[tokio::test]
    async fn explicit_error_marker_is_not_mistaken_for_eof() {
        let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(PIPE_CAPACITY);

        let producer = tokio::task::spawn_blocking(move || {
            let mut writer = ChannelWriter::new(tx);
            writer.write_all(b"partial output").unwrap();
            writer.fail(io::Error::new(io::ErrorKind::Other, "encoder exploded"));
        });

        let mut rx = rx;
        let mut saw_error = false;
        while let Some(item) = rx.recv().await {
            match item {
                Ok(_) => assert!(!saw_error, "no chunks may follow the error marker"),
                Err(e) => {
                    saw_error = true;
                    assert!(e.to_string().contains("encoder exploded"));
                }
            }
        }
        assert!(saw_error, "consumer saw clean EOF for a failed encode");
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn writes_past_a_dead_consumer_error_out() {
        let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(1);
        drop(rx);

        let err = tokio::task::spawn_blocking(move || {
            let mut writer = ChannelWriter::new(tx);
            writer.write_all(&vec![0u8; CHUNK_SIZE * 2]).unwrap_err()
        })
        .await
        .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
