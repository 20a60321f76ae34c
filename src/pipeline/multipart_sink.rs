//! Buffers archive bytes and emits them to an object store as ordered,
//! bounded-size multipart-upload parts.
//!
//! The actual object-store calls are pushed behind [`ObjectStoreUpload`] so
//! this module owns only the buffering/chunking contract from
//! SPEC_FULL.md §4.5; the production backend (`external::s3`) and a
//! in-memory test backend both implement the trait.

use async_trait::async_trait;

/// A completed part, as acknowledged by the backend.
#[derive(Debug, Clone)]
pub struct PartReceipt {
    pub part_number: i32,
    pub e_tag: String,
}

/// The object-store contract the multipart sink depends on. Mirrors the
/// S3 multipart-upload lifecycle: `create`, repeated `upload_part`,
/// `complete`, and `abort` for error recovery.
#[async_trait]
pub trait ObjectStoreUpload: Send + Sync {
    type UploadId: Send + Sync + Clone;

    async fn create(&self, key: &str, content_type: &str) -> anyhow::Result<Self::UploadId>;

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &Self::UploadId,
        part_number: i32,
        bytes: Vec<u8>,
    ) -> anyhow::Result<PartReceipt>;

    async fn complete(
        &self,
        key: &str,
        upload_id: &Self::UploadId,
        parts: Vec<PartReceipt>,
    ) -> anyhow::Result<()>;

    async fn abort(&self, key: &str, upload_id: &Self::UploadId) -> anyhow::Result<()>;

    /// Single-shot write, used for artifacts too small to need multipart
    /// upload (the torrent file).
    async fn put_object(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> anyhow::Result<()>;
}

pub struct MultipartSink<B: ObjectStoreUpload> {
    backend: B,
    key: String,
    upload_id: Option<B::UploadId>,
    min_part_size: usize,
    max_part_size: usize,
    pending: Vec<u8>,
    parts: Vec<PartReceipt>,
    next_part_number: i32,
    archive_offset: u64,
}

impl<B: ObjectStoreUpload> MultipartSink<B> {
    pub fn new(backend: B, min_part_size: u64, max_part_size: u64) -> Self {
        assert!(min_part_size > 0 && min_part_size <= max_part_size);
        Self {
            backend,
            key: String::new(),
            upload_id: None,
            min_part_size: min_part_size as usize,
            max_part_size: max_part_size as usize,
            pending: Vec::new(),
            parts: Vec::new(),
            next_part_number: 1,
            archive_offset: 0,
        }
    }

    /// Total bytes accepted into the tee so far (the spec's archive offset A).
    pub fn archive_offset(&self) -> u64 {
        self.archive_offset
    }

    pub async fn create(&mut self, key: &str, content_type: &str) -> anyhow::Result<()> {
        let upload_id = self.backend.create(key, content_type).await?;
        self.key = key.to_string();
        self.upload_id = Some(upload_id);
        Ok(())
    }

    /// Enqueues `bytes`, uploading full-size parts as the pending buffer
    /// crosses `min_part_size`. Returns once every complete part this call
    /// produced has been acknowledged by the backend, preserving part
    /// ordering.
    pub async fn append(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.pending.extend_from_slice(bytes);
        self.archive_offset += bytes.len() as u64;

        while self.pending.len() >= self.min_part_size {
            let take = self.min_part_size.min(self.max_part_size);
            let part: Vec<u8> = self.pending.drain(..take).collect();
            self.upload_part(part).await?;
        }
        Ok(())
    }

    /// Appends `tail_bytes`, uploads whatever remains as the final
    /// (possibly short) part, and completes the multipart upload.
    pub async fn flush_and_seal(&mut self, tail_bytes: &[u8]) -> anyhow::Result<()> {
        self.pending.extend_from_slice(tail_bytes);
        self.archive_offset += tail_bytes.len() as u64;

        if !self.pending.is_empty() {
            let part = std::mem::take(&mut self.pending);
            self.upload_part(part).await?;
        }

        let upload_id = self
            .upload_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("flush_and_seal called before create"))?;
        self.backend
            .complete(&self.key, &upload_id, self.parts.clone())
            .await
    }

    /// Stores the bencoded torrent as a single-shot object next to the
    /// archive. Only called after `flush_and_seal` has completed the zip
    /// upload, so it never races the multipart lifecycle above.
    pub async fn put_torrent(&self, key: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        self.backend
            .put_object(key, "application/x-bittorrent", bytes)
            .await
    }

    /// Cancels the multipart upload. Safe to call even if `create` was
    /// never called or the upload is already gone.
    pub async fn abort(&mut self) {
        if let Some(upload_id) = self.upload_id.take() {
            if let Err(err) = self.backend.abort(&self.key, &upload_id).await {
                tracing::warn!(error = %err, key = %self.key, "failed to abort multipart upload");
            }
        }
    }

    async fn upload_part(&mut self, bytes: Vec<u8>) -> anyhow::Result<()> {
        let upload_id = self
            .upload_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("append called before create"))?;
        let part_number = self.next_part_number;
        let receipt = self
            .backend
            .upload_part(&self.key, &upload_id, part_number, bytes)
            .await?;
        self.next_part_number += 1;
        self.parts.push(receipt);
        Ok(())
    }
}

#[cfg(test)]
pub mod test_backend {
    use super::{ObjectStoreUpload, PartReceipt};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeBackend {
        pub uploaded: Mutex<Vec<(i32, Vec<u8>)>>,
        pub completed: Mutex<bool>,
        pub aborted: Mutex<bool>,
        pub put_objects: Mutex<Vec<Vec<u8>>>,
        pub fail_upload_after: Option<usize>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_after(parts: usize) -> Self {
            Self {
                fail_upload_after: Some(parts),
                ..Self::default()
            }
        }

        pub fn uploaded_parts(&self) -> Vec<(i32, Vec<u8>)> {
            self.uploaded.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ObjectStoreUpload for FakeBackend {
        type UploadId = u32;

        async fn create(&self, _key: &str, _content_type: &str) -> anyhow::Result<u32> {
            Ok(1)
        }

        async fn upload_part(
            &self,
            _key: &str,
            _upload_id: &u32,
            part_number: i32,
            bytes: Vec<u8>,
        ) -> anyhow::Result<PartReceipt> {
            if let Some(limit) = self.fail_upload_after {
                if self.uploaded.lock().unwrap().len() >= limit {
                    anyhow::bail!("simulated upload failure");
                }
            }
            let size = bytes.len();
            self.uploaded.lock().unwrap().push((part_number, bytes));
            Ok(PartReceipt {
                part_number,
                e_tag: format!("etag-{part_number}-{size}"),
            })
        }

        async fn complete(
            &self,
            _key: &str,
            _upload_id: &u32,
            _parts: Vec<PartReceipt>,
        ) -> anyhow::Result<()> {
            *self.completed.lock().unwrap() = true;
            Ok(())
        }

        async fn abort(&self, _key: &str, _upload_id: &u32) -> anyhow::Result<()> {
            *self.aborted.lock().unwrap() = true;
            Ok(())
        }

        async fn put_object(
            &self,
            _key: &str,
            _content_type: &str,
            bytes: Vec<u8>,
        ) -> anyhow::Result<()> {
            self.put_objects.lock().unwrap().push(bytes);
            Ok(())
        }
    }
}
