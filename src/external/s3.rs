//! S3-compatible object store client: construction (mirroring the teacher's
//! original `get_client`) plus the `ObjectStoreUpload` backend the
//! multipart sink drives, and a single-shot `put_object` helper for the
//! small torrent file.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::{Client as S3Client, config::Region};

use crate::config::Config;
use crate::pipeline::multipart_sink::{ObjectStoreUpload, PartReceipt};

pub async fn get_client(config: &Config) -> Arc<S3Client> {
    let region = Region::new("us-east-1");
    let credentials = Credentials::new(
        &config.s3_access_key,
        &config.s3_secret_key,
        None,
        None,
        "manual",
    );
    let shared_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region.clone())
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_url)
        .load()
        .await;

    Arc::new(S3Client::new(&shared_config))
}

/// Single `put_object` call for artifacts too small to need multipart
/// upload (the torrent file).
pub async fn put_object(
    client: &S3Client,
    bucket: &str,
    key: &str,
    content_type: &str,
    bytes: Vec<u8>,
) -> anyhow::Result<()> {
    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .content_type(content_type)
        .body(ByteStream::from(bytes))
        .send()
        .await?;
    Ok(())
}

/// `ObjectStoreUpload` backend driving a real S3-compatible multipart
/// upload. The bucket is fixed at construction; `key`/`upload_id` identify
/// the in-flight upload per call, matching the trait's stateless shape.
pub struct S3Backend {
    client: Arc<S3Client>,
    bucket: String,
}

impl S3Backend {
    pub fn new(client: Arc<S3Client>, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStoreUpload for S3Backend {
    type UploadId = String;

    async fn create(&self, key: &str, content_type: &str) -> anyhow::Result<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await?;
        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("S3 did not return an upload id"))
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &String,
        part_number: i32,
        bytes: Vec<u8>,
    ) -> anyhow::Result<PartReceipt> {
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(bytes))
            .send()
            .await?;
        let e_tag = output
            .e_tag()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("S3 did not return an ETag for part {part_number}"))?;
        Ok(PartReceipt { part_number, e_tag })
    }

    async fn complete(
        &self,
        key: &str,
        upload_id: &String,
        parts: Vec<PartReceipt>,
    ) -> anyhow::Result<()> {
        let completed_parts = parts
            .into_iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(part.e_tag)
                    .build()
            })
            .collect();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await?;
        Ok(())
    }

    async fn abort(&self, key: &str, upload_id: &String) -> anyhow::Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await?;
        Ok(())
    }

    async fn put_object(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        put_object(&self.client, &self.bucket, key, content_type, bytes).await
    }
}
