//! The top-level state machine: walks a repository's file list, drives the
//! CRC engine, ZIP framer, piece hasher and multipart sink in lockstep, and
//! finishes by storing the bencoded torrent next to the archive.
//!
//! Every byte destined for the archive passes through [`tee`], the single
//! fork point that forwards it to both the multipart sink (upload) and the
//! piece hasher (torrent metadata) so the two can never drift out of sync
//! with the archive offset `A`.

use futures::StreamExt;

use crate::common::errors::AppError;
use crate::external::registry::RegistryClient;
use crate::pipeline::crc::Crc32;
use crate::pipeline::multipart_sink::{MultipartSink, ObjectStoreUpload};
use crate::pipeline::piece_hasher::PieceHasher;
use crate::pipeline::torrent::{self, TorrentParams};
use crate::pipeline::zip_framer::{self, FileEntry};

/// Tuning and identity for a single archive request. Owned by the caller
/// (the HTTP handler), built from `Config` plus the parsed `repo`/`rev`.
pub struct ArchiveRequest {
    pub repo: String,
    pub rev: String,
    pub zip_key: String,
    pub torrent_key: String,
    pub piece_length: u64,
    pub multipart_min_part_size: u64,
    pub multipart_max_part_size: u64,
    pub tracker_announce_url: String,
    pub created_by: String,
    pub web_seed_url: String,
}

/// Summary returned on success, used for logging at the call site.
#[derive(Debug)]
pub struct ArchiveOutcome {
    pub files_included: usize,
    pub files_skipped: usize,
    pub archive_length: u64,
    pub piece_count: u64,
}

/// Appends `bytes` to the piece hasher and the sink in the same call so `A`
/// never advances on one side without the other (invariant I1).
async fn tee<B: ObjectStoreUpload>(
    sink: &mut MultipartSink<B>,
    hasher: &mut PieceHasher,
    bytes: &[u8],
) -> anyhow::Result<()> {
    hasher.feed(bytes);
    sink.append(bytes).await
}

/// Final path segment of a registry path, re-encoded as the ZIP entry name.
/// Directory components are flattened away (SPEC_FULL.md §9): a path like
/// `subdir/weights.bin` becomes the entry `weights.bin`.
fn flatten_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

fn u32_or_internal(value: u64, what: &str) -> Result<u32, AppError> {
    u32::try_from(value).map_err(|_| AppError::Internal {
        message: format!("{what} ({value}) exceeds the 32-bit field this revision supports (no ZIP64)"),
    })
}

/// Runs the full `LIST -> (HEADER -> BODY -> DESCRIPTOR)* -> TAIL -> TORRENT`
/// state machine against a real registry and a real object-store backend.
/// Aborts the multipart upload before returning any fatal error.
pub async fn run<B: ObjectStoreUpload>(
    registry: &RegistryClient,
    backend: B,
    request: ArchiveRequest,
) -> Result<ArchiveOutcome, AppError> {
    let paths = registry.list(&request.repo, &request.rev).await?;
    if paths.is_empty() {
        return Err(AppError::EmptyRepository {
            repo: request.repo.clone(),
            rev: request.rev.clone(),
        });
    }

    let mut sink = MultipartSink::new(
        backend,
        request.multipart_min_part_size,
        request.multipart_max_part_size,
    );
    sink.create(&request.zip_key, "application/zip")
        .await
        .map_err(|err| AppError::SinkFailure { message: err.to_string() })?;

    match drive(&mut sink, registry, &request, paths).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            sink.abort().await;
            Err(err)
        }
    }
}

/// The part of `run` that can fail mid-archive. Split out so `run` has a
/// single place to invoke `abort()` on any error path.
async fn drive<B: ObjectStoreUpload>(
    sink: &mut MultipartSink<B>,
    registry: &RegistryClient,
    request: &ArchiveRequest,
    paths: Vec<String>,
) -> Result<ArchiveOutcome, AppError> {
    let mut hasher = PieceHasher::new(request.piece_length);
    let mut directory: Vec<FileEntry> = Vec::new();
    let mut skipped = 0usize;

    for path in paths {
        let stream = match registry.open(&request.repo, &request.rev, &path).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(repo = %request.repo, rev = %request.rev, path = %path, error = %err, "skipping file, fetch failed");
                skipped += 1;
                continue;
            }
        };

        let name = flatten_name(&path);
        let local_header_offset = sink.archive_offset();
        let header = zip_framer::local_file_header(&name);
        tee(sink, &mut hasher, &header)
            .await
            .map_err(|err| AppError::SinkFailure { message: err.to_string() })?;

        let mut crc = Crc32::new();
        let mut size: u64 = 0;
        let mut body = Box::pin(stream);
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|err| AppError::Internal {
                message: format!("body stream for {path} failed mid-transfer: {err}"),
            })?;
            crc.update(&chunk);
            size += chunk.len() as u64;
            tee(sink, &mut hasher, &chunk)
                .await
                .map_err(|err| AppError::SinkFailure { message: err.to_string() })?;
        }

        let size_u32 = u32_or_internal(size, "file size")?;
        let descriptor = zip_framer::data_descriptor(crc.finalize(), size_u32);
        tee(sink, &mut hasher, &descriptor)
            .await
            .map_err(|err| AppError::SinkFailure { message: err.to_string() })?;

        directory.push(FileEntry {
            name,
            crc32: u32::from_le_bytes(descriptor[0..4].try_into().unwrap()),
            size: size_u32,
            local_header_offset: u32_or_internal(local_header_offset, "local header offset")?,
        });
    }

    if directory.is_empty() {
        return Err(AppError::AllFetchesFailed {
            repo: request.repo.clone(),
            rev: request.rev.clone(),
            attempted: skipped,
        });
    }

    let cd_offset = sink.archive_offset();
    let mut central_directory = Vec::new();
    for entry in &directory {
        central_directory.extend(zip_framer::central_directory_entry(entry));
    }
    let cd_size = u32_or_internal(central_directory.len() as u64, "central directory size")?;
    let cd_offset_u32 = u32_or_internal(cd_offset, "central directory offset")?;
    let entry_count = u16::try_from(directory.len()).map_err(|_| AppError::Internal {
        message: format!("{} files exceeds the 16-bit entry count this revision supports", directory.len()),
    })?;

    let eocd = zip_framer::end_of_central_directory(entry_count, cd_size, cd_offset_u32);

    let mut tail = central_directory;
    tail.extend_from_slice(&eocd);
    hasher.feed(&tail);
    sink.flush_and_seal(&tail)
        .await
        .map_err(|err| AppError::SinkFailure { message: err.to_string() })?;

    let archive_length = sink.archive_offset();
    let (pieces, piece_count) = hasher.finalize();

    let archive_name = request
        .zip_key
        .rsplit('/')
        .next()
        .unwrap_or(&request.zip_key)
        .to_string();

    let metainfo = torrent::build(TorrentParams {
        announce: request.tracker_announce_url.clone(),
        created_by: request.created_by.clone(),
        creation_date: chrono::Utc::now().timestamp(),
        archive_length,
        archive_name,
        piece_length: request.piece_length,
        pieces,
        piece_count,
        web_seed_url: request.web_seed_url.clone(),
    })
    .map_err(|err| AppError::InvariantViolation { message: err.to_string() })?;

    sink.put_torrent(&request.torrent_key, metainfo)
        .await
        .map_err(|err| AppError::SinkFailure { message: err.to_string() })?;

    Ok(ArchiveOutcome {
        files_included: directory.len(),
        files_skipped: skipped,
        archive_length,
        piece_count,
    })
}
