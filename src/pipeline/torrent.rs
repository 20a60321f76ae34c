//! Builds the BitTorrent metainfo dictionary for a produced archive and
//! bencode-encodes it with `serde_bencode`.
//!
//! Bencode dictionaries are conventionally written with lexicographically
//! sorted keys; the field order below (`announce`, `created by`,
//! `creation date`, `info`, `url-list`) already sorts that way, so the
//! derived `Serialize` impl produces the exact key order SPEC_FULL.md §6
//! requires without any custom serializer.

use std::fmt;

use serde::Serialize;
use serde_bytes::ByteBuf;

use super::piece_hasher::DIGEST_LEN;

#[derive(Debug, Serialize)]
pub struct Info {
    pub length: u64,
    pub name: String,
    #[serde(rename = "piece length")]
    pub piece_length: u64,
    pub pieces: ByteBuf,
}

#[derive(Debug, Serialize)]
pub struct Metainfo {
    pub announce: String,
    #[serde(rename = "created by")]
    pub created_by: String,
    #[serde(rename = "creation date")]
    pub creation_date: i64,
    pub info: Info,
    #[serde(rename = "url-list")]
    pub url_list: Vec<String>,
}

#[derive(Debug)]
pub enum TorrentError {
    PieceCountMismatch { expected: u64, actual: u64 },
    PiecesLengthMismatch { expected: usize, actual: usize },
    WebSeedMismatch { url: String, name: String },
    Encode(serde_bencode::Error),
}

impl fmt::Display for TorrentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TorrentError::PieceCountMismatch { expected, actual } => {
                write!(f, "piece count mismatch: expected {expected}, got {actual}")
            }
            TorrentError::PiecesLengthMismatch { expected, actual } => write!(
                f,
                "pieces length {actual} is not 20 * piece_count ({expected})"
            ),
            TorrentError::WebSeedMismatch { url, name } => write!(
                f,
                "url-list[0] {url:?} does not end with info.name {name:?}"
            ),
            TorrentError::Encode(err) => write!(f, "bencode serialization failed: {err}"),
        }
    }
}

impl std::error::Error for TorrentError {}

impl From<serde_bencode::Error> for TorrentError {
    fn from(err: serde_bencode::Error) -> Self {
        TorrentError::Encode(err)
    }
}

pub struct TorrentParams {
    pub announce: String,
    pub created_by: String,
    pub creation_date: i64,
    pub archive_length: u64,
    pub archive_name: String,
    pub piece_length: u64,
    pub pieces: Vec<u8>,
    pub piece_count: u64,
    pub web_seed_url: String,
}

/// Validates the §6 invariants, assembles the dictionary, and returns the
/// bencoded bytes. Any invariant violation is fatal (`InvariantViolation`
/// in the error taxonomy).
pub fn build(params: TorrentParams) -> Result<Vec<u8>, TorrentError> {
    let expected_piece_count = params.archive_length.div_ceil(params.piece_length);
    if params.piece_count != expected_piece_count {
        return Err(TorrentError::PieceCountMismatch {
            expected: expected_piece_count,
            actual: params.piece_count,
        });
    }

    let expected_pieces_len = DIGEST_LEN * params.piece_count as usize;
    if params.pieces.len() != expected_pieces_len {
        return Err(TorrentError::PiecesLengthMismatch {
            expected: expected_pieces_len,
            actual: params.pieces.len(),
        });
    }

    if !params.web_seed_url.ends_with(&params.archive_name) {
        return Err(TorrentError::WebSeedMismatch {
            url: params.web_seed_url,
            name: params.archive_name,
        });
    }

    let metainfo = Metainfo {
        announce: params.announce,
        created_by: params.created_by,
        creation_date: params.creation_date,
        info: Info {
            length: params.archive_length,
            name: params.archive_name,
            piece_length: params.piece_length,
            pieces: ByteBuf::from(params.pieces),
        },
        url_list: vec![params.web_seed_url],
    };

    Ok(serde_bencode::to_bytes(&metainfo)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_params() -> TorrentParams {
        TorrentParams {
            announce: "udp://tracker.example:1337/announce".to_string(),
            created_by: "hub-archiver/0.1".to_string(),
            creation_date: 1_700_000_000,
            archive_length: 223,
            archive_name: "name.zip".to_string(),
            piece_length: 16,
            pieces: vec![0u8; 20 * 14],
            piece_count: 14,
            web_seed_url: "https://example.com/owner/name.zip".to_string(),
        }
    }

    #[test]
    fn builds_valid_metainfo() {
        let bytes = build(valid_params()).expect("should build");
        assert!(!bytes.is_empty());
        // Bencode dicts start with 'd' and must contain the keys in sorted order.
        let text = String::from_utf8_lossy(&bytes);
        let announce_pos = text.find("8:announce").unwrap();
        let created_by_pos = text.find("10:created by").unwrap();
        let creation_date_pos = text.find("13:creation date").unwrap();
        let info_pos = text.find("4:info").unwrap();
        let url_list_pos = text.find("8:url-list").unwrap();
        assert!(announce_pos < created_by_pos);
        assert!(created_by_pos < creation_date_pos);
        assert!(creation_date_pos < info_pos);
        assert!(info_pos < url_list_pos);
    }

    #[test]
    fn rejects_piece_count_mismatch() {
        let mut params = valid_params();
        params.piece_count = 13;
        let err = build(params).unwrap_err();
        assert!(matches!(err, TorrentError::PieceCountMismatch { .. }));
    }

    #[test]
    fn rejects_pieces_length_mismatch() {
        let mut params = valid_params();
        params.pieces = vec![0u8; 10];
        let err = build(params).unwrap_err();
        assert!(matches!(err, TorrentError::PiecesLengthMismatch { .. }));
    }

    #[test]
    fn rejects_web_seed_not_ending_in_name() {
        let mut params = valid_params();
        params.web_seed_url = "https://example.com/owner/other.zip".to_string();
        let err = build(params).unwrap_err();
        assert!(matches!(err, TorrentError::WebSeedMismatch { .. }));
    }
}
