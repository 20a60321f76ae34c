use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

/// Environment-driven settings, loaded once at process start and handed
/// around as an owned, cheaply-clonable value (mirrors the teacher's own
/// `Config::from_env` + `env::var(...).expect(...)` idiom).
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub deployment: String,

    /// Base URL of the Hugging-Face-style model registry, e.g.
    /// `https://huggingface.co`.
    pub registry_host: String,

    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub s3_bucket_id: String,
    pub s3_url: String,
    /// Public base URL from which the uploaded ZIP is reachable by a
    /// BitTorrent web-seed client. Usually the CDN/public alias of
    /// `s3_url`, not the authenticated S3 endpoint itself.
    pub s3_public_url_base: String,

    /// `announce` value written into every torrent (SPEC_FULL.md §9, Open
    /// Question 3: configuration, not a hard-coded literal).
    pub tracker_announce_url: String,

    /// Piece length for the torrent's piece hasher. A power of two is
    /// recommended but not enforced.
    pub piece_length: u64,
    /// Multipart-upload part-size bounds. Keep `multipart_min_part_size`
    /// comfortably above the backend's real minimum (typically 5 MiB for
    /// S3-compatible stores) to leave safety margin, and keep
    /// `multipart_max_part_size` low enough that
    /// `archive_size / multipart_min_part_size` never approaches the
    /// backend's max part count (typically 10 000).
    pub multipart_min_part_size: u64,
    pub multipart_max_part_size: u64,

    /// Flag mirroring the teacher's test-mode branching; always `false`
    /// when loaded from the real environment.
    pub tests_running: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok(); // Load from .env file if available

        Config {
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "hub-archiver".to_string()),
            deployment: env::var("DEPLOYMENT")
                .expect("DEPLOYMENT must be set, this can be local, dev, stage, or prod"),
            registry_host: env::var("REGISTRY_HOST")
                .unwrap_or_else(|_| "https://huggingface.co".to_string()),
            s3_access_key: env::var("S3_ACCESS_KEY").expect("S3_ACCESS_KEY must be set"),
            s3_secret_key: env::var("S3_SECRET_KEY").expect("S3_SECRET_KEY must be set"),
            s3_bucket_id: env::var("S3_BUCKET_ID").expect("S3_BUCKET_ID must be set"),
            s3_url: env::var("S3_URL").expect("S3_URL must be set"),
            s3_public_url_base: env::var("S3_PUBLIC_URL_BASE")
                .unwrap_or_else(|_| env::var("S3_URL").unwrap_or_default()),
            tracker_announce_url: env::var("TRACKER_ANNOUNCE_URL")
                .unwrap_or_else(|_| "udp://tracker.opentrackr.org:1337/announce".to_string()),
            piece_length: env::var("PIECE_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1 << 20),
            multipart_min_part_size: env::var("MULTIPART_MIN_PART_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60 * 1024 * 1024),
            multipart_max_part_size: env::var("MULTIPART_MAX_PART_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60 * 1024 * 1024),
            tests_running: false, // Always false if using Config from_env
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            app_name: "hub-archiver-test".to_string(),
            deployment: "test".to_string(),
            registry_host: "http://localhost".to_string(),
            s3_access_key: "test-access-key".to_string(),
            s3_secret_key: "test-secret-key".to_string(),
            s3_bucket_id: "test-bucket".to_string(),
            s3_url: "http://localhost:9000".to_string(),
            s3_public_url_base: "http://localhost:9000".to_string(),
            tracker_announce_url: "udp://tracker.example:1337/announce".to_string(),
            // Small enough that tests exercise multi-part and multi-piece
            // behavior without megabyte-scale fixtures.
            piece_length: 16,
            multipart_min_part_size: 16,
            multipart_max_part_size: 16,
            tests_running: true,
        }
    }
}
