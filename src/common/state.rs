use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;

use crate::config::Config;
use crate::external::registry::RegistryClient;

/// Shared, read-only handles every request clones from. Nothing here is
/// mutated by the pipeline itself — each request's working state (the
/// multipart sink, the piece hasher, the central-directory list) is local
/// to that request's orchestrator call.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub registry: Arc<RegistryClient>,
    pub s3_client: Arc<S3Client>,
}
