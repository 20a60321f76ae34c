use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use tracing::Instrument;

use crate::common::errors::AppError;
use crate::common::state::AppState;
use crate::external::s3::S3Backend;
use crate::pipeline::orchestrator::{self, ArchiveRequest};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(archive_repository))
        .route("/healthz", get(crate::common::views::healthz))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ArchiveQuery {
    pub repo: Option<String>,
    pub rev: Option<String>,
}

/// `GET /?repo=<owner>/<name>[&rev=<revision>]`: the single route this
/// service exposes. Converts a repository revision into a ZIP archive and a
/// sibling torrent, both stored in the object store, and reports what
/// happened as a plain-text body.
pub async fn archive_repository(
    State(state): State<AppState>,
    Query(query): Query<ArchiveQuery>,
) -> Result<String, AppError> {
    let repo = query
        .repo
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::BadRequest { message: "missing `repo` query parameter".to_string() })?;

    let (owner, name) = repo.split_once('/').ok_or_else(|| AppError::BadRequest {
        message: format!("malformed repo {repo:?}: expected `<owner>/<name>`"),
    })?;
    if owner.is_empty() || name.is_empty() {
        return Err(AppError::BadRequest {
            message: format!("malformed repo {repo:?}: expected `<owner>/<name>`"),
        });
    }

    let rev = query.rev.unwrap_or_else(|| "main".to_string());
    let span = tracing::info_span!("archive_repository", repo = %repo, rev = %rev);

    async move {
        let zip_key = format!("{owner}/{name}.zip");
        let torrent_key = format!("{owner}/{name}.torrent");
        let web_seed_url = format!("{}/{zip_key}", state.config.s3_public_url_base.trim_end_matches('/'));

        let backend = S3Backend::new(state.s3_client.clone(), state.config.s3_bucket_id.clone());
        let request = ArchiveRequest {
            repo: repo.clone(),
            rev: rev.clone(),
            zip_key,
            torrent_key,
            piece_length: state.config.piece_length,
            multipart_min_part_size: state.config.multipart_min_part_size,
            multipart_max_part_size: state.config.multipart_max_part_size,
            tracker_announce_url: state.config.tracker_announce_url.clone(),
            created_by: format!("{}/{}", state.config.app_name, env!("CARGO_PKG_VERSION")),
            web_seed_url,
        };

        tracing::info!("starting archive pipeline");
        let outcome = orchestrator::run(&state.registry, backend, request).await?;
        tracing::info!(
            files_included = outcome.files_included,
            files_skipped = outcome.files_skipped,
            archive_length = outcome.archive_length,
            piece_count = outcome.piece_count,
            "archive pipeline completed"
        );

        Ok(format!(
            "archived {} files ({} bytes, {} skipped) from {repo}@{rev}",
            outcome.files_included, outcome.archive_length, outcome.files_skipped
        ))
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use httpmock::prelude::*;
    use tower::ServiceExt;

    use crate::config::test_helpers::setup_test_app;

    async fn status_for(uri: &str) -> StatusCode {
        let server = MockServer::start();
        let app = setup_test_app(server.base_url()).await;
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn missing_repo_is_bad_request() {
        assert_eq!(status_for("/").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_repo_without_slash_is_bad_request() {
        assert_eq!(status_for("/?repo=no-slash-here").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn repo_list_failure_is_bad_gateway() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/models/owner/name/tree/main");
            then.status(500);
        });
        let app = setup_test_app(server.base_url()).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/?repo=owner/name")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn empty_tree_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/models/owner/name/tree/main");
            then.status(200).json_body(serde_json::json!([]));
        });
        let app = setup_test_app(server.base_url()).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/?repo=owner/name")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn healthz_returns_ok_json() {
        let server = MockServer::start();
        let app = setup_test_app(server.base_url()).await;
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
    }
}
