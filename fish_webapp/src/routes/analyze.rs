use crate::{
    pages,
    server::SharedState,
    session::session_id,
    storage::StorageError,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use fish_quality::{PipelineError, QualityReport, RawImage};
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Analysis failed: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Upload unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("Analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let status = match &self {
            AnalyzeError::Pipeline(PipelineError::Decode(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalyzeError::Storage(StorageError::Image(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalyzeError::Storage(StorageError::InvalidName(_)) => StatusCode::BAD_REQUEST,
            AnalyzeError::Pipeline(_) | AnalyzeError::Storage(_) | AnalyzeError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        tracing::error!("{}", self);
        (status, format!("Something went wrong: {}", self)).into_response()
    }
}

/// Runs the pipeline off the async runtime and records timing and verdict.
pub(crate) async fn run_analysis(
    state: &SharedState,
    image_data: Vec<u8>,
    filename: &str,
    route: &str,
) -> Result<QualityReport, AnalyzeError> {
    let pipeline = state.pipeline.clone();
    let image = RawImage::new(image_data, format!("uploads/{}", filename));

    let started = Instant::now();
    let report = tokio::task::spawn_blocking(move || pipeline.analyze(image)).await??;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    state.metrics.record_analysis_duration(elapsed_ms, route);
    state.metrics.record_verdict(report.quality_verdict);
    tracing::info!(
        "Analyzed {} in {} ms: {} {} {}",
        filename,
        elapsed_ms,
        report.species,
        report.freshness,
        report.quality_verdict
    );

    Ok(report)
}

#[instrument(skip(state, headers))]
pub async fn analyze(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Response, AnalyzeError> {
    state.metrics.record_request("/analyze");

    let Some(filename) = session_id(&headers).and_then(|id| state.sessions.upload_for(id)) else {
        return Ok(Redirect::to("/").into_response());
    };

    let uploads = state.uploads.clone();
    let name = filename.clone();
    let image_data = match tokio::task::spawn_blocking(move || uploads.read(&name)).await? {
        Ok(image_data) => image_data,
        Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Upload {} disappeared, starting over", filename);
            return Ok(Redirect::to("/").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let report = run_analysis(&state, image_data, &filename, "/analyze").await?;
    Ok(Html(pages::result_page(&report)).into_response())
}
