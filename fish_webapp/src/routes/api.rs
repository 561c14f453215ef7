use crate::{routes::analyze::run_analysis, routes::analyze::AnalyzeError, server::SharedState};
use axum::{body::Bytes, extract::State, response::Json};
use fish_quality::QualityReport;
use tracing::instrument;

#[instrument(skip(state, image_data))]
pub async fn analyze_image(
    State(state): State<SharedState>,
    image_data: Bytes,
) -> Result<Json<QualityReport>, AnalyzeError> {
    state.metrics.record_request("/api/analyze");

    let uploads = state.uploads.clone();
    let stored = image_data.clone();
    let filename = tokio::task::spawn_blocking(move || uploads.save(&stored)).await??;

    let report = run_analysis(&state, image_data.to_vec(), &filename, "/api/analyze").await?;
    Ok(Json(report))
}
