use crate::{
    pages,
    server::SharedState,
    session::{session_cookie, session_id},
    storage::{decode_data_url, StorageError},
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

#[derive(Deserialize)]
pub struct PreviewForm {
    /// `data:image/...;base64,...` as produced by `FileReader.readAsDataURL`.
    pub image: String,
}

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Upload rejected: {0}")]
    Storage(#[from] StorageError),
    #[error("Upload task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Failed to build session cookie: {0}")]
    Cookie(#[from] axum::http::header::InvalidHeaderValue),
}

impl IntoResponse for PreviewError {
    fn into_response(self) -> Response {
        let status = match &self {
            PreviewError::Storage(StorageError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            PreviewError::Storage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PreviewError::Task(_) | PreviewError::Cookie(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!("Preview failed: {}", self);
        (status, self.to_string()).into_response()
    }
}

#[instrument(skip(state, headers, form))]
pub async fn preview(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<PreviewForm>,
) -> Result<Response, PreviewError> {
    state.metrics.record_request("/preview");

    let image_data = decode_data_url(&form.image)?;
    let uploads = state.uploads.clone();
    let filename = tokio::task::spawn_blocking(move || uploads.save(&image_data)).await??;

    let session = state
        .sessions
        .remember_upload(session_id(&headers), filename.clone());
    let cookie = session_cookie(session)?;
    tracing::info!(
        "Stored upload {} ({} active sessions)",
        filename,
        state.sessions.len()
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Html(pages::preview_page(&filename)),
    )
        .into_response())
}
