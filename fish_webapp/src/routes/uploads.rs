use crate::server::SharedState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::instrument;

#[instrument(skip(state))]
pub async fn uploaded_file(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
) -> Response {
    let uploads = state.uploads.clone();
    let name = filename.clone();
    match tokio::task::spawn_blocking(move || uploads.read(&name)).await {
        Ok(Ok(image_data)) => {
            ([(header::CONTENT_TYPE, "image/png")], image_data).into_response()
        }
        Ok(Err(e)) => {
            tracing::debug!("Upload {} not served: {}", filename, e);
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            tracing::error!("Reading upload {} failed: {}", filename, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::tests::test_state;
    use crate::storage::tests::png_bytes;

    #[tokio::test]
    async fn test_serves_stored_upload() {
        let (state, _dir) = test_state();
        let filename = state.uploads.save(&png_bytes(8, 8)).unwrap();

        let response = uploaded_file(State(state), Path(filename)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(image::load_from_memory(&body).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_serves_concurrent_requests() {
        let (state, _dir) = test_state();
        let small = state.uploads.save(&png_bytes(4, 4)).unwrap();
        let large = state.uploads.save(&png_bytes(300, 200)).unwrap();

        let (a, b) = tokio::join!(
            uploaded_file(State(state.clone()), Path(small.clone())),
            uploaded_file(State(state.clone()), Path(large.clone())),
        );
        for (response, expected) in [(a, (4, 4)), (b, (300, 200))] {
            assert_eq!(response.status(), StatusCode::OK);
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let img = image::load_from_memory(&body).unwrap();
            assert_eq!((img.width(), img.height()), expected);
        }
    }

    #[tokio::test]
    async fn test_unknown_and_traversal_names_are_not_found() {
        for name in ["img_missing.png", "../Cargo.toml", ".."] {
            let (state, _dir) = test_state();
            let response = uploaded_file(State(state), Path(name.to_string())).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }
}
