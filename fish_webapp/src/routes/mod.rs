mod analyze;
mod api;
mod health;
mod index;
mod metrics;
mod preview;
mod uploads;

use crate::server::SharedState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn app_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(index::index))
        .route("/preview", post(preview::preview))
        .route("/analyze", get(analyze::analyze))
        .route("/uploads/{filename}", get(uploads::uploaded_file))
        .route("/api/analyze", post(api::analyze_image))
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
}
