mod pages;
mod routes;
mod session;
mod storage;
mod telemetry;

pub mod app;
pub mod config;
pub mod server;

pub use app::{build_pipeline, start_app};
