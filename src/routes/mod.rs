use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::Config;

mod download;
mod health;
mod upload;

// ---

pub fn router(config: Config) -> Router {
    // ---
    let body_limit = DefaultBodyLimit::max(config.max_upload_bytes());

    Router::new()
        .merge(upload::router())
        .merge(download::router())
        .merge(health::router())
        .layer(body_limit)
        .with_state(config)
}
