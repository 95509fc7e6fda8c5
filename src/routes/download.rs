//! Download endpoint: serve the finished report workbook of a session.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::session::{Session, PEDESTRIAN_REPORT, VEHICULAR_REPORT};
use crate::Config;

// ---

pub fn router() -> Router<Config> {
    // ---
    Router::new().route("/download/{session_id}", get(download_report))
}

/// Serve whichever report the session produced, vehicular or pedestrian.
async fn download_report(
    State(config): State<Config>,
    Path(session_id): Path<String>,
) -> Response {
    // ---
    info!("GET /download/{} - Fetching report", session_id);

    let Ok(id) = session_id.parse::<Uuid>() else {
        debug!("Invalid session id '{}'", session_id);
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(session) = Session::open(&config.upload_root, id) else {
        debug!(session = %id, "No such session");
        return StatusCode::NOT_FOUND.into_response();
    };

    for file_name in [VEHICULAR_REPORT, PEDESTRIAN_REPORT] {
        let path = session.report_path(file_name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                info!(session = %id, "Serving {} ({} bytes)", file_name, bytes.len());
                return (
                    StatusCode::OK,
                    [
                        (
                            header::CONTENT_TYPE,
                            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                                .to_string(),
                        ),
                        (
                            header::CONTENT_DISPOSITION,
                            format!("attachment; filename=\"{file_name}\""),
                        ),
                    ],
                    bytes,
                )
                    .into_response();
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                tracing::error!(session = %id, "Failed to read report: {}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    debug!(session = %id, "Session has no finished report");
    StatusCode::NOT_FOUND.into_response()
}
