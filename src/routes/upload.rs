//! Upload endpoints: accept the workbooks of one session and run the
//! pipeline synchronously, returning the session id for download.
//!
//! `POST /upload` — vehicular runs. Multipart fields: `plantilla`
//! (required), `chile` (repeatable, at least one), `filipinas` and
//! `complementarios` (repeatable, optional), `sampling_minutes` (optional
//! text, 1–60). `POST /upload_pedestrians` — pedestrian runs, fields
//! `plantilla` and `peatones`. Field names may carry the legacy `[]`
//! suffix used by the browser form.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{DataWarning, PipelineError};
use crate::models::SamplingConfig;
use crate::pipeline::{
    run_pedestrian, run_vehicular, PedestrianInputs, PipelineOutcome, VehicularInputs,
};
use crate::session::Session;
use crate::Config;

// ---

pub fn router() -> Router<Config> {
    // ---
    Router::new()
        .route("/upload", post(upload_vehicular))
        .route("/upload_pedestrians", post(upload_pedestrian))
}

/// Successful upload: the id to download the report with, plus any
/// non-fatal row-level warnings collected during processing.
#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    session_id: Uuid,
    warnings: Vec<DataWarning>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

async fn upload_vehicular(
    State(config): State<Config>,
    multipart: Multipart,
) -> Response {
    // ---
    info!("POST /upload - Starting vehicular session");

    // Step 1: create the session and store the uploaded workbooks
    let session = match Session::create(&config.upload_root) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create session directory: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "cannot create session");
        }
    };
    let form = match collect_form(&session, multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let Some(template) = form.template else {
        return error_response(StatusCode::BAD_REQUEST, "missing 'plantilla' file");
    };
    if form.chile.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "missing 'chile' files");
    }

    // Step 2: run the pipeline to completion
    debug!("POST /upload - Step 2: running pipeline");
    let inputs = VehicularInputs {
        template,
        chile: form.chile,
        complementary: form.complementary,
        philippines: form.philippines,
    };
    let outcome = run_vehicular(
        &session,
        &inputs,
        form.sampling,
        config.fallback_interval(),
    );

    respond(session, outcome)
}

async fn upload_pedestrian(
    State(config): State<Config>,
    multipart: Multipart,
) -> Response {
    // ---
    info!("POST /upload_pedestrians - Starting pedestrian session");

    let session = match Session::create(&config.upload_root) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create session directory: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "cannot create session");
        }
    };
    let form = match collect_form(&session, multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let Some(template) = form.template else {
        return error_response(StatusCode::BAD_REQUEST, "missing 'plantilla' file");
    };
    if form.pedestrian.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "missing 'peatones' files");
    }

    let inputs = PedestrianInputs {
        template,
        pedestrian: form.pedestrian,
    };
    let outcome = run_pedestrian(
        &session,
        &inputs,
        form.sampling,
        config.fallback_interval(),
    );

    respond(session, outcome)
}

fn respond(
    session: Session,
    outcome: Result<PipelineOutcome, PipelineError>,
) -> Response {
    // ---
    match outcome {
        Ok(outcome) => {
            info!(
                session = %session.id,
                "Upload complete, report at {}",
                outcome.report_path.display()
            );
            (
                StatusCode::OK,
                Json(UploadResponse {
                    success: true,
                    session_id: session.id,
                    warnings: outcome.warnings,
                }),
            )
                .into_response()
        }
        Err(e) if e.is_user_error() => {
            info!(session = %session.id, "Rejecting upload: {}", e);
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        Err(e) => {
            error!(session = %session.id, "Pipeline failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "processing failed")
        }
    }
}

// ---

/// Everything extracted from one multipart request.
#[derive(Default)]
struct UploadForm {
    sampling: Option<SamplingConfig>,
    template: Option<PathBuf>,
    chile: Vec<PathBuf>,
    philippines: Vec<PathBuf>,
    complementary: Vec<PathBuf>,
    pedestrian: Vec<PathBuf>,
}

/// Drain the multipart stream into the session's `input/` directory.
async fn collect_form(session: &Session, mut multipart: Multipart) -> Result<UploadForm, Response> {
    // ---
    let mut form = UploadForm::default();
    let mut count = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("malformed multipart request: {e}"),
                ));
            }
        };

        // The browser form posts repeated fields as "chile[]"
        let name = field
            .name()
            .unwrap_or_default()
            .trim_end_matches("[]")
            .to_string();

        if name == "sampling_minutes" {
            let text = match field.text().await {
                Ok(text) => text,
                Err(e) => {
                    return Err(error_response(
                        StatusCode::BAD_REQUEST,
                        format!("unreadable 'sampling_minutes': {e}"),
                    ));
                }
            };
            let text = text.trim().to_string();
            if text.is_empty() {
                continue;
            }
            let sampling = text.parse::<u32>().ok().and_then(SamplingConfig::new);
            match sampling {
                Some(sampling) => form.sampling = Some(sampling),
                None => {
                    return Err(error_response(
                        StatusCode::BAD_REQUEST,
                        "'sampling_minutes' must be an integer between 1 and 60",
                    ));
                }
            }
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            // Empty form inputs arrive as nameless file fields
            continue;
        }
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("unreadable upload '{file_name}': {e}"),
                ));
            }
        };

        count += 1;
        let stored = match session.store_upload(&name, count, &file_name, &bytes) {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => {
                return Err(error_response(StatusCode::BAD_REQUEST, e.to_string()));
            }
            Err(e) => {
                error!("Failed to store upload '{}': {}", file_name, e);
                return Err(error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "cannot store upload",
                ));
            }
        };
        debug!("Stored field '{}' as {}", name, stored.display());

        match name.as_str() {
            "plantilla" => form.template = Some(stored),
            "chile" => form.chile.push(stored),
            "filipinas" => form.philippines.push(stored),
            "complementarios" => form.complementary.push(stored),
            "peatones" => form.pedestrian.push(stored),
            other => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("unknown form field '{other}'"),
                ));
            }
        }
    }

    Ok(form)
}
