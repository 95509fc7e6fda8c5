//! Pipeline orchestration: one linear run per upload session.
//!
//! Vehicular: template → readers (Chile + complementary + Philippines) →
//! interpolation (Philippines only) → priority merge → homologation →
//! report workbook. Pedestrian: template → pedestrian readers → merge →
//! homologation → report workbook. Everything is synchronous and
//! request-scoped; a run either completes or fails with a
//! [`PipelineError`].

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{DataWarning, PipelineError};
use crate::homologate::homologate;
use crate::interpolate::interpolate;
use crate::merge::merge;
use crate::models::{ReportKind, SamplingConfig, SourceTable};
use crate::readers::{read_chile, read_pedestrian, read_philippines};
use crate::session::{Session, PEDESTRIAN_REPORT, VEHICULAR_REPORT};
use crate::template::load_template;
use crate::xlsx::write_report;

// ---

/// Merge priorities: Chile overrides complementary overrides Philippines.
const PRIORITY_CHILE: u8 = 3;
const PRIORITY_COMPLEMENTARY: u8 = 2;
const PRIORITY_PHILIPPINES: u8 = 1;
const PRIORITY_PEDESTRIAN: u8 = 1;

/// Input workbooks of a vehicular run.
#[derive(Debug, Default)]
pub struct VehicularInputs {
    pub template: PathBuf,
    pub chile: Vec<PathBuf>,
    pub complementary: Vec<PathBuf>,
    pub philippines: Vec<PathBuf>,
}

/// Input workbooks of a pedestrian run.
#[derive(Debug, Default)]
pub struct PedestrianInputs {
    pub template: PathBuf,
    pub pedestrian: Vec<PathBuf>,
}

/// A finished run: where the report landed plus accumulated warnings.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub report_path: PathBuf,
    pub warnings: Vec<DataWarning>,
}

/// Run the vehicular pipeline for one session.
pub fn run_vehicular(
    session: &Session,
    inputs: &VehicularInputs,
    requested_interval: Option<SamplingConfig>,
    fallback_interval: SamplingConfig,
) -> Result<PipelineOutcome, PipelineError> {
    info!(session = %session.id, "vehicular pipeline - starting");
    let mut warnings = Vec::new();

    debug!("vehicular pipeline - loading template");
    let template = load_template(
        &inputs.template,
        ReportKind::Vehicular,
        requested_interval,
        fallback_interval,
    )?;

    debug!("vehicular pipeline - reading sources");
    let mut tables = Vec::new();
    for path in &inputs.chile {
        let (rows, mut file_warnings) = read_chile(path)?;
        warnings.append(&mut file_warnings);
        tables.push(table(path, PRIORITY_CHILE, rows));
    }
    for path in &inputs.complementary {
        let (rows, mut file_warnings) = read_chile(path)?;
        warnings.append(&mut file_warnings);
        tables.push(table(path, PRIORITY_COMPLEMENTARY, rows));
    }
    for path in &inputs.philippines {
        let (rows, mut file_warnings) = read_philippines(path)?;
        warnings.append(&mut file_warnings);
        let rows = interpolate(rows, template.sampling);
        tables.push(table(path, PRIORITY_PHILIPPINES, rows));
    }

    debug!("vehicular pipeline - merging {} tables", tables.len());
    let merged = merge(&tables)?;

    debug!("vehicular pipeline - homologating {} rows", merged.len());
    let (report, mut homologation_warnings) =
        homologate(&merged, &template, ReportKind::Vehicular)?;
    warnings.append(&mut homologation_warnings);

    let report_path = session.report_path(VEHICULAR_REPORT);
    write_report(&report, &report_path)?;

    info!(
        session = %session.id,
        rows = report.rows.len(),
        warnings = warnings.len(),
        "vehicular pipeline - complete"
    );
    Ok(PipelineOutcome {
        report_path,
        warnings,
    })
}

/// Run the pedestrian pipeline for one session.
pub fn run_pedestrian(
    session: &Session,
    inputs: &PedestrianInputs,
    requested_interval: Option<SamplingConfig>,
    fallback_interval: SamplingConfig,
) -> Result<PipelineOutcome, PipelineError> {
    info!(session = %session.id, "pedestrian pipeline - starting");
    let mut warnings = Vec::new();

    let template = load_template(
        &inputs.template,
        ReportKind::Pedestrian,
        requested_interval,
        fallback_interval,
    )?;

    let mut tables = Vec::new();
    for path in &inputs.pedestrian {
        let (rows, mut file_warnings) = read_pedestrian(path)?;
        warnings.append(&mut file_warnings);
        tables.push(table(path, PRIORITY_PEDESTRIAN, rows));
    }

    let merged = merge(&tables)?;
    let (report, mut homologation_warnings) =
        homologate(&merged, &template, ReportKind::Pedestrian)?;
    warnings.append(&mut homologation_warnings);

    let report_path = session.report_path(PEDESTRIAN_REPORT);
    write_report(&report, &report_path)?;

    info!(
        session = %session.id,
        rows = report.rows.len(),
        warnings = warnings.len(),
        "pedestrian pipeline - complete"
    );
    Ok(PipelineOutcome {
        report_path,
        warnings,
    })
}

fn table(path: &Path, priority: u8, rows: Vec<crate::models::CanonicalRow>) -> SourceTable {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    SourceTable {
        name,
        priority,
        rows,
    }
}
