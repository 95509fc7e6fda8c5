//! End-to-end pipeline tests: build fixture workbooks on disk, run the
//! vehicular and pedestrian pipelines against them, and read the produced
//! report workbooks back.

use anyhow::Result;
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

use norun_trafficflow::error::PipelineError;
use norun_trafficflow::models::SamplingConfig;
use norun_trafficflow::pipeline::{
    run_pedestrian, run_vehicular, PedestrianInputs, VehicularInputs,
};
use norun_trafficflow::session::Session;
use norun_trafficflow::xlsx::{cell_str, sheet_at};

// ---

/// Template fixture: two control points, three vehicle classes, and a
/// 15-minute sampling interval on the config sheet.
fn write_template(dir: &Path) -> Result<PathBuf> {
    // ---
    let path = dir.join("plantilla_peru.xlsx");
    let mut workbook = Workbook::new();

    let points = workbook.add_worksheet();
    points.set_name("Puntos de Control")?;
    points.write_string(0, 0, "PUNTO NORUN")?;
    points.write_string(0, 1, "NOMBRE PARA CLIENTE")?;
    points.write_string(1, 0, "PC1A3B")?;
    points.write_string(1, 1, "Av. Arequipa / Av. Javier Prado")?;
    points.write_string(2, 0, "PC2")?;
    points.write_string(2, 1, "Ovalo Centro")?;

    let categories = workbook.add_worksheet();
    categories.set_name("Categorias")?;
    categories.write_string(0, 0, "VEHICULO ENTRADA (NORUN)")?;
    categories.write_string(0, 1, "VEHICULOS SALIDA (PERU)")?;
    for (i, (input, output)) in [("Car", "AUTO"), ("Bus", "BUS"), ("Tricycle", "MOTOTAXI")]
        .iter()
        .enumerate()
    {
        categories.write_string((i + 1) as u32, 0, *input)?;
        categories.write_string((i + 1) as u32, 1, *output)?;
    }

    let config = workbook.add_worksheet();
    config.set_name("Configuracion")?;
    config.write_string(0, 0, "INTERVALO_MINUTOS")?;
    config.write_number(1, 0, 15.0)?;

    workbook.save(&path)?;
    Ok(path)
}

/// Source fixture in the export shape: summary sheet first, then the data
/// sheet with a banner row, a header row, and count rows.
///
/// `rows` are (data source, interval string, counts aligned to
/// `headers[6..]`).
fn write_source(
    path: &Path,
    headers: &[&str],
    rows: &[(&str, &str, &[f64])],
) -> Result<()> {
    // ---
    let mut workbook = Workbook::new();

    let summary = workbook.add_worksheet();
    summary.set_name("Resumen")?;
    summary.write_string(0, 0, "Resumen del estudio")?;

    let data = workbook.add_worksheet();
    data.set_name("Datos")?;
    data.write_string(0, 0, "Conteos por intervalo")?;
    for (col, header) in headers.iter().enumerate() {
        data.write_string(1, col as u16, *header)?;
    }
    for (i, (source, interval, counts)) in rows.iter().enumerate() {
        let r = (i + 2) as u32;
        data.write_string(r, 0, "Estudio Lima")?;
        data.write_string(r, 1, "Lima")?;
        data.write_string(r, 2, *source)?;
        data.write_string(r, 3, "-12.04,-77.03")?;
        data.write_string(r, 4, *interval)?;
        data.write_string(r, 5, "A")?;
        for (j, count) in counts.iter().enumerate() {
            data.write_number(r, (6 + j) as u16, *count)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

const SPANISH_HEADERS: [&str; 8] = [
    "PROYECTO",
    "LOCALIZACIÓN",
    "FUENTE DE DATOS",
    "GEOLOCALIZACIÓN",
    "INTERVALO",
    "MOVIMIENTO",
    "CAR",
    "BUS",
];

const ENGLISH_PH_HEADERS: [&str; 8] = [
    "Project",
    "Location",
    "Data Source",
    "Geolocation",
    "Interval",
    "Movement",
    "Car",
    "Tricycle",
];

fn interval(start: &str, end: &str) -> String {
    format!("01/29/2025 {start} - 01/29/2025 {end}")
}

/// Read the report sheet back as trimmed strings.
fn read_report(path: &Path) -> Vec<Vec<String>> {
    let range = sheet_at(path, 0).unwrap();
    range
        .rows()
        .map(|row| row.iter().map(cell_str).collect())
        .collect()
}

// ---

#[test]
fn vehicular_run_produces_homologated_report() -> Result<()> {
    // ---
    let root = tempfile::tempdir()?;
    let template = write_template(root.path())?;

    // Chile at 08:00; two rows share the PC1A3B prefix and must fold
    let chile = root.path().join("chile_dia1.xlsx");
    write_source(
        &chile,
        &SPANISH_HEADERS,
        &[
            ("PC1A3B-A2-722", &interval("08:00:00", "08:15:00"), &[4.0, 1.0]),
            ("PC1A3B-A2-723", &interval("08:00:00", "08:15:00"), &[3.0, 0.0]),
            ("PC2-B1-100", &interval("08:00:00", "08:15:00"), &[2.0, 5.0]),
        ],
    )?;

    // Philippines at 09:00 and 09:30; the 09:15 gap must be interpolated
    // and tricycles scaled before interpolation
    let philippines = root.path().join("ph_dia1.xlsx");
    write_source(
        &philippines,
        &ENGLISH_PH_HEADERS,
        &[
            ("PC2-B1-100", &interval("09:00:00", "09:15:00"), &[4.0, 2.0]),
            ("PC2-B1-100", &interval("09:30:00", "09:45:00"), &[8.0, 2.0]),
        ],
    )?;

    let session = Session::create(root.path())?;
    let outcome = run_vehicular(
        &session,
        &VehicularInputs {
            template,
            chile: vec![chile],
            complementary: vec![],
            philippines: vec![philippines],
        },
        None,
        SamplingConfig::default(),
    )?;

    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    let rows = read_report(&outcome.report_path);

    assert_eq!(
        rows[0],
        vec![
            "PC", "INTERSECCION", "FECHA", "HORA INICIO", "HORA TERMINO", "CUARTO", "AUTO",
            "BUS", "MOTOTAXI"
        ]
    );

    // Ordered by intersection then time; the template config sheet set the
    // 15-minute interval, so HORA TERMINO is start + 15
    assert_eq!(
        rows[1],
        vec![
            "PC1A3B",
            "Av. Arequipa / Av. Javier Prado",
            "29-01-2025",
            "08:00:00",
            "08:15:00",
            "8,1",
            "7",
            "1",
            "0"
        ]
    );
    assert_eq!(
        rows[2],
        vec![
            "PC2", "Ovalo Centro", "29-01-2025", "08:00:00", "08:15:00", "8,1", "2", "5", "0"
        ]
    );
    // Tricycles come in at 5-minute granularity and are scaled x3
    assert_eq!(
        rows[3],
        vec![
            "PC2", "Ovalo Centro", "29-01-2025", "09:00:00", "09:15:00", "9,1", "4", "0", "6"
        ]
    );
    // Interpolated midpoint
    assert_eq!(
        rows[4],
        vec![
            "PC2", "Ovalo Centro", "29-01-2025", "09:15:00", "09:30:00", "9,2", "6", "0", "6"
        ]
    );
    assert_eq!(
        rows[5],
        vec![
            "PC2", "Ovalo Centro", "29-01-2025", "09:30:00", "09:45:00", "9,3", "8", "0", "6"
        ]
    );
    assert_eq!(rows.len(), 6);

    Ok(())
}

#[test]
fn requested_interval_overrides_template_config() -> Result<()> {
    // ---
    let root = tempfile::tempdir()?;
    let template = write_template(root.path())?;

    let chile = root.path().join("chile.xlsx");
    write_source(
        &chile,
        &SPANISH_HEADERS,
        &[("PC2-B1-100", &interval("08:00:00", "08:30:00"), &[2.0, 5.0])],
    )?;

    let session = Session::create(root.path())?;
    let outcome = run_vehicular(
        &session,
        &VehicularInputs {
            template,
            chile: vec![chile],
            complementary: vec![],
            philippines: vec![],
        },
        SamplingConfig::new(30),
        SamplingConfig::default(),
    )?;

    let rows = read_report(&outcome.report_path);
    assert_eq!(rows[1][3], "08:00:00");
    assert_eq!(rows[1][4], "08:30:00");
    Ok(())
}

#[test]
fn unmapped_control_points_abort_the_run() -> Result<()> {
    // ---
    let root = tempfile::tempdir()?;
    let template = write_template(root.path())?;

    let chile = root.path().join("chile.xlsx");
    write_source(
        &chile,
        &SPANISH_HEADERS,
        &[
            ("CP99-A1-001", &interval("08:00:00", "08:15:00"), &[1.0, 0.0]),
            ("PC2-B1-100", &interval("08:00:00", "08:15:00"), &[2.0, 5.0]),
        ],
    )?;

    let session = Session::create(root.path())?;
    let err = run_vehicular(
        &session,
        &VehicularInputs {
            template,
            chile: vec![chile],
            complementary: vec![],
            philippines: vec![],
        },
        None,
        SamplingConfig::default(),
    )
    .unwrap_err();

    assert!(err.is_user_error());
    match err {
        PipelineError::UnmappedControlPoint(e) => {
            assert_eq!(e.codes, vec!["CP99".to_string()]);
        }
        other => panic!("expected unmapped control point error, got {other}"),
    }
    Ok(())
}

#[test]
fn pedestrian_run_keeps_only_the_person_column() -> Result<()> {
    // ---
    let root = tempfile::tempdir()?;
    let template = write_template(root.path())?;

    let pedestrian = root.path().join("peatones.xlsx");
    write_source(
        &pedestrian,
        &[
            "Project",
            "Location",
            "Data Source",
            "Geolocation",
            "Interval",
            "Movement",
            "Person",
            "Car",
        ],
        &[
            ("PC1A3B-A2-722", &interval("08:00:00", "09:00:00"), &[12.0, 4.0]),
            ("PC2-B1-100", &interval("08:00:00", "09:00:00"), &[3.0, 0.0]),
        ],
    )?;

    let session = Session::create(root.path())?;
    let outcome = run_pedestrian(
        &session,
        &PedestrianInputs {
            template,
            pedestrian: vec![pedestrian],
        },
        None,
        SamplingConfig::default(),
    )?;

    // The stray vehicle column is dropped with a warning, not an error
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.detail.contains("car")));

    let rows = read_report(&outcome.report_path);
    assert_eq!(
        rows[0],
        vec!["PC", "INTERSECCION", "FECHA", "HORA INICIO", "HORA TERMINO", "CUARTO", "PERSONA"]
    );
    assert_eq!(rows[1][1], "Av. Arequipa / Av. Javier Prado");
    assert_eq!(rows[1][6], "12");
    assert_eq!(rows[2][1], "Ovalo Centro");
    assert_eq!(rows[2][6], "3");
    assert_eq!(rows.len(), 3);
    Ok(())
}

#[test]
fn equal_priority_key_collision_is_ambiguous() -> Result<()> {
    // ---
    let root = tempfile::tempdir()?;
    let template = write_template(root.path())?;

    let day1 = root.path().join("chile_a.xlsx");
    let day2 = root.path().join("chile_b.xlsx");
    let row = ("PC2-B1-100", interval("08:00:00", "08:15:00"), [2.0, 5.0]);
    for path in [&day1, &day2] {
        write_source(path, &SPANISH_HEADERS, &[(row.0, &row.1, &row.2)])?;
    }

    let session = Session::create(root.path())?;
    let err = run_vehicular(
        &session,
        &VehicularInputs {
            template,
            chile: vec![day1, day2],
            complementary: vec![],
            philippines: vec![],
        },
        None,
        SamplingConfig::default(),
    )
    .unwrap_err();

    assert!(matches!(err, PipelineError::AmbiguousMerge(_)));
    assert!(err.to_string().contains("equal priority"));
    Ok(())
}
