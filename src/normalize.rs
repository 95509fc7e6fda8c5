//! Text normalization for header and control-point matching.
//!
//! Source workbooks arrive with Spanish or English headers, inconsistent
//! casing and accents ("LOCALIZACIÓN", "Localizacion", "Location"). All
//! schema matching happens on a normalized form: NFD accent stripping,
//! lowercase, trimmed, with English labels folded to their Spanish
//! equivalents so the rest of the pipeline deals with one vocabulary.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// ---

/// English header labels and their canonical Spanish forms.
const EQUIVALENCES: &[(&str, &str)] = &[
    ("project", "proyecto"),
    ("location", "localizacion"),
    ("data source", "fuente de datos"),
    ("geolocation", "geolocalizacion"),
    ("interval", "intervalo"),
    ("movement", "movimiento"),
    ("person", "persona"),
    ("vehicle input (norun)", "vehiculo entrada (norun)"),
    ("vehicle output (peru)", "vehiculos salida (peru)"),
];

/// Normalize a header or label for matching: strip accents, lowercase, trim,
/// then apply the English→Spanish equivalence table.
pub fn normalize_label(raw: &str) -> String {
    let stripped: String = raw
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let lowered = stripped.to_lowercase().trim().to_string();

    for (english, spanish) in EQUIVALENCES {
        if lowered == *english {
            return (*spanish).to_string();
        }
    }
    lowered
}

/// Extract the control-point prefix from a full source code.
///
/// Source exports suffix the code with approach/lane data
/// ("PC1A3B-A2-722"); the template maps only the prefix ("PC1A3B").
pub fn control_point_prefix(raw: &str) -> String {
    raw.split('-').next().unwrap_or(raw).trim().to_string()
}
