//! Per-upload session directories.
//!
//! Every processing run is isolated under `upload_root/<uuid>/` with the
//! uploaded workbooks in `input/` and the generated report in `output/`.
//! Sessions share nothing but disk space under the upload root; cleanup of
//! old sessions is an external concern.

use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

// ---

/// Report file name of a vehicular run.
pub const VEHICULAR_REPORT: &str = "reporte_final_peru.xlsx";
/// Report file name of a pedestrian run.
pub const PEDESTRIAN_REPORT: &str = "reporte_final_peatones.xlsx";

/// One isolated upload-to-report run.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    dir: PathBuf,
}

impl Session {
    /// Create a fresh session directory under `upload_root`.
    pub fn create(upload_root: &Path) -> std::io::Result<Self> {
        let id = Uuid::new_v4();
        let dir = upload_root.join(id.to_string());
        std::fs::create_dir_all(dir.join("input"))?;
        std::fs::create_dir_all(dir.join("output"))?;
        info!(session = %id, "session created at {}", dir.display());
        Ok(Self { id, dir })
    }

    /// Open an existing session by id, if its directory exists.
    pub fn open(upload_root: &Path, id: Uuid) -> Option<Self> {
        let dir = upload_root.join(id.to_string());
        dir.is_dir().then_some(Self { id, dir })
    }

    /// Store one uploaded workbook under `input/`.
    ///
    /// The client-supplied file name is reduced to its final component, so
    /// an upload can never escape the session directory. Only `.xlsx` files
    /// are accepted.
    pub fn store_upload(
        &self,
        field: &str,
        index: usize,
        file_name: &str,
        bytes: &[u8],
    ) -> std::io::Result<PathBuf> {
        let name = Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !name.to_lowercase().ends_with(".xlsx") {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("'{name}': only .xlsx uploads are accepted"),
            ));
        }

        let path = self.dir.join("input").join(format!("{field}_{index}_{name}"));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Path of the report workbook for `file_name` under `output/`.
    pub fn report_path(&self, file_name: &str) -> PathBuf {
        self.dir.join("output").join(file_name)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn store_upload_strips_path_components() {
        // ---
        let root = tempfile::tempdir().unwrap();
        let session = Session::create(root.path()).unwrap();

        let stored = session
            .store_upload("chile", 1, "../../evil/dia1.xlsx", b"data")
            .unwrap();
        assert!(stored.starts_with(root.path().join(session.id.to_string())));
        assert!(stored.file_name().unwrap().to_string_lossy().ends_with("dia1.xlsx"));
        assert_eq!(std::fs::read(&stored).unwrap(), b"data");
    }

    #[test]
    fn store_upload_rejects_non_xlsx() {
        // ---
        let root = tempfile::tempdir().unwrap();
        let session = Session::create(root.path()).unwrap();

        assert!(session.store_upload("chile", 1, "notes.txt", b"x").is_err());
        assert!(session.store_upload("chile", 1, "", b"x").is_err());
    }

    #[test]
    fn open_finds_only_existing_sessions() {
        // ---
        let root = tempfile::tempdir().unwrap();
        let session = Session::create(root.path()).unwrap();

        assert!(Session::open(root.path(), session.id).is_some());
        assert!(Session::open(root.path(), Uuid::new_v4()).is_none());
    }
}
