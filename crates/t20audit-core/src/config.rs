//! Run configuration
//!
//! Defaults are compiled in; a JSON file may override any subset of fields.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::AuditError;
use crate::reference::{HeaderMarkers, ReferenceLoader};
use crate::validate::Thresholds;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Directory holding the threat data files.
    pub threats_dir: PathBuf,
    /// Rulebook (`.pdf`) or pre-extracted tables (`.json`).
    pub reference_document: PathBuf,
    /// Combat table file name inside `threats_dir`; skipped when scanning.
    pub combat_table_file: String,
    /// Array literal holding the fallback table.
    pub combat_table_name: String,
    /// Zero-based rulebook pages to search, end exclusive.
    pub first_page: usize,
    pub last_page: usize,
    pub header_markers: HeaderMarkers,
    /// Extensions of threat data files.
    pub extensions: Vec<String>,
    pub report_path: PathBuf,
    pub thresholds: Thresholds,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            threats_dir: PathBuf::from("src/data/threats"),
            reference_document: PathBuf::from("src/data/T20 - Livro Básico.pdf"),
            combat_table_file: "combatTables.ts".to_string(),
            combat_table_name: "SOLO_COMBAT_TABLE".to_string(),
            first_page: 318,
            last_page: 324,
            header_markers: HeaderMarkers::default(),
            extensions: vec!["ts".to_string()],
            report_path: PathBuf::from("THREAT_ERRORS.md"),
            thresholds: Thresholds::default(),
        }
    }
}

impl AuditConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, AuditError> {
        let text = std::fs::read_to_string(path).map_err(|source| AuditError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AuditError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn page_window(&self) -> Range<usize> {
        self.first_page..self.last_page.max(self.first_page)
    }

    pub fn combat_table_path(&self) -> PathBuf {
        self.threats_dir.join(&self.combat_table_file)
    }

    pub fn reference_loader(&self) -> ReferenceLoader {
        ReferenceLoader {
            pages: self.page_window(),
            markers: self.header_markers.clone(),
            combat_table_path: self.combat_table_path(),
            combat_table_name: self.combat_table_name.clone(),
        }
    }

    /// Whether `path` is a threat data file (right extension, not the
    /// combat table).
    pub fn is_threat_file(&self, path: &Path) -> bool {
        let is_table = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy() == self.combat_table_file);
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
        ext_ok && !is_table
    }
}
