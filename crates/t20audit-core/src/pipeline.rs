//! Full audit run: load the reference, scan threat files, validate, report.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::extract::{self, EntityRecord};
use crate::reference::ReferenceLoad;
use crate::report::ReportBuilder;
use crate::source;
use crate::validate::SanityValidator;

/// Records found in one threat file.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub file: String,
    pub path: PathBuf,
    pub records: Vec<EntityRecord>,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct AuditRun {
    pub reference: ReferenceLoad,
    pub files: Vec<ScannedFile>,
    pub issue_count: usize,
    pub report: String,
}

impl AuditRun {
    pub fn record_count(&self) -> usize {
        self.files.iter().map(|f| f.records.len()).sum()
    }
}

/// Threat data files directly inside `dir`, sorted by name.
///
/// Returns `Err` when the directory itself cannot be read.
pub fn threat_files(dir: &Path, config: &AuditConfig) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() && config.is_threat_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Read and extract one file. Unreadable files yield `Err` with the reason.
pub fn scan_file(path: &Path) -> Result<ScannedFile, AuditError> {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let contents = std::fs::read_to_string(path).map_err(|source| AuditError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let records = extract::extract(&contents, &file);
    Ok(ScannedFile {
        file,
        path: path.to_path_buf(),
        records,
    })
}

/// Run the audit without touching the report file.
pub fn run(config: &AuditConfig) -> AuditRun {
    let mut notes = Vec::new();

    tracing::info!(path = %config.reference_document.display(), "reading reference document");
    let loaded = config
        .reference_loader()
        .load(source::open_table_source(&config.reference_document));
    if let Some(reason) = &loaded.document_miss {
        notes.push(format!(
            "Tabela do livro não encontrada ({reason}). Tentando extrair de {}...",
            config.combat_table_file
        ));
    }
    let reference = loaded.load;

    let mut files = Vec::new();
    tracing::info!(path = %config.threats_dir.display(), "scanning threat directory");
    match threat_files(&config.threats_dir, config) {
        Ok(paths) => {
            for path in paths {
                match scan_file(&path) {
                    Ok(scanned) => files.push(scanned),
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "skipping threat file");
                        notes.push(format!("Arquivo ignorado: {err}"));
                    }
                }
            }
        }
        Err(err) => {
            tracing::warn!(path = %config.threats_dir.display(), error = %err, "threat directory unavailable");
            notes.push(format!(
                "Diretório de ameaças indisponível: {}",
                config.threats_dir.display()
            ));
        }
    }

    let validator = SanityValidator::new(config.thresholds);
    let mut builder = ReportBuilder::new(&reference);
    for note in notes {
        builder.note(note);
    }
    builder.threats_scanned(files.iter().map(|f| f.records.len()).sum());
    for scanned in &files {
        let issues = scanned
            .records
            .iter()
            .flat_map(|record| validator.validate(record))
            .collect();
        builder.file(scanned.file.clone(), issues);
    }

    let issue_count = builder.issue_count();
    let report = builder.build();

    AuditRun {
        reference,
        files,
        issue_count,
        report,
    }
}

/// Write the report in one piece, replacing any previous one.
pub fn write_report(path: &Path, report: &str) -> Result<(), AuditError> {
    std::fs::write(path, report).map_err(|source| AuditError::WriteReport {
        path: path.to_path_buf(),
        source,
    })
}

/// [`run`] then [`write_report`] to `config.report_path`.
pub fn run_and_write(config: &AuditConfig) -> Result<AuditRun, AuditError> {
    let run = run(config);
    write_report(&config.report_path, &run.report)?;
    tracing::info!(path = %config.report_path.display(), issues = run.issue_count, "report written");
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threat_files_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["z.ts", "a.ts", "combatTables.ts", "notes.md"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.ts")).unwrap();

        let files = threat_files(dir.path(), &AuditConfig::default()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.ts", "z.ts"]);
    }

    #[test]
    fn missing_everything_still_produces_a_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = AuditConfig {
            threats_dir: dir.path().join("missing"),
            reference_document: dir.path().join("missing.pdf"),
            report_path: dir.path().join("THREAT_ERRORS.md"),
            ..AuditConfig::default()
        };

        let run = run_and_write(&config).unwrap();
        assert_eq!(run.reference, ReferenceLoad::Empty);
        assert_eq!(run.record_count(), 0);

        let written = std::fs::read_to_string(&config.report_path).unwrap();
        assert_eq!(written, run.report);
        assert!(written.contains("ERRO CRÍTICO"));
        assert!(written.contains("Diretório de ameaças indisponível"));
        assert!(written.contains("WARN: Tabela do livro não encontrada"));
    }

    #[test]
    fn write_report_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_report(&dir.path().join("no/such/dir/r.md"), "x").unwrap_err();
        assert!(matches!(err, AuditError::WriteReport { .. }));
    }
}
