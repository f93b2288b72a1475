//! Paginated table sources
//!
//! The reference loader only needs "give me the table on page N". Two
//! adapters are provided:
//! - [`TableSet`]: tables already extracted elsewhere, held in memory or
//!   loaded from JSON
//! - `PdfTableSource` (feature `pdf`): text-layout table detection on top of
//!   `pdf-extract`

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One table row; `None` marks an empty cell.
pub type TableRow = Vec<Option<String>>;

/// Rows of a table, header first.
pub type Table = Vec<TableRow>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },
    #[error("table extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid table JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported table source: {0}")]
    Unsupported(String),
    #[error("PDF feature not enabled. Compile with --features pdf")]
    FeatureNotEnabled,
}

/// A paginated document that may carry one table per page.
pub trait TableSource {
    fn page_count(&self) -> usize;

    /// Table on `page` (zero-based), `Ok(None)` when the page has none.
    fn extract_table(&self, page: usize) -> Result<Option<Table>, SourceError>;
}

// ============================================================================
// In-memory / JSON tables
// ============================================================================

/// Pre-extracted tables, one optional table per page.
///
/// JSON form: `{"pages": [null, [["ND", "Ataque"], ["1", "+8"]]]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSet {
    pub pages: Vec<Option<Table>>,
}

impl TableSet {
    pub fn new(pages: Vec<Option<Table>>) -> Self {
        Self { pages }
    }

    pub fn from_json_str(json: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

impl TableSource for TableSet {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn extract_table(&self, page: usize) -> Result<Option<Table>, SourceError> {
        self.pages
            .get(page)
            .cloned()
            .ok_or(SourceError::PageOutOfRange {
                page,
                count: self.pages.len(),
            })
    }
}

/// Open a table source by file extension (`.json`, or `.pdf` with the
/// `pdf` feature).
pub fn open_table_source(path: &Path) -> Result<Box<dyn TableSource>, SourceError> {
    if !path.exists() {
        return Err(SourceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "json" => Ok(Box::new(TableSet::from_json_file(path)?)),
        "pdf" => open_pdf(path),
        other => Err(SourceError::Unsupported(format!(
            "{} (extension '{other}')",
            path.display()
        ))),
    }
}

#[cfg(feature = "pdf")]
fn open_pdf(path: &Path) -> Result<Box<dyn TableSource>, SourceError> {
    Ok(Box::new(PdfTableSource::open(path)?))
}

#[cfg(not(feature = "pdf"))]
fn open_pdf(_path: &Path) -> Result<Box<dyn TableSource>, SourceError> {
    Err(SourceError::FeatureNotEnabled)
}

// ============================================================================
// Text-layout table detection
// ============================================================================

/// Split a text line into cells on tabs or runs of two or more spaces.
pub fn split_cells(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut spaces = 0usize;

    for c in line.trim().chars() {
        match c {
            '\t' => {
                push_cell(&mut cells, &mut current);
                spaces = 0;
            }
            ' ' => spaces += 1,
            _ => {
                if spaces >= 2 {
                    push_cell(&mut cells, &mut current);
                } else if spaces == 1 {
                    current.push(' ');
                }
                spaces = 0;
                current.push(c);
            }
        }
    }
    push_cell(&mut cells, &mut current);
    cells
}

fn push_cell(cells: &mut Vec<String>, current: &mut String) {
    if !current.trim().is_empty() {
        cells.push(current.trim().to_string());
    }
    current.clear();
}

/// Largest run of consecutive lines that split into two or more cells.
pub fn detect_table(page_text: &str) -> Option<Table> {
    let mut best: Table = Vec::new();
    let mut run: Table = Vec::new();

    for line in page_text.lines() {
        let cells = split_cells(line);
        if cells.len() >= 2 {
            run.push(cells.into_iter().map(Some).collect());
        } else {
            if run.len() > best.len() {
                best = std::mem::take(&mut run);
            }
            run.clear();
        }
    }
    if run.len() > best.len() {
        best = run;
    }

    (best.len() >= 2).then_some(best)
}

/// PDF-backed table source using `pdf-extract`.
///
/// Pages are split on form feeds; each page's table is found by
/// [`detect_table`].
#[cfg(feature = "pdf")]
pub struct PdfTableSource {
    pages: Vec<String>,
}

#[cfg(feature = "pdf")]
impl PdfTableSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let bytes = std::fs::read(path)?;
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| SourceError::ExtractionFailed(e.to_string()))?;
        Ok(Self::from_text(&text))
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            pages: text.split('\x0C').map(str::to_string).collect(),
        }
    }
}

#[cfg(feature = "pdf")]
impl TableSource for PdfTableSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn extract_table(&self, page: usize) -> Result<Option<Table>, SourceError> {
        let text = self.pages.get(page).ok_or(SourceError::PageOutOfRange {
            page,
            count: self.pages.len(),
        })?;
        Ok(detect_table(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_cells_on_wide_gaps() {
        assert_eq!(
            split_cells("ND   Ataque  Dano médio\tDefesa"),
            vec!["ND", "Ataque", "Dano médio", "Defesa"]
        );
        assert!(split_cells("   ").is_empty());
    }

    #[test]
    fn detect_table_picks_longest_run() {
        let page = "Capítulo 7\n\
                    A  B\n\
                    \n\
                    ND   Ataque   Dano\n\
                    1/4  +4       1d6\n\
                    1/2  +6       1d8\n\
                    Texto corrido aqui.";
        let table = detect_table(page).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table[0][1].as_deref(), Some("Ataque"));
        assert_eq!(table[2][0].as_deref(), Some("1/2"));
        assert!(detect_table("só texto").is_none());
    }

    #[test]
    fn table_set_reports_out_of_range_pages() {
        let set = TableSet::from_json_str(r#"{"pages": [null, [["ND", "Ataque"], ["1", null]]]}"#)
            .unwrap();
        assert_eq!(set.page_count(), 2);
        assert!(set.extract_table(0).unwrap().is_none());
        let table = set.extract_table(1).unwrap().unwrap();
        assert_eq!(table[1], vec![Some("1".to_string()), None]);
        assert!(matches!(
            set.extract_table(2),
            Err(SourceError::PageOutOfRange { page: 2, count: 2 })
        ));
    }

    #[test]
    fn missing_or_unknown_sources_are_errors() {
        assert!(matches!(
            open_table_source(Path::new("/nonexistent/livro.pdf")),
            Err(SourceError::Io(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("livro.txt");
        std::fs::write(&txt, "x").unwrap();
        assert!(matches!(
            open_table_source(&txt),
            Err(SourceError::Unsupported(_))
        ));
    }
}
