//! Threat data auditing for Tormenta20
//!
//! Checks threat stat blocks (TypeScript object literals) for numeric values
//! that do not fit their difficulty tier ("ND"):
//! - tier normalization across enum members, fractions, decimals and letter codes
//! - reference combat table from the rulebook, with the code table as fallback
//! - block-aware extraction of `attributes` / `skills` per threat
//! - threshold rules for low and mid tier threats
//! - a Markdown report grouped by file
//!
//! Output: a single report file, rewritten on every run.

pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod reference;
pub mod report;
pub mod scan;
pub mod source;
pub mod tier;
pub mod validate;

pub use config::AuditConfig;
pub use error::AuditError;
pub use extract::{extract, EntityRecord};
pub use pipeline::{run, run_and_write, write_report, AuditRun, ScannedFile};
pub use reference::{
    HeaderMarkers, LoadReport, ReferenceLoad, ReferenceLoader, ReferenceSource, ReferenceStatRow,
    ReferenceTable, StatValue,
};
pub use report::{FileIssues, ReportBuilder};
pub use source::{open_table_source, SourceError, Table, TableRow, TableSet, TableSource};
pub use tier::{magnitude, normalize, DifficultyTier, TierVocabulary, SENTINEL_MAGNITUDE};
pub use validate::{
    FieldKind, Issue, IssueCategory, SanityValidator, ThresholdRule, Thresholds, ValidationRule,
};

#[cfg(feature = "pdf")]
pub use source::PdfTableSource;
