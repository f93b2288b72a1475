//! Reference combat table loading
//!
//! The expected stats per tier come from one of two places:
//! 1. the rulebook's table, found in a narrow page window of a
//!    [`TableSource`]
//! 2. the `SOLO_COMBAT_TABLE` literal in the data directory's combat table
//!    file, when the rulebook is missing or has no matching table
//!
//! The first source that yields rows wins; sources are never merged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::scan::{self, TokenKind};
use crate::source::{SourceError, Table, TableSource};
use crate::tier;

/// Positions of the stat columns in a rulebook row (after empty cells are
/// dropped).
const ATTACK_CELL: usize = 1;
const DAMAGE_CELL: usize = 2;
const DEFENSE_CELL: usize = 3;
const HIT_POINTS_CELL: usize = 7;

/// A stat that may be missing from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatValue {
    Known(String),
    Unknown,
}

impl StatValue {
    fn from_cell(cell: Option<&String>) -> Self {
        cell.map_or(StatValue::Unknown, |c| StatValue::Known(c.clone()))
    }

    fn from_capture(re: &Regex, block: &str) -> Self {
        re.captures(block)
            .map_or(StatValue::Unknown, |c| StatValue::Known(c[1].to_string()))
    }

    pub fn as_known(&self) -> Option<&str> {
        match self {
            StatValue::Known(v) => Some(v),
            StatValue::Unknown => None,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Known(v) => f.write_str(v),
            StatValue::Unknown => f.write_str("?"),
        }
    }
}

/// Expected combat stats for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceStatRow {
    pub attack: StatValue,
    pub damage: StatValue,
    pub defense: StatValue,
    pub hit_points: StatValue,
}

/// Canonical tier key -> expected stats.
pub type ReferenceTable = HashMap<String, ReferenceStatRow>;

/// Where a loaded table came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceSource {
    /// Zero-based page index in the rulebook.
    Document { page: usize },
    Code { path: PathBuf },
}

impl fmt::Display for ReferenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceSource::Document { page } => write!(f, "livro, página {}", page + 1),
            ReferenceSource::Code { path } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                f.write_str(&name)
            }
        }
    }
}

/// Outcome of the load phase.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceLoad {
    Loaded {
        source: ReferenceSource,
        table: ReferenceTable,
    },
    Empty,
}

impl ReferenceLoad {
    pub fn len(&self) -> usize {
        match self {
            ReferenceLoad::Loaded { table, .. } => table.len(),
            ReferenceLoad::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn source(&self) -> Option<&ReferenceSource> {
        match self {
            ReferenceLoad::Loaded { source, .. } => Some(source),
            ReferenceLoad::Empty => None,
        }
    }

    pub fn table(&self) -> Option<&ReferenceTable> {
        match self {
            ReferenceLoad::Loaded { table, .. } => Some(table),
            ReferenceLoad::Empty => None,
        }
    }
}

// ============================================================================
// Rulebook table
// ============================================================================

/// Header keywords that identify the stats table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderMarkers {
    pub tier: Vec<String>,
    pub attack: Vec<String>,
}

impl Default for HeaderMarkers {
    fn default() -> Self {
        Self {
            tier: vec!["nd".to_string()],
            attack: vec!["ataque".to_string(), "atk".to_string()],
        }
    }
}

impl HeaderMarkers {
    pub fn matches(&self, header: &[Option<String>]) -> bool {
        let text = header
            .iter()
            .flatten()
            .filter(|c| !c.trim().is_empty())
            .map(|c| c.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        let found = |markers: &[String]| {
            markers
                .iter()
                .any(|m| text.contains(m.trim().to_lowercase().as_str()))
        };
        found(&self.tier) && found(&self.attack)
    }
}

fn clean_cell(cell: &str) -> String {
    cell.trim().replace(['\r', '\n'], " ")
}

/// Convert an accepted table's data rows into reference rows.
pub fn parse_stat_rows(table: &Table) -> ReferenceTable {
    let mut stats = ReferenceTable::new();

    for row in table.iter().skip(1) {
        let cells: Vec<String> = row
            .iter()
            .flatten()
            .map(|c| clean_cell(c))
            .filter(|c| !c.is_empty())
            .collect();
        let Some(raw_tier) = cells.first() else {
            continue;
        };

        stats.insert(
            tier::normalize(raw_tier),
            ReferenceStatRow {
                attack: StatValue::from_cell(cells.get(ATTACK_CELL)),
                damage: StatValue::from_cell(cells.get(DAMAGE_CELL)),
                defense: StatValue::from_cell(cells.get(DEFENSE_CELL)),
                hit_points: StatValue::from_cell(cells.get(HIT_POINTS_CELL)),
            },
        );
    }

    stats
}

/// Scan `pages` of `source` for the stats table. First accepted table wins.
///
/// Returns the page index and the parsed rows, or `None` when no page in
/// the window has a usable table.
pub fn load_from_table_source(
    source: &dyn TableSource,
    pages: Range<usize>,
    markers: &HeaderMarkers,
) -> Option<(usize, ReferenceTable)> {
    for page in pages {
        if page >= source.page_count() {
            break;
        }

        let rows = match source.extract_table(page) {
            Ok(Some(rows)) if !rows.is_empty() => rows,
            Ok(_) => continue,
            Err(SourceError::PageOutOfRange { .. }) => break,
            Err(err) => {
                tracing::warn!(page, error = %err, "table extraction failed, skipping page");
                continue;
            }
        };

        if !markers.matches(&rows[0]) {
            continue;
        }

        tracing::info!(page, "found reference table");
        let stats = parse_stat_rows(&rows);
        if stats.is_empty() {
            tracing::warn!(page, "reference table has no data rows");
            return None;
        }
        return Some((page, stats));
    }

    None
}

// ============================================================================
// Combat table literal
// ============================================================================

struct LiteralPatterns {
    tier: Regex,
    attack: Regex,
    damage: Regex,
    defense: Regex,
    hit_points: Regex,
}

impl LiteralPatterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            tier: Regex::new(r#"\bnd\s*:\s*(ChallengeLevel\.[A-Za-z_]+|"[^"]*"|'[^']*'|\d+(?:[./,]\d+)?)"#)?,
            attack: Regex::new(r"\battackValue\s*:\s*(\d+)")?,
            damage: Regex::new(r#"\bdamage\s*:\s*["'`]([^"'`]*)["'`]"#)?,
            defense: Regex::new(r"\bdefense\s*:\s*(\d+)")?,
            hit_points: Regex::new(r"\bhitPoints\s*:\s*(\d+)")?,
        })
    }
}

/// Body (between the brackets) of the array literal assigned to `name`.
fn array_literal<'a>(content: &'a str, name: &str) -> Option<&'a str> {
    let tokens = scan::tokenize(content);

    // First mention of `name` that is assigned an array literal; imports
    // and other references are skipped.
    let open = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.kind == TokenKind::Ident && t.text == name)
        .find_map(|(decl, _)| {
            let eq = (decl + 1..tokens.len())
                .take_while(|&i| !tokens[i].is_punct(';'))
                .find(|&i| tokens[i].is_punct('='))?;
            tokens
                .get(eq + 1)
                .filter(|t| t.is_punct('['))
                .map(|_| eq + 1)
        })?;

    let start = tokens[open].span.end;
    let end = scan::matching_close(&tokens, open)
        .map(|close| tokens[close].span.start)
        .unwrap_or(content.len());
    Some(&content[start..end])
}

/// Parse the `name` array literal of a combat table source file.
/// Entries without a tier are skipped.
pub fn parse_combat_table(content: &str, name: &str) -> ReferenceTable {
    let mut stats = ReferenceTable::new();

    let Some(list) = array_literal(content, name) else {
        return stats;
    };
    let patterns = match LiteralPatterns::new() {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!(error = %err, "invalid combat table pattern");
            return stats;
        }
    };

    let tokens = scan::tokenize(list);
    for (open, close) in scan::child_blocks(&tokens, 0..tokens.len(), 0) {
        let start = tokens[open].span.end;
        let end = tokens.get(close).map_or(list.len(), |t| t.span.start);
        let block = &list[start..end];

        let Some(tier_match) = patterns.tier.captures(block) else {
            continue;
        };
        let raw = tier_match[1].trim_matches(|c| c == '"' || c == '\'');

        stats.insert(
            tier::normalize(raw),
            ReferenceStatRow {
                attack: StatValue::from_capture(&patterns.attack, block),
                damage: StatValue::from_capture(&patterns.damage, block),
                defense: StatValue::from_capture(&patterns.defense, block),
                hit_points: StatValue::from_capture(&patterns.hit_points, block),
            },
        );
    }

    stats
}

// ============================================================================
// Loader
// ============================================================================

/// Where to look for the reference table.
#[derive(Debug, Clone)]
pub struct ReferenceLoader {
    pub pages: Range<usize>,
    pub markers: HeaderMarkers,
    pub combat_table_path: PathBuf,
    pub combat_table_name: String,
}

/// Result of [`ReferenceLoader::load`] with the reason the rulebook was
/// skipped, if it was.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub load: ReferenceLoad,
    /// Set when the rulebook table was not used (missing source, no table).
    pub document_miss: Option<String>,
}

impl ReferenceLoader {
    /// Try the rulebook first, then the combat table file.
    ///
    /// `document` is `Err` when the rulebook could not be opened; it is
    /// dropped before the fallback is read.
    pub fn load(&self, document: Result<Box<dyn TableSource>, SourceError>) -> LoadReport {
        let document_miss = match document {
            Ok(source) => {
                match load_from_table_source(source.as_ref(), self.pages.clone(), &self.markers) {
                    Some((page, table)) => {
                        return LoadReport {
                            load: ReferenceLoad::Loaded {
                                source: ReferenceSource::Document { page },
                                table,
                            },
                            document_miss: None,
                        };
                    }
                    None => format!(
                        "nenhuma tabela de referência nas páginas {}-{}",
                        self.pages.start + 1,
                        self.pages.end
                    ),
                }
            }
            Err(err) => err.to_string(),
        };

        tracing::warn!(reason = %document_miss, "rulebook table unavailable, trying combat table");
        LoadReport {
            load: self.load_fallback(),
            document_miss: Some(document_miss),
        }
    }

    /// Read the combat table literal; `Empty` when missing or unparsable.
    pub fn load_fallback(&self) -> ReferenceLoad {
        load_from_code(&self.combat_table_path, &self.combat_table_name)
    }
}

/// Load the `name` literal from the file at `path`.
pub fn load_from_code(path: &Path, name: &str) -> ReferenceLoad {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "combat table unavailable");
            return ReferenceLoad::Empty;
        }
    };

    tracing::info!(path = %path.display(), "reading stats from combat table");
    let table = parse_combat_table(&content, name);
    if table.is_empty() {
        ReferenceLoad::Empty
    } else {
        ReferenceLoad::Loaded {
            source: ReferenceSource::Code {
                path: path.to_path_buf(),
            },
            table,
        }
    }
}
