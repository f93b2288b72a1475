//! Markdown report of threat inconsistencies

use crate::reference::ReferenceLoad;
use crate::validate::Issue;

pub const TITLE: &str = "# Relatório de Inconsistências de Ameaças (THREAT_ERRORS)";
pub const ANALYSIS_HEADER: &str = "## Análise";

/// Issues found in one scanned file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIssues {
    pub file: String,
    pub issues: Vec<Issue>,
}

/// Assembles the report. Files are emitted in the order they were added.
#[derive(Debug, Clone)]
pub struct ReportBuilder<'a> {
    reference: &'a ReferenceLoad,
    notes: Vec<String>,
    threats_scanned: usize,
    files: Vec<FileIssues>,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(reference: &'a ReferenceLoad) -> Self {
        Self {
            reference,
            notes: Vec::new(),
            threats_scanned: 0,
            files: Vec::new(),
        }
    }

    /// Warning line shown above the reference summary.
    pub fn note(&mut self, note: impl Into<String>) -> &mut Self {
        self.notes.push(note.into());
        self
    }

    pub fn threats_scanned(&mut self, count: usize) -> &mut Self {
        self.threats_scanned = count;
        self
    }

    pub fn file(&mut self, file: impl Into<String>, issues: Vec<Issue>) -> &mut Self {
        self.files.push(FileIssues {
            file: file.into(),
            issues,
        });
        self
    }

    pub fn issue_count(&self) -> usize {
        self.files.iter().map(|f| f.issues.len()).sum()
    }

    pub fn build(&self) -> String {
        let mut out = String::new();
        out.push_str(TITLE);
        out.push_str("\n\n");

        for note in &self.notes {
            out.push_str(&format!("WARN: {note}\n"));
        }

        match self.reference {
            ReferenceLoad::Loaded { source, table } => out.push_str(&format!(
                "## Tabela de Referência Carregada ({} entradas, fonte: {source})\n\n",
                table.len()
            )),
            ReferenceLoad::Empty => out.push_str(
                "## ERRO CRÍTICO: Não foi possível carregar tabela de estatísticas.\n\n",
            ),
        }

        if self.threats_scanned == 0 {
            out.push_str("Nenhuma ameaça encontrada nos arquivos analisados.\n");
        }

        out.push_str(ANALYSIS_HEADER);
        out.push('\n');

        for section in self.files.iter().filter(|f| !f.issues.is_empty()) {
            out.push_str(&format!("### {}\n", section.file));
            for issue in &section.issues {
                out.push_str(&format!(
                    "- [{}] (ND {}) {}\n",
                    issue.category, issue.raw_tier, issue.description
                ));
            }
            out.push('\n');
        }

        out
    }
}
