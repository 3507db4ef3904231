use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{EvidenceRecord, Priority};

/// Sections of the final document, in rendering order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    BusinessContext,
    RegulationCatalogue,
    Checklist,
    PlanTimeline,
    RiskMatrix,
    NarrativeSummary,
    CitationIndex,
}

impl SectionKind {
    pub const ORDER: [SectionKind; 7] = [
        SectionKind::BusinessContext,
        SectionKind::RegulationCatalogue,
        SectionKind::Checklist,
        SectionKind::PlanTimeline,
        SectionKind::RiskMatrix,
        SectionKind::NarrativeSummary,
        SectionKind::CitationIndex,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::BusinessContext => "Business Context",
            Self::RegulationCatalogue => "Regulation Catalogue",
            Self::Checklist => "Compliance Checklist",
            Self::PlanTimeline => "Execution Plan and Timeline",
            Self::RiskMatrix => "Risk Assessment",
            Self::NarrativeSummary => "Executive Summary",
            Self::CitationIndex => "Citations",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// One markdown section of the final document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub title: String,
    /// Markdown body, without the section heading
    pub body: String,
}

/// An immediate action surfaced in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub name: String,
    pub deadline: String,
    pub priority: Priority,
}

/// The assembled report handed to the renderer and notifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    /// Report heading
    pub title: String,
    /// Date the report was assembled (YYYY-MM-DD)
    pub generated_on: String,
    /// Narrative summary text, inserted verbatim into the document
    pub executive_summary: String,
    pub key_insights: Vec<String>,
    pub action_items: Vec<ActionItem>,
    pub risk_highlights: Vec<String>,
    pub next_steps: Vec<String>,
    pub full_document: Vec<ReportSection>,
    pub citations: Vec<EvidenceRecord>,
    /// Footer appended after the last section
    pub disclaimer: String,
    /// Set by the renderer; `None` when rendering failed or was not configured
    pub pdf_path: Option<PathBuf>,
}

impl FinalReport {
    pub fn section(&self, kind: SectionKind) -> Option<&ReportSection> {
        self.full_document.iter().find(|s| s.kind == kind)
    }
}
