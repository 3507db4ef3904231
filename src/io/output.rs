use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::PipelineState;

/// Write the run state as pretty JSON
pub fn write_state(state: &PipelineState, path: &Path) -> Result<()> {
    let json = state
        .to_json_pretty()
        .context("Failed to serialize run state")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write file: {:?}", path))
}

/// Read a previously exported run state
pub fn read_state(path: &Path) -> Result<PipelineState> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    PipelineState::from_json(&content).context("Failed to parse run state JSON")
}

/// Counts printed at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub regulations: usize,
    pub tasks: usize,
    pub plans: usize,
    pub high_risk: usize,
    pub overall_risk: f64,
    pub citations: usize,
    pub diagnostics: usize,
    pub report_path: Option<String>,
}

impl RunSummary {
    pub fn from_state(state: &PipelineState) -> Self {
        let report = state.report.as_ref();
        Self {
            run_id: state.run_id.clone(),
            regulations: state.regulations.len(),
            tasks: state.tasks.len(),
            plans: state.plans.len(),
            high_risk: state.risk.as_ref().map_or(0, |r| r.matrix.high.len()),
            overall_risk: state.risk.as_ref().map_or(0.0, |r| r.overall_score),
            citations: report.map_or(0, |r| r.citations.len()),
            diagnostics: state.diagnostics.len(),
            report_path: report
                .and_then(|r| r.pdf_path.as_ref())
                .map(|p| p.display().to_string()),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.run_id)?;
        writeln!(f, "  Regulations:  {}", self.regulations)?;
        writeln!(f, "  Tasks:        {}", self.tasks)?;
        writeln!(f, "  Plans:        {}", self.plans)?;
        writeln!(
            f,
            "  Risk:         {:.2}/10 ({} high)",
            self.overall_risk, self.high_risk
        )?;
        writeln!(f, "  Citations:    {}", self.citations)?;
        writeln!(f, "  Diagnostics:  {}", self.diagnostics)?;
        match &self.report_path {
            Some(path) => write!(f, "  Report:       {}", path),
            None => write!(f, "  Report:       (not rendered)"),
        }
    }
}
