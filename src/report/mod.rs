pub mod assembler;
pub mod markdown;

pub use assembler::*;
pub use markdown::*;

pub const DEFAULT_DISCLAIMER: &str = "This report was generated by an automated analysis tool \
and is provided for reference only. Have compliance confirmed by a qualified expert; \
the user remains responsible for decisions based on this report.";

/// Configuration for the report stage
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// High-risk items listed in the risk section before truncating
    pub max_high_risk_listed: usize,
    pub disclaimer: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_high_risk_listed: 5,
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
        }
    }
}
