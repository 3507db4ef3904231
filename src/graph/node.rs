use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one stage of the compliance pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Keywords,
    Search,
    Classify,
    Prioritize,
    Checklist,
    Plan,
    Risk,
    Report,
    Notify,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keywords => "keywords",
            Self::Search => "search",
            Self::Classify => "classify",
            Self::Prioritize => "prioritize",
            Self::Checklist => "checklist",
            Self::Plan => "plan",
            Self::Risk => "risk",
            Self::Report => "report",
            Self::Notify => "notify",
        }
    }

    /// The slot this stage writes
    pub fn writes(&self) -> Slot {
        match self {
            Self::Keywords => Slot::Keywords,
            Self::Search => Slot::SearchResults,
            Self::Classify | Self::Prioritize => Slot::Regulations,
            Self::Checklist => Slot::Tasks,
            Self::Plan => Slot::Plans,
            Self::Risk => Slot::RiskItems,
            Self::Report => Slot::Report,
            Self::Notify => Slot::Notification,
        }
    }

    /// The slots this stage reads
    pub fn reads(&self) -> &'static [Slot] {
        match self {
            Self::Keywords => &[],
            Self::Search => &[Slot::Keywords],
            Self::Classify => &[Slot::Keywords, Slot::SearchResults],
            Self::Prioritize => &[Slot::Regulations],
            Self::Checklist | Self::Risk => &[Slot::Regulations],
            Self::Plan => &[Slot::Regulations, Slot::Tasks],
            Self::Report => &[
                Slot::Regulations,
                Slot::Tasks,
                Slot::Plans,
                Slot::RiskItems,
            ],
            Self::Notify => &[Slot::Report, Slot::Tasks, Slot::Plans],
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named slot of `PipelineState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Keywords,
    SearchResults,
    Regulations,
    Tasks,
    Plans,
    RiskItems,
    Report,
    Notification,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Keywords => "keywords",
            Self::SearchResults => "search_results",
            Self::Regulations => "regulations",
            Self::Tasks => "tasks",
            Self::Plans => "plans",
            Self::RiskItems => "risk_items",
            Self::Report => "report",
            Self::Notification => "notification",
        };
        f.write_str(name)
    }
}

/// One step of a stage graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageNode {
    /// Run a single stage against the current state
    Sequential(StageId),
    /// Run each branch independently against the same snapshot.
    /// Stages within a branch run in order and see earlier branch output.
    Fork(Vec<Vec<StageId>>),
    /// Barrier: apply every branch's output once all branches finished.
    /// Lists the last stage of each branch of the preceding fork.
    Join(Vec<StageId>),
}
