use serde::{Deserialize, Serialize};

use super::{EvidenceRecord, Priority};

/// Progress of a checklist task, tracked outside the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// One actionable compliance task for a regulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistTask {
    /// Must reference an existing `Regulation::id`
    pub regulation_id: String,
    pub regulation_name: String,
    pub name: String,
    pub responsible_party: String,
    pub deadline: String,
    pub steps: Vec<String>,
    pub estimated_time: String,
    /// Copied from the parent regulation
    pub priority: Priority,
    pub status: TaskStatus,
    pub evidence: Vec<EvidenceRecord>,
}
