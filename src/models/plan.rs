use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::EvidenceRecord;

/// A checkpoint within an execution plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub name: String,
    pub deadline: String,
    /// Plan-local task ids covered by this milestone
    pub task_ids: Vec<String>,
    pub completion_criteria: String,
}

/// Execution plan for the tasks of one regulation
///
/// Task ids are plan-local ("1".."N") and every id referenced by milestones,
/// dependencies, parallel groups or the critical path is one of `task_ids`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub plan_id: String,
    pub regulation_id: String,
    pub regulation_name: String,
    pub task_ids: Vec<String>,
    pub timeline: String,
    pub start_date: String,
    pub milestones: Vec<Milestone>,
    /// task id -> prerequisite task ids
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub parallel_groups: Vec<Vec<String>>,
    pub critical_path: Vec<String>,
    pub evidence: Vec<EvidenceRecord>,
}

impl ExecutionPlan {
    /// Check that every referenced id belongs to the plan's task universe
    pub fn references_are_valid(&self) -> bool {
        let universe: HashSet<&str> = self.task_ids.iter().map(String::as_str).collect();
        let known = |id: &String| universe.contains(id.as_str());

        self.dependencies
            .iter()
            .all(|(task, deps)| known(task) && deps.iter().all(known))
            && self.parallel_groups.iter().flatten().all(known)
            && self.critical_path.iter().all(known)
            && self
                .milestones
                .iter()
                .flat_map(|m| &m.task_ids)
                .all(known)
    }
}

/// Identifier for the plan at 1-based position `index`
pub fn plan_id(index: usize) -> String {
    format!("PLAN-{:03}", index)
}
