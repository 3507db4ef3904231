pub mod dependencies;

pub use dependencies::*;

use serde_json::Value;

use crate::evidence::merge_evidence;
use crate::models::{ChecklistTask, ExecutionPlan, Milestone, Regulation};
use crate::normalize::{Record, str_or, task_ids};

pub const DEFAULT_TIMELINE: &str = "3 months";

/// An execution plan plus the cycle-closing edges removed while building it
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: ExecutionPlan,
    pub dropped_edges: Vec<DroppedEdge>,
}

/// Builds a validated plan over a regulation's tasks
///
/// Task ids are always "1".."N" by position; ids in the hint are only ever
/// references into that universe.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    task_ids: Vec<String>,
}

impl PlanBuilder {
    pub fn new(task_count: usize) -> Self {
        Self {
            task_ids: (1..=task_count).map(|i| i.to_string()).collect(),
        }
    }

    pub fn task_ids(&self) -> &[String] {
        &self.task_ids
    }

    fn known(&self, id: &str) -> bool {
        self.task_ids.iter().any(|t| t == id)
    }

    fn filter_ids(&self, raw: Option<&Value>) -> Vec<String> {
        task_ids(raw)
            .into_iter()
            .filter(|id| self.known(id))
            .collect()
    }

    /// Milestones with task references restricted to the universe
    ///
    /// A milestone left without references takes the next task no earlier
    /// milestone covers, or every task once all are covered.
    pub fn milestones(&self, raw: Option<&Value>) -> Vec<Milestone> {
        let Some(Value::Array(entries)) = raw else {
            return Vec::new();
        };

        let mut uncovered: Vec<String> = self.task_ids.clone();
        let mut milestones = Vec::new();

        for entry in entries {
            let Value::Object(record) = entry else {
                continue;
            };

            let mut ids = self.filter_ids(record.get("tasks").or_else(|| record.get("task_ids")));
            if ids.is_empty() {
                ids = if uncovered.is_empty() {
                    self.task_ids.clone()
                } else {
                    vec![uncovered.remove(0)]
                };
            } else {
                uncovered.retain(|id| !ids.contains(id));
            }

            milestones.push(Milestone {
                name: str_or(record, &["name", "title"], "Milestone"),
                deadline: str_or(record, &["deadline", "due"], ""),
                task_ids: ids,
                completion_criteria: str_or(record, &["completion_criteria"], ""),
            });
        }

        milestones
    }

    /// Parallel groups restricted to the universe, empty groups dropped
    pub fn parallel_groups(&self, raw: Option<&Value>) -> Vec<Vec<String>> {
        let groups: Vec<&Value> = match raw {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(value @ Value::String(_)) => vec![value],
            _ => return Vec::new(),
        };

        groups
            .into_iter()
            .map(|group| self.filter_ids(Some(group)))
            .filter(|group| !group.is_empty())
            .collect()
    }

    /// Critical path restricted to the universe, else every task in order
    pub fn critical_path(&self, raw: Option<&Value>) -> Vec<String> {
        let path = self.filter_ids(raw);
        if path.is_empty() {
            self.task_ids.clone()
        } else {
            path
        }
    }

    /// Build the plan for `regulation` from its tasks and a parsed hint
    ///
    /// An empty hint yields the default plan.
    pub fn build(
        &self,
        plan_id: String,
        regulation: &Regulation,
        tasks: &[&ChecklistTask],
        hint: &Record,
    ) -> PlanOutcome {
        let filtered = filter_dependencies(hint.get("dependencies"), &self.task_ids);
        let (dependencies, dropped_edges) = break_cycles(&self.task_ids, filtered);

        let plan = ExecutionPlan {
            plan_id,
            regulation_id: regulation.id.clone(),
            regulation_name: regulation.name.clone(),
            task_ids: self.task_ids.clone(),
            timeline: str_or(hint, &["timeline"], DEFAULT_TIMELINE),
            start_date: str_or(hint, &["start_date"], regulation.priority.default_start_date()),
            milestones: self.milestones(hint.get("milestones")),
            dependencies,
            parallel_groups: self.parallel_groups(
                hint.get("parallel_tasks").or_else(|| hint.get("parallel_groups")),
            ),
            critical_path: self.critical_path(hint.get("critical_path")),
            evidence: merge_evidence(tasks.iter().map(|t| &t.evidence)),
        };

        PlanOutcome {
            plan,
            dropped_edges,
        }
    }
}
