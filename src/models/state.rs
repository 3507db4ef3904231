use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BusinessInfo, ChecklistTask, ExecutionPlan, FinalReport, NotificationStatus, Priority,
    Regulation, RiskAssessment, RiskItem, SearchResult,
};
use crate::graph::{Slot, StageId};

/// A recoverable problem recorded while a stage ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: StageId,
    /// The input item concerned (e.g. a regulation id), if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(stage: StageId, message: impl Into<String>) -> Self {
        Self {
            stage,
            item: None,
            message: message.into(),
        }
    }

    pub fn for_item(stage: StageId, item: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            item: Some(item.into()),
            message: message.into(),
        }
    }
}

/// The slot-typed change a stage makes to the run state
#[derive(Debug, Clone, PartialEq)]
pub enum StageDelta {
    Keywords(Vec<String>),
    SearchResults(Vec<SearchResult>),
    Regulations(Vec<Regulation>),
    /// One priority per regulation, positionally
    Priorities(Vec<Priority>),
    Tasks(Vec<ChecklistTask>),
    Plans(Vec<ExecutionPlan>),
    Risk(RiskAssessment),
    Report(FinalReport),
    Notification(NotificationStatus),
}

impl StageDelta {
    /// The state slot this delta writes
    pub fn slot(&self) -> Slot {
        match self {
            Self::Keywords(_) => Slot::Keywords,
            Self::SearchResults(_) => Slot::SearchResults,
            Self::Regulations(_) | Self::Priorities(_) => Slot::Regulations,
            Self::Tasks(_) => Slot::Tasks,
            Self::Plans(_) => Slot::Plans,
            Self::Risk(_) => Slot::RiskItems,
            Self::Report(_) => Slot::Report,
            Self::Notification(_) => Slot::Notification,
        }
    }
}

/// Everything a stage hands back to the scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    pub delta: StageDelta,
    pub diagnostics: Vec<Diagnostic>,
}

impl StageOutput {
    pub fn new(delta: StageDelta) -> Self {
        Self {
            delta,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostics(delta: StageDelta, diagnostics: Vec<Diagnostic>) -> Self {
        Self { delta, diagnostics }
    }
}

/// The single record threaded through a pipeline run
///
/// Field names are part of the export format and must stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub business_info: BusinessInfo,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub search_results: Vec<SearchResult>,
    #[serde(default)]
    pub regulations: Vec<Regulation>,
    #[serde(default)]
    pub tasks: Vec<ChecklistTask>,
    #[serde(default)]
    pub plans: Vec<ExecutionPlan>,
    #[serde(default)]
    pub risk: Option<RiskAssessment>,
    #[serde(default)]
    pub report: Option<FinalReport>,
    #[serde(default)]
    pub notification: Option<NotificationStatus>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub completed_stages: Vec<StageId>,
}

impl PipelineState {
    pub fn new(business_info: BusinessInfo) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            business_info,
            recipients: Vec::new(),
            keywords: Vec::new(),
            search_results: Vec::new(),
            regulations: Vec::new(),
            tasks: Vec::new(),
            plans: Vec::new(),
            risk: None,
            report: None,
            notification: None,
            diagnostics: Vec::new(),
            completed_stages: Vec::new(),
        }
    }

    pub fn with_recipients(mut self, recipients: Vec<String>) -> Self {
        self.recipients = recipients;
        self
    }

    /// Apply a stage's output; list slots are appended to, never replaced
    pub fn apply(&mut self, stage: StageId, output: StageOutput) {
        match output.delta {
            StageDelta::Keywords(keywords) => self.keywords.extend(keywords),
            StageDelta::SearchResults(results) => self.search_results.extend(results),
            StageDelta::Regulations(regulations) => self.regulations.extend(regulations),
            StageDelta::Priorities(priorities) => {
                for (regulation, priority) in self.regulations.iter_mut().zip(priorities) {
                    regulation.priority = priority;
                }
            }
            StageDelta::Tasks(tasks) => self.tasks.extend(tasks),
            StageDelta::Plans(plans) => self.plans.extend(plans),
            StageDelta::Risk(risk) => self.risk = Some(risk),
            StageDelta::Report(report) => self.report = Some(report),
            StageDelta::Notification(status) => self.notification = Some(status),
        }
        self.diagnostics.extend(output.diagnostics);
        self.completed_stages.push(stage);
    }

    pub fn risk_items(&self) -> &[RiskItem] {
        self.risk.as_ref().map(|r| r.items.as_slice()).unwrap_or(&[])
    }

    pub fn regulation(&self, id: &str) -> Option<&Regulation> {
        self.regulations.iter().find(|r| r.id == id)
    }

    /// Tasks belonging to one regulation, in generation order
    pub fn tasks_for<'a>(
        &'a self,
        regulation_id: &'a str,
    ) -> impl Iterator<Item = &'a ChecklistTask> {
        self.tasks
            .iter()
            .filter(move |t| t.regulation_id == regulation_id)
    }

    /// Serialize the run state as pretty JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Recipients for notification, falling back to the business contact
    pub fn effective_recipients(&self) -> Vec<String> {
        if !self.recipients.is_empty() {
            return self.recipients.clone();
        }
        self.business_info
            .contact_email
            .iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect()
    }

    /// Whether a stage has already been applied
    pub fn has_completed(&self, stage: StageId) -> bool {
        self.completed_stages.contains(&stage)
    }

    /// Path-friendly label for artifacts produced by this run
    pub fn artifact_stem(&self) -> String {
        let short: String = self.run_id.chars().take(8).collect();
        format!("compliance_report_{}", short)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn regulation(id: &str) -> Regulation {
        Regulation {
            id: id.to_string(),
            name: format!("Act {}", id),
            category: Category::SafetyEnvironment,
            why_applicable: String::new(),
            authority: String::new(),
            priority: Priority::Medium,
            requirements: vec![],
            reference_url: None,
            evidence: vec![],
        }
    }

    #[test]
    fn test_apply_priorities_positionally() {
        let mut state = PipelineState::new(BusinessInfo::default());
        state.apply(
            StageId::Classify,
            StageOutput::new(StageDelta::Regulations(vec![
                regulation("REG-001"),
                regulation("REG-002"),
            ])),
        );
        state.apply(
            StageId::Prioritize,
            StageOutput::new(StageDelta::Priorities(vec![Priority::High, Priority::Low])),
        );

        assert_eq!(state.regulations[0].priority, Priority::High);
        assert_eq!(state.regulations[1].priority, Priority::Low);
        assert_eq!(
            state.completed_stages,
            vec![StageId::Classify, StageId::Prioritize]
        );
    }

    #[test]
    fn test_apply_records_diagnostics() {
        let mut state = PipelineState::new(BusinessInfo::default());
        state.apply(
            StageId::Keywords,
            StageOutput::with_diagnostics(
                StageDelta::Keywords(vec!["battery".to_string()]),
                vec![Diagnostic::new(StageId::Keywords, "fell back to comma splitting")],
            ),
        );
        assert_eq!(state.keywords, vec!["battery"]);
        assert_eq!(state.diagnostics.len(), 1);
        assert!(state.has_completed(StageId::Keywords));
    }

    #[test]
    fn test_state_export_uses_stable_field_names() {
        let state = PipelineState::new(BusinessInfo::default());
        let value: serde_json::Value =
            serde_json::from_str(&state.to_json_pretty().unwrap()).unwrap();
        for field in [
            "run_id",
            "started_at",
            "business_info",
            "keywords",
            "regulations",
            "tasks",
            "plans",
            "risk",
            "report",
            "diagnostics",
            "completed_stages",
        ] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut state = PipelineState::new(BusinessInfo::default());
        state.keywords = vec!["RoHS".to_string()];
        let restored = PipelineState::from_json(&state.to_json_pretty().unwrap()).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_effective_recipients_falls_back_to_contact() {
        let info = BusinessInfo {
            contact_email: Some(" owner@example.com ".to_string()),
            ..Default::default()
        };
        let state = PipelineState::new(info);
        assert_eq!(state.effective_recipients(), vec!["owner@example.com"]);

        let state = state.with_recipients(vec!["cfo@example.com".to_string()]);
        assert_eq!(state.effective_recipients(), vec!["cfo@example.com"]);
    }
}
