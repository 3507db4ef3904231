use std::collections::{HashMap, HashSet};
use std::time::Instant;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::info;

use super::{Slot, StageId, StageNode};
use crate::error::{GraphError, PipelineError};
use crate::models::{PipelineState, StageOutput};

/// Runs individual stages on behalf of a [`StageGraph`]
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Execute `stage` against a read-only view of the state
    async fn execute(
        &self,
        stage: StageId,
        state: &PipelineState,
    ) -> Result<StageOutput, PipelineError>;
}

/// A validated DAG of stages with at most one open fork at a time
#[derive(Debug, Clone)]
pub struct StageGraph {
    nodes: Vec<StageNode>,
}

impl StageGraph {
    /// Build a graph, rejecting invalid fork/join structure
    pub fn new(nodes: Vec<StageNode>) -> Result<Self, GraphError> {
        validate(&nodes)?;
        Ok(Self { nodes })
    }

    /// The compliance pipeline:
    ///
    /// keywords → search → classify → prioritize → fork{checklist → plan | risk}
    /// → join → report → notify
    pub fn compliance() -> Self {
        Self {
            nodes: vec![
                StageNode::Sequential(StageId::Keywords),
                StageNode::Sequential(StageId::Search),
                StageNode::Sequential(StageId::Classify),
                StageNode::Sequential(StageId::Prioritize),
                StageNode::Fork(vec![
                    vec![StageId::Checklist, StageId::Plan],
                    vec![StageId::Risk],
                ]),
                StageNode::Join(vec![StageId::Plan, StageId::Risk]),
                StageNode::Sequential(StageId::Report),
                StageNode::Sequential(StageId::Notify),
            ],
        }
    }

    pub fn nodes(&self) -> &[StageNode] {
        &self.nodes
    }

    /// Every stage in declaration order
    pub fn stages(&self) -> Vec<StageId> {
        self.nodes
            .iter()
            .flat_map(|node| match node {
                StageNode::Sequential(stage) => vec![*stage],
                StageNode::Fork(branches) => branches.iter().flatten().copied().collect(),
                StageNode::Join(_) => vec![],
            })
            .collect()
    }

    /// Drive `initial` through every stage
    ///
    /// Any stage error aborts the run; no partial state is returned.
    pub async fn run<E>(
        &self,
        executor: &E,
        initial: PipelineState,
    ) -> Result<PipelineState, PipelineError>
    where
        E: StageExecutor + ?Sized,
    {
        let mut state = initial;
        let mut pending: Option<Vec<Vec<(StageId, StageOutput)>>> = None;

        for node in &self.nodes {
            match node {
                StageNode::Sequential(stage) => {
                    let output = run_stage(executor, *stage, &state).await?;
                    state.apply(*stage, output);
                }
                StageNode::Fork(branches) => {
                    info!("Forking {} branches", branches.len());
                    let snapshot = &state;
                    let results = try_join_all(
                        branches
                            .iter()
                            .map(|branch| run_branch(executor, branch, snapshot)),
                    )
                    .await?;
                    pending = Some(results);
                }
                StageNode::Join(waits) => {
                    let branches = pending.take().ok_or(GraphError::JoinWithoutFork)?;
                    for (stage, output) in branches.into_iter().flatten() {
                        state.apply(stage, output);
                    }
                    info!(
                        "Joined on {}",
                        waits
                            .iter()
                            .map(StageId::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
            }
        }

        Ok(state)
    }
}

impl Default for StageGraph {
    fn default() -> Self {
        Self::compliance()
    }
}

async fn run_stage<E>(
    executor: &E,
    stage: StageId,
    state: &PipelineState,
) -> Result<StageOutput, PipelineError>
where
    E: StageExecutor + ?Sized,
{
    info!("Stage {}: starting", stage);
    let started = Instant::now();
    let output = executor.execute(stage, state).await?;

    let slot = output.delta.slot();
    if slot != stage.writes() {
        return Err(PipelineError::SlotMismatch {
            stage,
            slot,
            expected: stage.writes(),
        });
    }

    info!(
        "Stage {}: done in {:.1}s, {} diagnostics",
        stage,
        started.elapsed().as_secs_f64(),
        output.diagnostics.len()
    );
    Ok(output)
}

/// Run one fork branch on a private copy of the snapshot
async fn run_branch<E>(
    executor: &E,
    branch: &[StageId],
    snapshot: &PipelineState,
) -> Result<Vec<(StageId, StageOutput)>, PipelineError>
where
    E: StageExecutor + ?Sized,
{
    let mut local = snapshot.clone();
    let mut outputs = Vec::with_capacity(branch.len());

    for &stage in branch {
        let output = run_stage(executor, stage, &local).await?;
        local.apply(stage, output.clone());
        outputs.push((stage, output));
    }

    Ok(outputs)
}

fn validate(nodes: &[StageNode]) -> Result<(), GraphError> {
    let mut seen = HashSet::new();
    let mut open_fork: Option<&Vec<Vec<StageId>>> = None;

    let mut visit = |stage: StageId| {
        if seen.insert(stage) {
            Ok(())
        } else {
            Err(GraphError::DuplicateStage(stage))
        }
    };

    for node in nodes {
        if open_fork.is_some() && !matches!(node, StageNode::Join(_)) {
            return Err(GraphError::UnjoinedFork);
        }

        match node {
            StageNode::Sequential(stage) => visit(*stage)?,
            StageNode::Fork(branches) => {
                if branches.is_empty() {
                    return Err(GraphError::EmptyFork);
                }
                for branch in branches {
                    if branch.is_empty() {
                        return Err(GraphError::EmptyBranch);
                    }
                    for &stage in branch {
                        visit(stage)?;
                    }
                }
                check_branch_slots(branches)?;
                open_fork = Some(branches);
            }
            StageNode::Join(waits) => {
                let branches = open_fork.take().ok_or(GraphError::JoinWithoutFork)?;
                let terminals: Vec<StageId> =
                    branches.iter().filter_map(|b| b.last().copied()).collect();

                if let Some(&unknown) = waits.iter().find(|w| !terminals.contains(w)) {
                    return Err(GraphError::UnknownWait(unknown));
                }
                if let Some(&missing) = terminals.iter().find(|t| !waits.contains(t)) {
                    return Err(GraphError::MissingWait(missing));
                }
            }
        }
    }

    if open_fork.is_some() {
        return Err(GraphError::UnjoinedFork);
    }
    Ok(())
}

/// Branches must write disjoint slots and never read a sibling's slot
fn check_branch_slots(branches: &[Vec<StageId>]) -> Result<(), GraphError> {
    let mut writer: HashMap<Slot, usize> = HashMap::new();

    for (index, branch) in branches.iter().enumerate() {
        for stage in branch {
            let slot = stage.writes();
            match writer.get(&slot) {
                Some(&owner) if owner != index => {
                    return Err(GraphError::OverlappingWrites(slot));
                }
                _ => {
                    writer.insert(slot, index);
                }
            }
        }
    }

    for (index, branch) in branches.iter().enumerate() {
        for &stage in branch {
            for &slot in stage.reads() {
                if matches!(writer.get(&slot), Some(&owner) if owner != index) {
                    return Err(GraphError::CrossBranchRead { stage, slot });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::models::{
        BusinessInfo, ChecklistTask, FinalReport, NotificationStatus, Priority, RiskAssessment,
        StageDelta, TaskStatus,
    };

    /// Records start/end events and returns minimal deltas
    struct RecordingExecutor {
        events: Mutex<Vec<String>>,
        fail_on: Option<StageId>,
    }

    impl RecordingExecutor {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn position(&self, event: &str) -> usize {
            self.events()
                .iter()
                .position(|e| e == event)
                .unwrap_or_else(|| panic!("no event {}", event))
        }
    }

    fn task() -> ChecklistTask {
        ChecklistTask {
            regulation_id: "REG-001".to_string(),
            regulation_name: "Act".to_string(),
            name: "File registration".to_string(),
            responsible_party: "Ops".to_string(),
            deadline: "TBD".to_string(),
            steps: vec![],
            estimated_time: "TBD".to_string(),
            priority: Priority::High,
            status: TaskStatus::Pending,
            evidence: vec![],
        }
    }

    #[async_trait]
    impl StageExecutor for RecordingExecutor {
        async fn execute(
            &self,
            stage: StageId,
            state: &PipelineState,
        ) -> Result<StageOutput, PipelineError> {
            self.events.lock().unwrap().push(format!("start:{}", stage));

            if stage == StageId::Risk {
                // Risk sees the pre-fork snapshot, never checklist output
                assert!(state.tasks.is_empty());
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            if stage == StageId::Plan {
                assert_eq!(state.tasks.len(), 1);
            }
            if self.fail_on == Some(stage) {
                return Err(PipelineError::client(
                    stage,
                    crate::llm::ClientError::Transport("unreachable".to_string()),
                ));
            }

            let delta = match stage {
                StageId::Keywords => StageDelta::Keywords(vec!["battery".to_string()]),
                StageId::Search => StageDelta::SearchResults(vec![]),
                StageId::Classify => StageDelta::Regulations(vec![]),
                StageId::Prioritize => StageDelta::Priorities(vec![]),
                StageId::Checklist => StageDelta::Tasks(vec![task()]),
                StageId::Plan => StageDelta::Plans(vec![]),
                StageId::Risk => StageDelta::Risk(RiskAssessment::default()),
                StageId::Report => StageDelta::Report(FinalReport::default()),
                StageId::Notify => StageDelta::Notification(NotificationStatus::default()),
            };

            self.events.lock().unwrap().push(format!("end:{}", stage));
            Ok(StageOutput::new(delta))
        }
    }

    #[test]
    fn test_compliance_graph_is_valid() {
        let graph = StageGraph::compliance();
        assert!(validate(graph.nodes()).is_ok());
        assert_eq!(graph.stages().len(), 9);
    }

    #[tokio::test]
    async fn test_report_waits_for_both_branches() {
        let executor = RecordingExecutor::new();
        let state = StageGraph::compliance()
            .run(&executor, PipelineState::new(BusinessInfo::default()))
            .await
            .unwrap();

        let report_start = executor.position("start:report");
        assert!(executor.position("end:plan") < report_start);
        assert!(executor.position("end:risk") < report_start);
        // The risk branch sleeps, so checklist/plan start before risk finishes
        assert!(executor.position("start:plan") < executor.position("end:risk"));

        assert_eq!(state.tasks.len(), 1);
        assert!(state.risk.is_some());
        assert!(state.report.is_some());
        assert_eq!(state.completed_stages.len(), 9);
        assert_eq!(
            &state.completed_stages[4..7],
            &[StageId::Checklist, StageId::Plan, StageId::Risk]
        );
    }

    #[tokio::test]
    async fn test_branch_failure_aborts_run() {
        let executor = RecordingExecutor {
            fail_on: Some(StageId::Risk),
            ..RecordingExecutor::new()
        };
        let result = StageGraph::compliance()
            .run(&executor, PipelineState::new(BusinessInfo::default()))
            .await;

        assert!(matches!(
            result,
            Err(PipelineError::Client {
                stage: StageId::Risk,
                ..
            })
        ));
        assert!(!executor.events().contains(&"start:report".to_string()));
    }

    #[test]
    fn test_rejects_overlapping_branch_writes() {
        let result = StageGraph::new(vec![
            StageNode::Fork(vec![vec![StageId::Classify], vec![StageId::Prioritize]]),
            StageNode::Join(vec![StageId::Classify, StageId::Prioritize]),
        ]);
        assert_eq!(
            result.unwrap_err(),
            GraphError::OverlappingWrites(Slot::Regulations)
        );
    }

    #[test]
    fn test_rejects_cross_branch_read() {
        let result = StageGraph::new(vec![
            StageNode::Fork(vec![vec![StageId::Checklist], vec![StageId::Plan]]),
            StageNode::Join(vec![StageId::Checklist, StageId::Plan]),
        ]);
        assert_eq!(
            result.unwrap_err(),
            GraphError::CrossBranchRead {
                stage: StageId::Plan,
                slot: Slot::Tasks
            }
        );
    }

    #[test]
    fn test_rejects_unjoined_fork() {
        let result = StageGraph::new(vec![
            StageNode::Fork(vec![vec![StageId::Checklist], vec![StageId::Risk]]),
            StageNode::Sequential(StageId::Report),
        ]);
        assert_eq!(result.unwrap_err(), GraphError::UnjoinedFork);

        let result = StageGraph::new(vec![StageNode::Fork(vec![
            vec![StageId::Checklist],
            vec![StageId::Risk],
        ])]);
        assert_eq!(result.unwrap_err(), GraphError::UnjoinedFork);
    }

    #[test]
    fn test_rejects_join_missing_a_branch() {
        let result = StageGraph::new(vec![
            StageNode::Fork(vec![
                vec![StageId::Checklist, StageId::Plan],
                vec![StageId::Risk],
            ]),
            StageNode::Join(vec![StageId::Plan]),
        ]);
        assert_eq!(result.unwrap_err(), GraphError::MissingWait(StageId::Risk));

        let result = StageGraph::new(vec![
            StageNode::Fork(vec![
                vec![StageId::Checklist, StageId::Plan],
                vec![StageId::Risk],
            ]),
            StageNode::Join(vec![StageId::Checklist, StageId::Risk]),
        ]);
        assert_eq!(
            result.unwrap_err(),
            GraphError::UnknownWait(StageId::Checklist)
        );
    }

    #[test]
    fn test_rejects_duplicates_and_stray_join() {
        let result = StageGraph::new(vec![
            StageNode::Sequential(StageId::Keywords),
            StageNode::Sequential(StageId::Keywords),
        ]);
        assert_eq!(
            result.unwrap_err(),
            GraphError::DuplicateStage(StageId::Keywords)
        );

        let result = StageGraph::new(vec![StageNode::Join(vec![StageId::Risk])]);
        assert_eq!(result.unwrap_err(), GraphError::JoinWithoutFork);
    }

    #[tokio::test]
    async fn test_custom_sequential_graph() {
        let graph = StageGraph::new(vec![
            StageNode::Sequential(StageId::Keywords),
            StageNode::Sequential(StageId::Classify),
        ])
        .unwrap();
        let executor = RecordingExecutor::new();
        let state = graph
            .run(&executor, PipelineState::new(BusinessInfo::default()))
            .await
            .unwrap();
        assert_eq!(state.keywords, vec!["battery"]);
        assert_eq!(
            executor.events(),
            vec![
                "start:keywords",
                "end:keywords",
                "start:classify",
                "end:classify"
            ]
        );
    }
}
