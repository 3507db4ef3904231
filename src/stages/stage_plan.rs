use tracing::{info, warn};

use super::{StageContext, complete_with_parse_retry, map_items_ordered};
use crate::error::PipelineError;
use crate::graph::StageId;
use crate::llm::build_plan_prompt;
use crate::models::{
    ChecklistTask, Diagnostic, ExecutionPlan, PipelineState, Regulation, StageDelta, StageOutput,
    plan_id,
};
use crate::normalize::{Record, normalize_object};
use crate::planner::PlanBuilder;

async fn plan_for_regulation(
    ctx: &StageContext<'_>,
    regulation: &Regulation,
    tasks: &[&ChecklistTask],
    plan_id: String,
) -> Result<(ExecutionPlan, Vec<Diagnostic>), PipelineError> {
    let prompt = build_plan_prompt(regulation, tasks);
    let hint = complete_with_parse_retry(
        ctx.client,
        StageId::Plan,
        &prompt,
        ctx.config.items.parse_retries,
        normalize_object,
    )
    .await?;

    let mut diagnostics = Vec::new();
    let hint = hint.unwrap_or_else(|| {
        warn!("{}: plan response could not be normalized, using defaults", regulation.id);
        diagnostics.push(Diagnostic::for_item(
            StageId::Plan,
            &regulation.id,
            "plan response could not be normalized; default plan used",
        ));
        Record::new()
    });

    let outcome = PlanBuilder::new(tasks.len()).build(plan_id, regulation, tasks, &hint);
    for (task, prerequisite) in &outcome.dropped_edges {
        diagnostics.push(Diagnostic::for_item(
            StageId::Plan,
            &regulation.id,
            format!(
                "dropped dependency of task {} on task {}: closes a cycle",
                task, prerequisite
            ),
        ));
    }

    info!(
        "{}: {} milestones, critical path {}",
        outcome.plan.plan_id,
        outcome.plan.milestones.len(),
        outcome.plan.critical_path.join(" -> ")
    );
    Ok((outcome.plan, diagnostics))
}

pub async fn execute_plan(
    ctx: &StageContext<'_>,
    state: &PipelineState,
) -> Result<StageOutput, PipelineError> {
    let groups: Vec<(&Regulation, Vec<&ChecklistTask>)> = state
        .regulations
        .iter()
        .map(|regulation| (regulation, state.tasks_for(&regulation.id).collect::<Vec<_>>()))
        .filter(|(_, tasks)| !tasks.is_empty())
        .collect();
    let groups = &groups;

    let per_regulation = map_items_ordered(0..groups.len(), ctx.config.items.concurrency, |i| {
        async move {
            let (regulation, tasks) = &groups[i];
            plan_for_regulation(ctx, regulation, tasks, plan_id(i + 1)).await
        }
    })
    .await?;

    let mut plans = Vec::with_capacity(per_regulation.len());
    let mut diagnostics = Vec::new();
    for (plan, plan_diagnostics) in per_regulation {
        plans.push(plan);
        diagnostics.extend(plan_diagnostics);
    }

    info!("Built {} execution plans", plans.len());
    Ok(StageOutput::with_diagnostics(StageDelta::Plans(plans), diagnostics))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::llm::{ClientError, TextGenerationClient};
    use crate::models::{BusinessInfo, Category, Priority, TaskStatus};
    use crate::stages::PipelineConfig;

    struct CyclicPlanner;

    #[async_trait]
    impl TextGenerationClient for CyclicPlanner {
        async fn complete(&self, prompt: &str) -> Result<String, ClientError> {
            assert!(prompt.starts_with("# Execution planning"));
            Ok(r#"{"timeline": "6 weeks",
                "dependencies": {"1": ["2"], "2": ["1"], "3": ["3", "9"]}}"#
                .to_string())
        }
    }

    fn state() -> PipelineState {
        let mut state = PipelineState::new(BusinessInfo::default());
        for (n, name) in [(1, "Battery Act"), (2, "Export Control Act")] {
            state.regulations.push(Regulation {
                id: format!("REG-00{}", n),
                name: name.to_string(),
                category: Category::SafetyEnvironment,
                why_applicable: String::new(),
                authority: String::new(),
                priority: Priority::Low,
                requirements: vec![],
                reference_url: None,
                evidence: vec![],
            });
        }
        for i in 0..3 {
            state.tasks.push(ChecklistTask {
                regulation_id: "REG-002".to_string(),
                regulation_name: "Export Control Act".to_string(),
                name: format!("Task {}", i),
                responsible_party: String::new(),
                deadline: String::new(),
                steps: vec![],
                estimated_time: String::new(),
                priority: Priority::Low,
                status: TaskStatus::Pending,
                evidence: vec![],
            });
        }
        state
    }

    #[tokio::test]
    async fn test_plans_only_for_regulations_with_tasks() {
        let config = PipelineConfig::default();
        let ctx = StageContext {
            client: &CyclicPlanner,
            config: &config,
        };
        let output = execute_plan(&ctx, &state()).await.unwrap();
        let StageDelta::Plans(plans) = output.delta else {
            panic!("wrong delta");
        };

        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.plan_id, "PLAN-001");
        assert_eq!(plan.regulation_id, "REG-002");
        assert_eq!(plan.timeline, "6 weeks");
        assert_eq!(plan.start_date, Priority::Low.default_start_date());
        assert!(plan.references_are_valid());
        assert!(!plan.dependencies.contains_key("3"));
        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.diagnostics[0].message.contains("cycle"));
    }
}
