use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{
    ItemConfig, SearchConfig, execute_checklist, execute_classify, execute_keywords,
    execute_notify, execute_plan, execute_prioritize, execute_report, execute_risk,
    execute_search,
};
use crate::error::PipelineError;
use crate::graph::{StageExecutor, StageGraph, StageId};
use crate::io::{Notifier, Renderer, SearchProvider};
use crate::llm::TextGenerationClient;
use crate::models::{PipelineState, RiskConfig, StageOutput};
use crate::report::ReportConfig;

/// Configuration for a whole pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub items: ItemConfig,
    pub risk: RiskConfig,
    pub report: ReportConfig,
    pub search: SearchConfig,
}

/// What a text-generation stage needs from the pipeline
pub struct StageContext<'a> {
    pub client: &'a dyn TextGenerationClient,
    pub config: &'a PipelineConfig,
}

/// Binds the stage functions to their collaborators and runs the graph
pub struct Pipeline {
    client: Arc<dyn TextGenerationClient>,
    search: Option<Arc<dyn SearchProvider>>,
    renderer: Option<Arc<dyn Renderer>>,
    notifier: Option<Arc<dyn Notifier>>,
    config: PipelineConfig,
    graph: StageGraph,
}

impl Pipeline {
    pub fn new(client: Arc<dyn TextGenerationClient>, config: PipelineConfig) -> Self {
        Self {
            client,
            search: None,
            renderer: None,
            notifier: None,
            config,
            graph: StageGraph::compliance(),
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Replace the default compliance graph
    pub fn with_graph(mut self, graph: StageGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub async fn run(&self, initial: PipelineState) -> Result<PipelineState, PipelineError> {
        info!(
            "Run {}: {} ({} stages)",
            initial.run_id,
            initial.business_info.label(),
            self.graph.stages().len()
        );
        let state = self.graph.run(self, initial).await?;
        info!(
            "Run {} complete: {} regulations, {} tasks, {} plans, {} diagnostics",
            state.run_id,
            state.regulations.len(),
            state.tasks.len(),
            state.plans.len(),
            state.diagnostics.len()
        );
        Ok(state)
    }
}

#[async_trait]
impl StageExecutor for Pipeline {
    async fn execute(
        &self,
        stage: StageId,
        state: &PipelineState,
    ) -> Result<StageOutput, PipelineError> {
        let ctx = StageContext {
            client: self.client.as_ref(),
            config: &self.config,
        };

        match stage {
            StageId::Keywords => execute_keywords(&ctx, state).await,
            StageId::Search => {
                execute_search(self.search.as_deref(), &self.config.search, state).await
            }
            StageId::Classify => execute_classify(&ctx, state).await,
            StageId::Prioritize => execute_prioritize(&ctx, state).await,
            StageId::Checklist => execute_checklist(&ctx, state).await,
            StageId::Plan => execute_plan(&ctx, state).await,
            StageId::Risk => execute_risk(&ctx, state).await,
            StageId::Report => execute_report(&ctx, self.renderer.as_deref(), state).await,
            StageId::Notify => execute_notify(self.notifier.as_deref(), state).await,
        }
    }
}
