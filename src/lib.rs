pub mod error;
pub mod evidence;
pub mod graph;
pub mod io;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod planner;
pub mod report;
pub mod stages;

pub use error::{GraphError, PipelineError};
pub use evidence::{EvidenceMerger, merge_evidence};
pub use graph::{Slot, StageExecutor, StageGraph, StageId, StageNode};
pub use io::{
    MarkdownFileRenderer, Notifier, Renderer, RunInput, RunSummary, SearchProvider, TavilyClient,
    TavilyConfig, read_run_input, read_state, write_state,
};
pub use llm::{
    AnthropicClient, AnthropicConfig, ClientError, RetryConfig, RetryingClient,
    TextGenerationClient,
};
pub use models::{BusinessInfo, FinalReport, PipelineState};
pub use normalize::{Record, normalize, normalize_object};
pub use planner::PlanBuilder;
pub use report::{ReportAssembler, ReportConfig};
pub use stages::{ItemConfig, Pipeline, PipelineConfig, SearchConfig};
