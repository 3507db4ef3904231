use thiserror::Error;

use crate::graph::{Slot, StageId};
use crate::io::SearchError;
use crate::llm::ClientError;

/// Structural problems in a stage graph, detected before anything runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("stage {0} appears more than once")]
    DuplicateStage(StageId),

    #[error("fork has no branches")]
    EmptyFork,

    #[error("fork branch is empty")]
    EmptyBranch,

    #[error("fork is not followed by a join")]
    UnjoinedFork,

    #[error("join without a preceding fork")]
    JoinWithoutFork,

    #[error("join waits on {0}, which is not the last stage of any branch")]
    UnknownWait(StageId),

    #[error("join does not wait on branch ending in {0}")]
    MissingWait(StageId),

    #[error("branches write the same slot: {0}")]
    OverlappingWrites(Slot),

    #[error("stage {stage} reads {slot}, which a sibling branch writes")]
    CrossBranchRead { stage: StageId, slot: Slot },
}

/// Fatal errors that abort a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("text generation failed in stage {stage}: {source}")]
    Client {
        stage: StageId,
        #[source]
        source: ClientError,
    },

    #[error("search failed: {0}")]
    Search(#[from] SearchError),

    #[error("invalid stage graph: {0}")]
    Graph(#[from] GraphError),

    #[error("stage {stage} produced a delta for slot {slot}, expected {expected}")]
    SlotMismatch {
        stage: StageId,
        slot: Slot,
        expected: Slot,
    },
}

impl PipelineError {
    pub fn client(stage: StageId, source: ClientError) -> Self {
        Self::Client { stage, source }
    }
}
