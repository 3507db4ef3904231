pub mod items;
pub mod pipeline;
pub mod stage_checklist;
pub mod stage_classify;
pub mod stage_keywords;
pub mod stage_notify;
pub mod stage_plan;
pub mod stage_prioritize;
pub mod stage_report;
pub mod stage_risk;
pub mod stage_search;

pub use items::*;
pub use pipeline::*;
pub use stage_checklist::*;
pub use stage_classify::*;
pub use stage_keywords::*;
pub use stage_notify::*;
pub use stage_plan::*;
pub use stage_prioritize::*;
pub use stage_report::*;
pub use stage_risk::*;
pub use stage_search::*;
