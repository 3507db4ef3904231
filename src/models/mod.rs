pub mod business;
pub mod checklist;
pub mod evidence;
pub mod notification;
pub mod plan;
pub mod regulation;
pub mod report;
pub mod risk;
pub mod search;
pub mod state;

pub use business::*;
pub use checklist::*;
pub use evidence::*;
pub use notification::*;
pub use plan::*;
pub use regulation::*;
pub use report::*;
pub use risk::*;
pub use search::*;
pub use state::*;
