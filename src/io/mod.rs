pub mod input;
pub mod notify;
pub mod output;
pub mod render;
pub mod search;

pub use input::*;
pub use notify::*;
pub use output::*;
pub use render::*;
pub use search::*;
