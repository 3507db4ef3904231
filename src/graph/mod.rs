pub mod node;
pub mod scheduler;

pub use node::*;
pub use scheduler::*;
