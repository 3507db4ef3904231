pub mod client;
pub mod prompts;
pub mod retry;

pub use client::*;
pub use prompts::*;
pub use retry::*;
