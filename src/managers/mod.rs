//! Manager registries consulted by the default dispatcher
//!
//! Resources are named JSON values, tools are named callables, and prompts
//! are named templates. All three are thread-safe and shared as `Arc`s so
//! the owner can keep registering entries while the server is running.

pub mod prompts;
pub mod resources;
pub mod tools;

pub use prompts::PromptManager;
pub use resources::ResourceManager;
pub use tools::ToolManager;
