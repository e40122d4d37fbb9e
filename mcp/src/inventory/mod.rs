//! Registered tool, prompt and resource storage.

pub mod index;
pub mod types;

pub use index::{IndexCounts, ToolInventory};
pub use types::{PromptArg, PromptEntry, ResourceEntry, StaticPrompt, TextResource, ToolEntry};
