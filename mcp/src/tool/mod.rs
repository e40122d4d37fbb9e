//! Tool definition, translation and execution.

pub mod descriptor;
pub mod factory;
pub mod handler;
pub mod schema;
pub mod validate;
pub mod wrapper;

pub use descriptor::{Example, ParamType, Parameter, ToolDescriptor};
pub use factory::{validate_tool, ToolConstructor, ToolFactory};
pub use handler::{Tool, ToolContext};
pub use schema::{build_description, build_input_schema, normalize_output_schema};
pub use validate::{validate_arguments, Violation};
pub use wrapper::{expected_error_result, slug, tool_name, ExecutionHooks, RegisteredTool};
