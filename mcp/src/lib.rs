//! Tool registration and execution framework for Model Context Protocol servers.
//!
//! Backend clients describe their tools declaratively; the framework turns each
//! description into a protocol-callable tool with a validated input schema, a
//! generated description, side-effect annotations and a two-tier error
//! contract.
//!
//! ## Modules
//!
//! - [`tool`]: descriptors, schema translation, validation, execution wrapper,
//!   static discovery
//! - [`clients`]: client trait, registry and configuration resolvers
//! - [`inventory`]: registered tool, prompt and resource storage
//! - [`core`]: server, configuration, logging, metrics, incident reporting
//!
//! ## Shared Types
//!
//! - [`ToolAnnotations`]: side-effect hints (read_only, destructive, etc.)
//! - [`ToolCache`]: TTL cache shared by every tool
//! - [`ToolError`]: expected, user-facing tool failure

// Shared types (used across modules)
pub mod annotations;
pub mod cache;
pub mod error;

// Subsystems
pub mod clients;
pub mod core;
pub mod inventory;
pub mod tool;

// Re-export shared types
pub use annotations::{AnnotationHints, ToolAnnotations};
pub use cache::ToolCache;
// Re-export from clients
pub use clients::{
    Client, ClientContext, ClientRegistry, ClientRegistryEntry, ConfigKey, ConfigResolver,
    ConfigValues, EnvResolver, HeaderResolver, Registrar,
};
// Re-export from core
pub use core::{
    init_logging, ActiveClient, BridgeConfig, CallOutcome, HostHandle, Incident,
    IncidentReporter, MetricsSnapshot, ToolMetrics, ToolServer, TracingReporter,
};
pub use error::{BridgeError, BridgeResult, HandlerError, InvocationError, ToolError};
// Re-export from inventory
pub use inventory::{PromptArg, StaticPrompt, TextResource, ToolInventory};
// Re-export from tool
pub use tool::{
    Example, ParamType, Parameter, RegisteredTool, Tool, ToolContext, ToolDescriptor, ToolFactory,
};
