//! Server runtime and ambient infrastructure.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod reporter;
pub mod server;

pub use config::{BridgeConfig, CacheConfig, LoggingConfig, ServerConfig, ToolFilterConfig};
pub use logging::init_logging;
pub use metrics::{CallOutcome, LatencySnapshot, MetricsSnapshot, ToolMetrics};
pub use reporter::{Incident, IncidentReporter, TracingReporter};
pub use server::{ActiveClient, HostHandle, ToolServer};
