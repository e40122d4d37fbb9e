//! Incident reporting for unexpected tool failures.
//!
//! Only errors that are not [`ToolError`](crate::error::ToolError)s reach a
//! reporter, and each reaches it exactly once. Hosts plug a telemetry exporter in
//! by implementing [`IncidentReporter`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

/// Metadata describing one unexpected failure.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub tool_name: String,
    pub client: String,
    pub message: String,
}

impl Incident {
    pub fn new(
        tool_name: impl Into<String>,
        client: impl Into<String>,
        error: &anyhow::Error,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            occurred_at: Utc::now(),
            tool_name: tool_name.into(),
            client: client.into(),
            message: format!("{error:#}"),
        }
    }
}

pub trait IncidentReporter: Send + Sync {
    fn report(&self, incident: &Incident, error: &anyhow::Error);
}

/// Default reporter: an error-level log line per incident.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl IncidentReporter for TracingReporter {
    fn report(&self, incident: &Incident, error: &anyhow::Error) {
        error!(
            incident_id = %incident.id,
            tool = %incident.tool_name,
            client = %incident.client,
            error = ?error,
            "Unexpected tool failure"
        );
    }
}
