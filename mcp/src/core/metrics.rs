//! Invocation metrics, broken down by error-taxonomy outcome.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// How a single invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    /// Handler raised a `ToolError`.
    ExpectedError,
    /// Arguments rejected before the handler ran.
    ValidationFailure,
    /// Anything else the handler raised.
    UnexpectedError,
    /// Declared output schema, missing structured content.
    ContractViolation,
}

pub struct ToolMetrics {
    total_calls: AtomicU64,
    successful_calls: AtomicU64,
    expected_errors: AtomicU64,
    validation_failures: AtomicU64,
    unexpected_errors: AtomicU64,
    contract_violations: AtomicU64,
    active_executions: AtomicU64,
    tool_latencies: DashMap<String, LatencyStats>,
}

impl ToolMetrics {
    pub fn new() -> Self {
        Self {
            total_calls: AtomicU64::new(0),
            successful_calls: AtomicU64::new(0),
            expected_errors: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            unexpected_errors: AtomicU64::new(0),
            contract_violations: AtomicU64::new(0),
            active_executions: AtomicU64::new(0),
            tool_latencies: DashMap::new(),
        }
    }

    pub fn record_call_start(&self, _tool: &str) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.active_executions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_call_end(&self, tool: &str, outcome: CallOutcome, duration_ms: u64) {
        self.active_executions.fetch_sub(1, Ordering::Relaxed);

        let counter = match outcome {
            CallOutcome::Success => &self.successful_calls,
            CallOutcome::ExpectedError => &self.expected_errors,
            CallOutcome::ValidationFailure => &self.validation_failures,
            CallOutcome::UnexpectedError => &self.unexpected_errors,
            CallOutcome::ContractViolation => &self.contract_violations,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if let Some(stats) = self.tool_latencies.get(tool) {
            stats.record(duration_ms);
            return;
        }
        self.tool_latencies
            .entry(tool.to_string())
            .or_insert_with(LatencyStats::new)
            .record(duration_ms);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            successful_calls: self.successful_calls.load(Ordering::Relaxed),
            expected_errors: self.expected_errors.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            unexpected_errors: self.unexpected_errors.load(Ordering::Relaxed),
            contract_violations: self.contract_violations.load(Ordering::Relaxed),
            active_executions: self.active_executions.load(Ordering::Relaxed),
        }
    }

    pub fn tool_latency(&self, tool: &str) -> Option<LatencySnapshot> {
        self.tool_latencies.get(tool).map(|stats| stats.snapshot())
    }

    /// Reset counters. Active executions are left alone.
    pub fn reset(&self) {
        self.total_calls.store(0, Ordering::Relaxed);
        self.successful_calls.store(0, Ordering::Relaxed);
        self.expected_errors.store(0, Ordering::Relaxed);
        self.validation_failures.store(0, Ordering::Relaxed);
        self.unexpected_errors.store(0, Ordering::Relaxed);
        self.contract_violations.store(0, Ordering::Relaxed);
        self.tool_latencies.clear();
    }
}

impl Default for ToolMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-tool latency statistics.
pub struct LatencyStats {
    count: AtomicU64,
    total_ms: AtomicU64,
    min_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl LatencyStats {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            total_ms: AtomicU64::new(0),
            min_ms: AtomicU64::new(u64::MAX),
            max_ms: AtomicU64::new(0),
        }
    }

    fn record(&self, ms: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.min_ms.fetch_min(ms, Ordering::Relaxed);
        self.max_ms.fetch_max(ms, Ordering::Relaxed);
    }

    fn snapshot(&self) -> LatencySnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total = self.total_ms.load(Ordering::Relaxed);
        let min = self.min_ms.load(Ordering::Relaxed);

        LatencySnapshot {
            count,
            avg_ms: if count > 0 { total / count } else { 0 },
            min_ms: if min == u64::MAX { 0 } else { min },
            max_ms: self.max_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub expected_errors: u64,
    pub validation_failures: u64,
    pub unexpected_errors: u64,
    pub contract_violations: u64,
    pub active_executions: u64,
}

impl MetricsSnapshot {
    /// Share of completed calls that did not fail unexpectedly, as a percentage.
    ///
    /// Expected errors and validation failures count as healthy.
    pub fn health_rate(&self) -> f64 {
        let completed = self.successful_calls
            + self.expected_errors
            + self.validation_failures
            + self.unexpected_errors
            + self.contract_violations;
        if completed == 0 {
            100.0
        } else {
            let unhealthy = self.unexpected_errors + self.contract_violations;
            ((completed - unhealthy) as f64 / completed as f64) * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencySnapshot {
    pub count: u64,
    pub avg_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_counters() {
        let metrics = ToolMetrics::new();

        metrics.record_call_start("ci_get_build");
        assert_eq!(metrics.snapshot().active_executions, 1);
        metrics.record_call_end("ci_get_build", CallOutcome::Success, 10);

        for outcome in [
            CallOutcome::ExpectedError,
            CallOutcome::ValidationFailure,
            CallOutcome::UnexpectedError,
            CallOutcome::ContractViolation,
        ] {
            metrics.record_call_start("ci_get_build");
            metrics.record_call_end("ci_get_build", outcome, 10);
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_calls, 5);
        assert_eq!(snapshot.successful_calls, 1);
        assert_eq!(snapshot.expected_errors, 1);
        assert_eq!(snapshot.validation_failures, 1);
        assert_eq!(snapshot.unexpected_errors, 1);
        assert_eq!(snapshot.contract_violations, 1);
        assert_eq!(snapshot.active_executions, 0);
    }

    #[test]
    fn test_latency_stats() {
        let metrics = ToolMetrics::new();

        for ms in [100, 200, 150] {
            metrics.record_call_start("tool");
            metrics.record_call_end("tool", CallOutcome::Success, ms);
        }

        let latency = metrics.tool_latency("tool").unwrap();
        assert_eq!(latency.count, 3);
        assert_eq!(latency.avg_ms, 150);
        assert_eq!(latency.min_ms, 100);
        assert_eq!(latency.max_ms, 200);
        assert!(metrics.tool_latency("other").is_none());
    }

    #[test]
    fn test_health_rate() {
        let metrics = ToolMetrics::new();
        assert!((metrics.snapshot().health_rate() - 100.0).abs() < 0.1);

        // 2 successes + 1 expected error are healthy, 1 unexpected is not: 75%
        for outcome in [
            CallOutcome::Success,
            CallOutcome::Success,
            CallOutcome::ExpectedError,
            CallOutcome::UnexpectedError,
        ] {
            metrics.record_call_start("tool");
            metrics.record_call_end("tool", outcome, 1);
        }
        assert!((metrics.snapshot().health_rate() - 75.0).abs() < 0.1);
    }

    #[test]
    fn test_reset() {
        let metrics = ToolMetrics::new();
        metrics.record_call_start("tool");
        metrics.record_call_end("tool", CallOutcome::Success, 1);

        metrics.reset();

        assert_eq!(metrics.snapshot().total_calls, 0);
        assert!(metrics.tool_latency("tool").is_none());
    }
}
