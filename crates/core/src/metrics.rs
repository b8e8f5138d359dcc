//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Task runs (outcomes, durations, active workers)
//! - Stage runs
//! - Whole pipeline jobs

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Task Metrics
// =============================================================================

/// Task runs total by task and outcome.
pub static TASK_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("conductor_task_runs_total", "Total task invocations"),
        &["task", "outcome"], // "success", "exit_failure", "timed_out", ...
    )
    .unwrap()
});

/// Task duration in seconds.
pub static TASK_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("conductor_task_duration_seconds", "Duration of task invocations")
            .buckets(vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["task"],
    )
    .unwrap()
});

/// Tasks currently holding a worker slot.
pub static TASKS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("conductor_tasks_active", "Tasks currently running").unwrap()
});

// =============================================================================
// Stage Metrics
// =============================================================================

/// Stage runs total by stage and result.
pub static STAGE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("conductor_stage_runs_total", "Total stage executions"),
        &["stage", "result"], // "success", "failed"
    )
    .unwrap()
});

/// Stage duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("conductor_stage_duration_seconds", "Duration of stages")
            .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0]),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Pipeline jobs finished total by result.
pub static PIPELINE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("conductor_pipeline_runs_total", "Total pipeline jobs finished"),
        &["result"], // "completed", "failed", "fault"
    )
    .unwrap()
});

/// Pipeline job duration in seconds.
pub static PIPELINE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "conductor_pipeline_duration_seconds",
            "Duration of whole pipeline jobs",
        )
        .buckets(vec![5.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0, 3600.0]),
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Tasks
        Box::new(TASK_RUNS.clone()),
        Box::new(TASK_DURATION.clone()),
        Box::new(TASKS_ACTIVE.clone()),
        // Stages
        Box::new(STAGE_RUNS.clone()),
        Box::new(STAGE_DURATION.clone()),
        // Pipeline
        Box::new(PIPELINE_RUNS.clone()),
        Box::new(PIPELINE_DURATION.clone()),
    ]
}
