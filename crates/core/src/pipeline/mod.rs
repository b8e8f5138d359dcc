//! Pipeline module: stage sequencing and background job execution.
//!
//! The [`PipelineController`] runs the configured stages in order for one
//! job, stopping at the first failed stage and pausing for the settle
//! interval between stages. The [`PipelineTrigger`] creates jobs and starts
//! the controller on a spawned task so callers never wait for completion.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use conductor_core::{JobRegistry, PipelineController, PipelineTrigger, ProcessRunner};
//!
//! let controller = PipelineController::from_config(
//!     &config.pipeline,
//!     Arc::new(ProcessRunner::new()),
//!     JobRegistry::new(),
//! );
//! let trigger = PipelineTrigger::new(Arc::new(controller));
//!
//! let job = trigger.trigger("AAPL").await?;
//! // later
//! let snapshot = trigger.status(&job.id).await;
//! ```

mod controller;
mod error;
mod trigger;

pub use controller::PipelineController;
pub use error::{PipelineError, TriggerError};
pub use trigger::PipelineTrigger;
