//! Gazeline - offline reconciliation of behavioral trial logs and
//! eye-tracker exports
//!
//! Gazeline ingests two independently produced, unsynchronized experiment
//! logs, reconciles them onto a common timeline and derives per-trial
//! statistics through a deterministic pipeline: log decoding → gaze event
//! segmentation → trial/recording correlation → statistics computation →
//! cross-trial reference aggregation, with results persisted in a flat
//! keyed store.
//!
//! ## Modules
//!
//! - **weblog / gazelog**: schema-driven readers for the two log formats
//! - **correlate**: clock-offset correction and trial/recording matching
//! - **stats**: per-trial histograms, timelines and the running-mean
//!   reference
//! - **store**: folder-keyed statistics persistence

pub mod correlate;
pub mod error;
pub mod events;
pub mod folder;
pub mod gazelog;
pub mod pipeline;
pub mod recording;
pub mod schema;
pub mod stats;
pub mod store;
pub mod test;
pub mod weblog;

pub use correlate::DEFAULT_HOUR_OFFSET;
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineConfig};
pub use recording::GazeRecording;
pub use stats::{reference::Reference, Statistics};
pub use store::{StatisticsStore, UpdateReport};
pub use test::Test;
pub use weblog::Trial;

/// Crate version embedded in CLI output
pub const GAZELINE_VERSION: &str = env!("CARGO_PKG_VERSION");
