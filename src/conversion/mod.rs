//! Video to GIF conversion.
//!
//! - [`ConversionOrchestrator`] runs one job at a time against the engine.
//! - [`Job`] is the observable job record; [`OutputArtifact`] is what a
//!   successful job produces.

mod job;
mod orchestrator;

pub use job::{percent_from_fraction, Job, OutputArtifact};
pub use orchestrator::{ConversionOrchestrator, JobClaim, StagedNames};
