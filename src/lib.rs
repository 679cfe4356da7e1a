//! gifforge - convert short videos to animated GIFs.
//!
//! The library crate holds the orchestration layer on top of a pluggable
//! transcoding [`gf_av::Engine`]:
//!
//! - [`engine`]: engine lifecycle (load once, share in-flight attempts)
//! - [`handles`]: published resource handles and download leases
//! - [`conversion`]: the single-active-job orchestrator
//! - [`session`]: the UI-facing facade tying them together
//! - [`status`]: the human-readable status projection

pub mod conversion;
pub mod engine;
pub mod handles;
pub mod session;
pub mod status;

pub use conversion::{ConversionOrchestrator, Job, JobClaim, OutputArtifact};
pub use engine::EngineManager;
pub use handles::{HandleLease, HandleRegistry, HandleSlot, ResourceHandle};
pub use session::{parse_frame_rate, Session};
pub use status::Status;
