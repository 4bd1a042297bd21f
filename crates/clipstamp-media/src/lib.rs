//! FFmpeg CLI wrapper for the Clipstamp render service.
//!
//! This crate provides:
//! - Audio duration probing via ffprobe
//! - Pure filter-graph compilation from a render request
//! - Type-safe engine command building and supervised execution
//! - Progress parsing from `-progress pipe:2`

pub mod command;
pub mod error;
pub mod plan;
pub mod probe;
pub mod progress;

pub use command::{EngineCommand, EngineRunner};
pub use error::{MediaError, MediaResult};
pub use plan::{render_duration, InputSpec, RenderPlan, TextLayers};
pub use probe::probe_duration;
pub use progress::{parse_out_time_us, ProgressTracker, ProgressUpdate};
