//! Shared data models for the Clipstamp render service.
//!
//! This crate provides Serde-serializable types for:
//! - Render requests (trim window, fades, text layers, overlay geometry)
//! - Job state and polling snapshots

pub mod job;
pub mod render;

// Re-export common types
pub use job::{Job, JobSnapshot, JobStatus};
pub use render::{
    BackgroundJustify, RenderMode, RenderRequest, RequestError, TitleSpec, WatermarkSpec,
    DEFAULT_WATERMARK_TEXT,
};
