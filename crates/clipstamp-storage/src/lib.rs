//! Local filesystem store for the Clipstamp render service.
//!
//! This crate provides:
//! - Chunked upload assembly (append-only, index-0 reset)
//! - Byte-size stat and ranged reads for seekable artifact playback
//! - Deletion of transient per-job inputs

pub mod error;
pub mod range;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use range::{parse_range, ByteRange};
pub use store::LocalStore;
