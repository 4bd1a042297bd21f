//! HTTP byte-range parsing for seekable artifact playback.

use crate::error::{StorageError, StorageResult};

/// A resolved inclusive byte range within an object of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive end offset.
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range. Always at least 1.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Parse a `Range` header value (`bytes=a-b`, `bytes=a-`, `bytes=-n`)
/// against the object size.
///
/// Only single ranges are supported; multipart ranges are rejected. An
/// open-ended or suffix range is clamped to the object bounds.
pub fn parse_range(header: &str, size: u64) -> StorageResult<ByteRange> {
    let spec = header
        .strip_prefix("bytes=")
        .ok_or_else(|| StorageError::invalid_range(header))?;

    if spec.contains(',') {
        return Err(StorageError::invalid_range("multipart ranges unsupported"));
    }
    if size == 0 {
        return Err(StorageError::invalid_range("empty object"));
    }

    let (start_s, end_s) = spec
        .split_once('-')
        .ok_or_else(|| StorageError::invalid_range(header))?;

    let range = match (start_s.is_empty(), end_s.is_empty()) {
        // bytes=-n : last n bytes
        (true, false) => {
            let n: u64 = end_s
                .parse()
                .map_err(|_| StorageError::invalid_range(header))?;
            if n == 0 {
                return Err(StorageError::invalid_range(header));
            }
            ByteRange {
                start: size.saturating_sub(n),
                end: size - 1,
            }
        }
        // bytes=a- : from a to end
        (false, true) => {
            let start: u64 = start_s
                .parse()
                .map_err(|_| StorageError::invalid_range(header))?;
            ByteRange {
                start,
                end: size - 1,
            }
        }
        // bytes=a-b
        (false, false) => {
            let start: u64 = start_s
                .parse()
                .map_err(|_| StorageError::invalid_range(header))?;
            let end: u64 = end_s
                .parse()
                .map_err(|_| StorageError::invalid_range(header))?;
            ByteRange {
                start,
                end: end.min(size - 1),
            }
        }
        (true, true) => return Err(StorageError::invalid_range(header)),
    };

    if range.start > range.end || range.start >= size {
        return Err(StorageError::invalid_range(header));
    }

    Ok(range)
}
