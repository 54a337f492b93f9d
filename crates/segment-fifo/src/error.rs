//! Fifo Error Types

use thiserror::Error;

/// Errors during FIFO construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FifoError {
    /// Segment size must be non-zero
    #[error("segment size must be non-zero")]
    ZeroSegmentSize,

    /// Arena too small for the reserved slack plus worst-case ragged waste
    #[error("total size {total} too small: need at least 3x segment size ({segment}) for reserved slack and ragged waste")]
    TotalTooSmall { total: usize, segment: usize },
}
