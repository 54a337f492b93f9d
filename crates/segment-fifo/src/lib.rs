//! Segmented SPSC Byte FIFO
//!
//! Decouples a single high-frequency producer thread from a single slower
//! consumer thread through a fixed-capacity byte arena with blocking
//! backpressure. The producer reserves variable-length regions up to one
//! segment, fills them in place, and commits; the consumer drains committed
//! regions in FIFO order, transparently skipping the ragged tail left when
//! a write wraps past the arena boundary.
//!
//! ```
//! use segment_fifo::{split, FifoConfig, Semaphore};
//! use std::sync::Arc;
//!
//! let notify = Arc::new(Semaphore::new(0));
//! let config = FifoConfig { segment_size: 64, total_size: 256 };
//! let (mut tx, mut rx) = split(config, Arc::clone(&notify)).unwrap();
//!
//! tx.write(5).copy_from_slice(b"hello");
//! tx.release();
//!
//! notify.acquire(1);
//! let region = rx.read().expect("committed data");
//! assert_eq!(&region[..], b"hello");
//! ```

mod error;
mod fifo;
mod sync;

pub use error::FifoError;
pub use fifo::{split, Consumer, Producer, ReadGuard};
pub use sync::Semaphore;

/// Sizing for a segmented FIFO
#[derive(Debug, Clone, Copy)]
pub struct FifoConfig {
    /// Maximum size of a single write request in bytes
    pub segment_size: usize,
    /// Total arena capacity in bytes; one segment stays reserved as slack
    pub total_size: usize,
}

impl Default for FifoConfig {
    fn default() -> Self {
        Self {
            segment_size: 64 * 1024,
            total_size: 1024 * 1024,
        }
    }
}

impl FifoConfig {
    /// A wrapping write needs its payload, up to a segment of ragged
    /// padding, and the reserved slack to coexist in the arena, hence the
    /// three-segment floor.
    pub(crate) fn validate(&self) -> Result<(), FifoError> {
        if self.segment_size == 0 {
            return Err(FifoError::ZeroSegmentSize);
        }
        if self.total_size < 3 * self.segment_size {
            return Err(FifoError::TotalTooSmall {
                total: self.total_size,
                segment: self.segment_size,
            });
        }
        Ok(())
    }
}
