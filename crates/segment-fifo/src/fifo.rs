//! Segmented Ring Buffer Implementation
//!
//! The FIFO is split into a [`Producer`] and a [`Consumer`] handle sharing
//! one arena. Each cursor has exactly one writer thread, so there is no
//! mutex around the arena; the space semaphore and the Release/Acquire
//! cursor publishes provide all cross-thread ordering.
//!
//! Cursors are monotonic logical stream positions; the arena offset of a
//! position is `position % total_size`. Ragged padding (trailing bytes
//! skipped when a write does not fit before the arena boundary) is part of
//! the logical stream, so skipping a pad lands exactly on a lap boundary.

use crate::sync::Semaphore;
use crate::{FifoConfig, FifoError};
use std::cell::UnsafeCell;
use std::ops::Deref;
use std::slice;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Sentinel for "no ragged pad pending"
const NO_PAD: u64 = u64::MAX;

/// State shared between the two halves
struct Shared {
    /// Fixed byte arena; the permit accounting hands out disjoint regions
    arena: Box<[UnsafeCell<u8>]>,
    /// Maximum size of a single write request
    segment_size: usize,
    /// Arena capacity in bytes
    total_size: usize,
    /// Logical position up to which data is committed (producer-published)
    commit_pos: AtomicU64,
    /// Logical position up to which data is consumed (consumer-published)
    read_pos: AtomicU64,
    /// Logical position where a pending ragged pad begins, [`NO_PAD`] if none
    pad_start: AtomicU64,
    /// Set once the producer will never write again
    end: AtomicBool,
    /// Free writable bytes; the producer acquires before a write, the
    /// consumer releases as regions are consumed and pads skipped
    space: Semaphore,
    /// Consumer-side wake-up, signalled once per commit and once at the end
    reader_notify: Arc<Semaphore>,
}

// SAFETY: every arena byte is reachable by at most one thread at a time
// (the permit accounting keeps producer and consumer regions disjoint), and
// each atomic cursor has a single writer thread.
unsafe impl Send for Shared {}
unsafe impl Sync for Shared {}

impl Shared {
    fn base(&self) -> *mut u8 {
        self.arena.as_ptr() as *mut u8
    }

    /// Usable capacity: one segment of slack stays reserved
    fn usable(&self) -> usize {
        self.total_size - self.segment_size
    }
}

/// Create a connected producer/consumer pair over a fresh arena.
///
/// `reader_notify` is owned by the consumer side of the system; the FIFO
/// signals it once per [`Producer::release`] and once more when the
/// producer finishes.
pub fn split(
    config: FifoConfig,
    reader_notify: Arc<Semaphore>,
) -> Result<(Producer, Consumer), FifoError> {
    config.validate()?;

    let arena: Box<[UnsafeCell<u8>]> = (0..config.total_size).map(|_| UnsafeCell::new(0)).collect();
    let shared = Arc::new(Shared {
        arena,
        segment_size: config.segment_size,
        total_size: config.total_size,
        commit_pos: AtomicU64::new(0),
        read_pos: AtomicU64::new(0),
        pad_start: AtomicU64::new(NO_PAD),
        end: AtomicBool::new(false),
        space: Semaphore::new((config.total_size - config.segment_size) as u64),
        reader_notify,
    });

    debug!(
        "segmented fifo created: {} byte arena, {} byte segments",
        config.total_size, config.segment_size
    );

    Ok((
        Producer {
            shared: Arc::clone(&shared),
            write_pos: 0,
            pending: None,
        },
        Consumer {
            shared,
            read_pos: 0,
        },
    ))
}

/// Producing half of the FIFO; owns the write cursor.
///
/// Dropping the producer signals end-of-stream: the consumer can drain all
/// committed data and then observes [`Consumer::is_finished`].
pub struct Producer {
    shared: Arc<Shared>,
    /// Logical write position, including ragged padding
    write_pos: u64,
    /// Length of the reserved-but-uncommitted region, if any
    pending: Option<usize>,
}

impl Producer {
    /// Reserve room for `len` bytes, blocking while the arena lacks space.
    ///
    /// Applies the ragged-end policy: when fewer than `len` contiguous
    /// bytes remain before the arena boundary, the trailing bytes are
    /// skipped as padding and the reservation starts at offset 0. Padding
    /// is charged against free space like payload, so a wrapping write can
    /// cost up to `segment_size - 1` extra bytes.
    ///
    /// The returned slice is valid for exactly `len` bytes; fill it, then
    /// call [`release`](Self::release) to make it visible to the consumer.
    ///
    /// # Panics
    /// Panics if `len` is zero or exceeds the segment size, or if the
    /// previous write has not been released.
    pub fn write(&mut self, len: usize) -> &mut [u8] {
        assert!(
            self.pending.is_none(),
            "write() called with an unreleased write outstanding"
        );
        assert!(
            len > 0 && len <= self.shared.segment_size,
            "write length {len} outside 1..={}",
            self.shared.segment_size
        );

        let offset = (self.write_pos % self.shared.total_size as u64) as usize;
        let contiguous = self.shared.total_size - offset;
        let pad = if contiguous < len { contiguous } else { 0 };

        // Backpressure: blocks until the consumer has freed enough bytes
        // for the payload plus any ragged padding.
        self.shared.space.acquire((pad + len) as u64);

        if pad > 0 {
            debug!("wrapping write cursor: {} ragged bytes at offset {}", pad, offset);
            self.shared.pad_start.store(self.write_pos, Ordering::Release);
            self.write_pos += pad as u64;
        }

        let start = (self.write_pos % self.shared.total_size as u64) as usize;
        self.write_pos += len as u64;
        self.pending = Some(len);

        // SAFETY: the acquired permits guarantee no unread or padded byte
        // lies in [start, start + len), and the consumer cannot observe the
        // region until release() publishes the commit cursor.
        unsafe { slice::from_raw_parts_mut(self.shared.base().add(start), len) }
    }

    /// Commit the outstanding write and wake the consumer.
    ///
    /// # Panics
    /// Panics if there is no outstanding write.
    pub fn release(&mut self) {
        let len = self
            .pending
            .take()
            .expect("release() without an outstanding write");
        trace!("committing {} byte write", len);
        self.shared.commit_pos.store(self.write_pos, Ordering::Release);
        self.shared.reader_notify.release(1);
    }

    /// Bytes reserved or committed but not yet consumed, including any
    /// ragged padding the consumer has not skipped yet
    pub fn num_bytes_filled(&self) -> usize {
        (self.write_pos - self.shared.read_pos.load(Ordering::Acquire)) as usize
    }

    /// Whether nothing is in flight or awaiting the consumer
    pub fn is_empty(&self) -> bool {
        self.num_bytes_filled() == 0
    }

    /// Whether occupancy has reached the usable capacity
    pub fn is_full(&self) -> bool {
        self.will_fill(0)
    }

    /// Whether writing `additional` more bytes would reach full occupancy.
    ///
    /// Advisory: does not include the ragged padding a wrapping write would
    /// add. Lets the caller drop data instead of blocking in
    /// [`write`](Self::write).
    pub fn will_fill(&self, additional: usize) -> bool {
        self.num_bytes_filled() + additional >= self.shared.usable()
    }

    /// Signal end-of-stream. Equivalent to dropping the producer.
    pub fn finish(self) {}
}

impl Drop for Producer {
    fn drop(&mut self) {
        // An unreleased reservation is abandoned, never committed.
        debug!("producer finished, signalling end of stream");
        self.shared.end.store(true, Ordering::Release);
        self.shared.reader_notify.release(1);
    }
}

/// Consuming half of the FIFO; owns the read cursor.
pub struct Consumer {
    shared: Arc<Shared>,
    /// Logical read position, including skipped padding
    read_pos: u64,
}

impl Consumer {
    /// Return the next committed contiguous region, or `None` when nothing
    /// is committed.
    ///
    /// Never blocks; callers wait on the reader-notify semaphore before
    /// polling, then drain in a loop. A ragged pad at the cursor is skipped
    /// transparently (its bytes are never surfaced), so a returned region
    /// never spans the arena boundary. Dropping the guard consumes the
    /// region and returns its bytes to the producer as free space.
    pub fn read(&mut self) -> Option<ReadGuard<'_>> {
        let commit = self.shared.commit_pos.load(Ordering::Acquire);
        if self.read_pos == commit {
            return None;
        }

        // A pad only becomes observable here once the commit cursor has
        // passed it, together with the wrapped write that created it.
        let pad = self.shared.pad_start.load(Ordering::Acquire);
        if pad == self.read_pos {
            let skip = self.shared.total_size as u64 - pad % self.shared.total_size as u64;
            trace!("skipping {} byte ragged tail", skip);
            self.shared.pad_start.store(NO_PAD, Ordering::Release);
            self.read_pos += skip;
            self.shared.read_pos.store(self.read_pos, Ordering::Release);
            self.shared.space.release(skip);
        }

        let offset = (self.read_pos % self.shared.total_size as u64) as usize;
        let mut avail = commit - self.read_pos;
        let pad = self.shared.pad_start.load(Ordering::Acquire);
        if pad != NO_PAD && pad > self.read_pos && pad < commit {
            // Stop short of an upcoming pad; the next call skips it.
            avail = pad - self.read_pos;
        }
        let contiguous = (self.shared.total_size - offset) as u64;
        let len = avail.min(contiguous) as usize;

        Some(ReadGuard {
            consumer: self,
            offset,
            len,
        })
    }

    /// Committed bytes not yet consumed, including any unskipped pad
    pub fn num_bytes_filled(&self) -> usize {
        (self.shared.commit_pos.load(Ordering::Acquire) - self.read_pos) as usize
    }

    /// Whether no committed data is waiting
    pub fn is_empty(&self) -> bool {
        self.num_bytes_filled() == 0
    }

    /// True once the producer has finished and all data has been drained
    pub fn is_finished(&self) -> bool {
        self.shared.end.load(Ordering::Acquire) && self.is_empty()
    }

    /// Base pointer of the arena, for raw inspection and debugging only;
    /// not part of the steady-state read path
    pub fn start(&self) -> *const u8 {
        self.shared.base()
    }
}

/// A committed region handed out by [`Consumer::read`].
///
/// Dereferences to the region's bytes. Dropping the guard consumes the
/// region: the read cursor advances past it and its space goes back to the
/// producer, so the borrow must end before the bytes can be reused.
pub struct ReadGuard<'a> {
    consumer: &'a mut Consumer,
    offset: usize,
    len: usize,
}

impl Deref for ReadGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: the region is committed and unconsumed; the producer
        // cannot acquire these bytes until the permits are released on drop.
        unsafe { slice::from_raw_parts(self.consumer.shared.base().add(self.offset), self.len) }
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.consumer.read_pos += self.len as u64;
        self.consumer
            .shared
            .read_pos
            .store(self.consumer.read_pos, Ordering::Release);
        self.consumer.shared.space.release(self.len as u64);
    }
}
