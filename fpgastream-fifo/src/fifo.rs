//! Blocking SPSC byte FIFO with zero-copy windowed access.
//!
//! The FIFO bridges exactly two threads: a producer (typically the
//! hardware-facing I/O thread) and a consumer (the application thread).
//! Each side follows a request/commit protocol: request a contiguous
//! window into the buffer, move bytes directly through it, then commit
//! the number of bytes actually transferred. Requests block while the
//! needed resource (free space or buffered data) is unavailable, and
//! return a zero-length lease once [`shutdown`](FifoWriter::shutdown)
//! has been observed with nothing left to grant.
//!
//! A window never spans the physical end of the buffer; transfers larger
//! than `capacity - cursor` take two request/commit rounds, the second
//! starting at offset zero.

use crate::error::{FifoError, Result};
use crate::signal::WakeSignal;
use memmap2::{MmapMut, MmapOptions};
use std::slice;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Stride used to pre-fault buffer pages when pinning fails.
const PAGE_STRIDE: usize = 4096;

/// Creates a FIFO pair with the given capacity and no write-side headroom.
///
/// Convenience for [`Fifo::new`].
///
/// # Errors
/// Returns `FifoError` if the capacity is zero or the buffer cannot be
/// allocated.
pub fn pair(capacity: usize) -> Result<(FifoWriter, FifoReader)> {
    Fifo::new(capacity)
}

/// FIFO pair factory.
pub struct Fifo;

impl Fifo {
    /// Creates a FIFO pair with the given capacity in bytes.
    ///
    /// The buffer is allocated once, pinned in physical RAM on a best
    /// effort basis, and never resized. Pin failure is not an error: a
    /// warning is logged and every page is pre-faulted instead.
    ///
    /// # Errors
    /// Returns `FifoError::InvalidCapacity` if `capacity` is zero, or
    /// `FifoError::Allocation` if the byte region cannot be obtained.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(capacity: usize) -> Result<(FifoWriter, FifoReader)> {
        Self::with_headroom(capacity, 0)
    }

    /// Creates a FIFO pair that reserves `headroom` bytes of free space.
    ///
    /// The writer blocks once fewer than `headroom` free bytes would
    /// remain, so at most `capacity - headroom` bytes are ever buffered.
    /// A headroom of zero (the default elsewhere) disables the margin.
    ///
    /// # Errors
    /// Returns `FifoError::InvalidCapacity` if `capacity` is zero,
    /// `FifoError::InvalidHeadroom` if `headroom >= capacity`, or
    /// `FifoError::Allocation` if the byte region cannot be obtained.
    pub fn with_headroom(capacity: usize, headroom: usize) -> Result<(FifoWriter, FifoReader)> {
        if capacity == 0 {
            return Err(FifoError::InvalidCapacity { capacity });
        }
        if headroom >= capacity {
            return Err(FifoError::InvalidHeadroom { headroom, capacity });
        }

        let mut map = MmapOptions::new().len(capacity).map_anon()?;
        pin_or_prefault(&mut map);
        let base = map.as_mut_ptr();

        let raw = Arc::new(RawFifo {
            _map: map,
            base,
            capacity,
            headroom,
            occupancy: AtomicUsize::new(0),
            read_total: AtomicU64::new(0),
            write_total: AtomicU64::new(0),
            done: AtomicBool::new(false),
            space_signal: WakeSignal::new(),
            data_signal: WakeSignal::new(),
        });

        Ok((
            FifoWriter {
                raw: Arc::clone(&raw),
                cursor: 0,
            },
            FifoReader { raw, cursor: 0 },
        ))
    }
}

/// Pins the buffer in RAM, falling back to touching every page.
fn pin_or_prefault(map: &mut MmapMut) {
    #[cfg(unix)]
    match map.lock() {
        Ok(()) => return,
        Err(err) => {
            tracing::warn!(
                "failed to lock FIFO memory, pages may swap to disk \
                 (consider raising `ulimit -l`): {err}"
            );
        }
    }
    #[cfg(not(unix))]
    tracing::warn!("memory locking is not supported here, FIFO pages may swap to disk");
    prefault(map);
}

/// Writes one byte per page so the pages are resident even unpinned.
fn prefault(map: &mut MmapMut) {
    let mut offset = 0;
    while offset < map.len() {
        map[offset] = 0;
        offset += PAGE_STRIDE;
    }
}

/// State shared by both sides of one FIFO.
///
/// The per-side cursors deliberately do not live here: each is owned by
/// its handle, so the opposite thread cannot even name it. Cross-thread
/// state is limited to the occupancy counter, the totals, the done flag
/// and the two wake signals.
struct RawFifo {
    /// Keeps the mapping (and its pin) alive; accessed only through `base`.
    _map: MmapMut,
    base: *mut u8,
    capacity: usize,
    headroom: usize,
    /// Valid unread bytes currently buffered.
    occupancy: AtomicUsize,
    /// Cumulative bytes drained by the reader.
    read_total: AtomicU64,
    /// Cumulative bytes committed by the writer.
    write_total: AtomicU64,
    done: AtomicBool,
    /// Wakes a writer blocked on free space.
    space_signal: WakeSignal,
    /// Wakes a reader blocked on buffered data.
    data_signal: WakeSignal,
}

// SAFETY: the raw base pointer aliases the owned mapping. The writer only
// touches the window granted by its lease (inside the free region) and the
// reader only the window granted by its lease (inside the occupied region);
// the occupancy protocol keeps those regions disjoint, and each side exists
// exactly once because the handles are not cloneable.
unsafe impl Send for RawFifo {}
unsafe impl Sync for RawFifo {}

impl RawFifo {
    fn shutdown(&self) {
        self.done.store(true, Ordering::Release);
        self.space_signal.raise();
        self.data_signal.raise();
    }

    fn stats(&self) -> FifoStats {
        FifoStats {
            capacity: self.capacity,
            occupancy: self.occupancy.load(Ordering::Acquire),
            read_total: self.read_total.load(Ordering::Relaxed),
            write_total: self.write_total.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time diagnostic counters for one FIFO.
///
/// `write_total - read_total` equals the occupancy whenever both sides
/// are quiescent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FifoStats {
    /// Fixed buffer capacity in bytes.
    pub capacity: usize,
    /// Valid unread bytes currently buffered.
    pub occupancy: usize,
    /// Cumulative bytes drained by the reader.
    pub read_total: u64,
    /// Cumulative bytes committed by the writer.
    pub write_total: u64,
}

/// Producer handle of a FIFO pair.
///
/// Exactly one exists per FIFO; it is `Send` but not `Clone`, so no
/// second thread can ever act as producer. Dropping it shuts the FIFO
/// down, signalling end-of-stream to the reader once drained.
pub struct FifoWriter {
    raw: Arc<RawFifo>,
    /// Next write offset in `[0, capacity)`. Only this thread mutates it.
    cursor: usize,
}

impl FifoWriter {
    /// Requests the next writable contiguous window.
    ///
    /// Blocks while the buffer is full (less headroom). After shutdown
    /// has been observed, returns a zero-length lease without blocking;
    /// the caller must treat that as end-of-stream and stop writing.
    ///
    /// The granted window is clamped at the physical end of the buffer:
    /// writing more than `capacity - cursor` bytes takes a second
    /// request after this lease's commit.
    pub fn request(&mut self) -> WriteLease<'_> {
        let mut slept = false;
        let writable = self.raw.capacity - self.raw.headroom;
        let mut occupancy = self.raw.occupancy.load(Ordering::Acquire);

        loop {
            // An abandoned FIFO is never worth filling, even if space is
            // available, so the done check wins over the space check.
            if self.raw.done.load(Ordering::Acquire) {
                let offset = self.cursor;
                return WriteLease {
                    writer: self,
                    offset,
                    len: 0,
                    slept,
                };
            }

            if occupancy < writable {
                break;
            }

            // The reader updates occupancy before raising the signal, so
            // we cannot oversleep. We can wake to find the space already
            // reported gone stale, hence the re-check loop.
            slept = true;
            self.raw.space_signal.wait();
            occupancy = self.raw.occupancy.load(Ordering::Acquire);
        }

        let len = (writable - occupancy).min(self.raw.capacity - self.cursor);
        let offset = self.cursor;
        WriteLease {
            writer: self,
            offset,
            len,
            slept,
        }
    }

    /// Signals shutdown: wakes both sides and makes every future request
    /// return a zero-length lease. Idempotent.
    pub fn shutdown(&self) {
        self.raw.shutdown();
    }

    /// Returns true once shutdown has been signalled by either side.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.raw.done.load(Ordering::Acquire)
    }

    /// Returns the fixed buffer capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity
    }

    /// Returns the number of valid unread bytes currently buffered.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.raw.occupancy.load(Ordering::Acquire)
    }

    /// Returns the current diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> FifoStats {
        self.raw.stats()
    }

    /// Blocks until every committed byte has been drained by the reader.
    ///
    /// Returns true once occupancy reaches zero, or false if shutdown is
    /// observed first with data still buffered. Rides the same wake
    /// signal as [`request`](FifoWriter::request); that is safe because
    /// the producer thread cannot be blocked in both at once, and every
    /// read commit raises the signal after publishing its occupancy
    /// update.
    pub fn wait_drained(&mut self) -> bool {
        loop {
            if self.raw.occupancy.load(Ordering::Acquire) == 0 {
                return true;
            }
            if self.raw.done.load(Ordering::Acquire) {
                return false;
            }
            self.raw.space_signal.wait();
        }
    }
}

impl Drop for FifoWriter {
    fn drop(&mut self) {
        self.raw.shutdown();
    }
}

/// Consumer handle of a FIFO pair.
///
/// Exactly one exists per FIFO; it is `Send` but not `Clone`, so no
/// second thread can ever act as consumer. Dropping it shuts the FIFO
/// down, unblocking a writer stuck on a full buffer.
pub struct FifoReader {
    raw: Arc<RawFifo>,
    /// Next read offset in `[0, capacity)`. Only this thread mutates it.
    cursor: usize,
}

impl FifoReader {
    /// Requests the next readable contiguous window.
    ///
    /// Blocks while the buffer is empty. Once shutdown has been observed
    /// *and* the buffer is drained, returns a zero-length lease marking
    /// end-of-stream; buffered data written before shutdown is still
    /// delivered first.
    pub fn request(&mut self) -> ReadLease<'_> {
        let mut slept = false;
        let mut occupancy = self.raw.occupancy.load(Ordering::Acquire);

        while occupancy == 0 {
            if self.raw.done.load(Ordering::Acquire) {
                let offset = self.cursor;
                return ReadLease {
                    reader: self,
                    offset,
                    len: 0,
                    slept,
                };
            }

            // The writer updates occupancy before raising the signal, so
            // we cannot oversleep; a wake may still find the data already
            // gone if it raced an earlier request, hence the loop.
            slept = true;
            self.raw.data_signal.wait();
            occupancy = self.raw.occupancy.load(Ordering::Acquire);
        }

        let len = occupancy.min(self.raw.capacity - self.cursor);
        let offset = self.cursor;
        ReadLease {
            reader: self,
            offset,
            len,
            slept,
        }
    }

    /// Signals shutdown: wakes both sides and makes every future request
    /// return a zero-length lease. Idempotent.
    pub fn shutdown(&self) {
        self.raw.shutdown();
    }

    /// Returns true once shutdown has been signalled by either side.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.raw.done.load(Ordering::Acquire)
    }

    /// Returns the fixed buffer capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity
    }

    /// Returns the number of valid unread bytes currently buffered.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.raw.occupancy.load(Ordering::Acquire)
    }

    /// Returns the current diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> FifoStats {
        self.raw.stats()
    }
}

impl Drop for FifoReader {
    fn drop(&mut self) {
        self.raw.shutdown();
    }
}

/// A writable contiguous window into the FIFO buffer.
///
/// Valid until [`commit`](WriteLease::commit); it mutably borrows the
/// writer, so a second request cannot be issued while it is outstanding.
/// A zero-length lease means end-of-stream.
pub struct WriteLease<'a> {
    writer: &'a mut FifoWriter,
    offset: usize,
    len: usize,
    slept: bool,
}

impl WriteLease<'_> {
    /// Number of bytes that may be written through this lease.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true for a zero-length (end-of-stream) lease.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset of the window within the buffer.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns true if the request blocked before this lease was granted.
    #[must_use]
    pub fn slept(&self) -> bool {
        self.slept
    }

    /// The writable window itself.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: offset + len <= capacity by construction, and the window
        // lies in the free region, which the reader does not touch.
        unsafe { slice::from_raw_parts_mut(self.writer.raw.base.add(self.offset), self.len) }
    }

    /// Commits `n` bytes as written and wakes the reader if it may be
    /// blocked. A commit of zero is a no-op (the lease is simply
    /// relinquished).
    ///
    /// `n` must not exceed [`len`](WriteLease::len); violating that is a
    /// caller contract breach, checked only in debug builds.
    pub fn commit(self, n: usize) {
        debug_assert!(n <= self.len, "commit of {n} bytes exceeds lease of {}", self.len);
        if n == 0 {
            return;
        }

        let raw = &self.writer.raw;
        raw.occupancy.fetch_add(n, Ordering::AcqRel);
        raw.write_total.fetch_add(n as u64, Ordering::Relaxed);

        self.writer.cursor += n;
        if self.writer.cursor >= raw.capacity {
            self.writer.cursor -= raw.capacity;
        }

        // Unconditional check-then-maybe-raise: occupancy is already
        // published, so a reader that re-checks after this wake always
        // sees the data. Skipping an already-raised signal is safe for
        // the same reason.
        raw.data_signal.raise();
    }
}

/// A readable contiguous window into the FIFO buffer.
///
/// Valid until [`commit`](ReadLease::commit); it mutably borrows the
/// reader, so a second request cannot be issued while it is outstanding.
/// A zero-length lease means end-of-stream.
pub struct ReadLease<'a> {
    reader: &'a mut FifoReader,
    offset: usize,
    len: usize,
    slept: bool,
}

impl ReadLease<'_> {
    /// Number of bytes readable through this lease.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true for a zero-length (end-of-stream) lease.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset of the window within the buffer.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns true if the request blocked before this lease was granted.
    #[must_use]
    pub fn slept(&self) -> bool {
        self.slept
    }

    /// The readable window itself.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: offset + len <= capacity by construction, and the window
        // lies in the occupied region, which the writer does not touch.
        unsafe { slice::from_raw_parts(self.reader.raw.base.add(self.offset), self.len) }
    }

    /// Commits `n` bytes as consumed, freeing their space and waking the
    /// writer if it may be blocked. A commit of zero is a no-op.
    ///
    /// `n` must not exceed [`len`](ReadLease::len); violating that is a
    /// caller contract breach, checked only in debug builds.
    pub fn commit(self, n: usize) {
        debug_assert!(n <= self.len, "commit of {n} bytes exceeds lease of {}", self.len);
        if n == 0 {
            return;
        }

        let raw = &self.reader.raw;
        raw.occupancy.fetch_sub(n, Ordering::AcqRel);
        raw.read_total.fetch_add(n as u64, Ordering::Relaxed);

        self.reader.cursor += n;
        if self.reader.cursor >= raw.capacity {
            self.reader.cursor -= raw.capacity;
        }

        raw.space_signal.raise();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    /// Deterministic byte pattern for integrity checks.
    fn pattern(index: u64) -> u8 {
        (index as u8).wrapping_mul(31).wrapping_add(7)
    }

    #[test]
    fn test_invalid_capacity() {
        assert!(matches!(
            Fifo::new(0),
            Err(FifoError::InvalidCapacity { capacity: 0 })
        ));
    }

    #[test]
    fn test_invalid_headroom() {
        assert!(matches!(
            Fifo::with_headroom(8, 8),
            Err(FifoError::InvalidHeadroom { .. })
        ));
        assert!(matches!(
            Fifo::with_headroom(8, 9),
            Err(FifoError::InvalidHeadroom { .. })
        ));
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let (mut writer, mut reader) = Fifo::new(64).unwrap();

        let mut lease = writer.request();
        assert_eq!(lease.len(), 64);
        assert_eq!(lease.offset(), 0);
        assert!(!lease.slept());
        lease.as_mut_slice()[..5].copy_from_slice(b"hello");
        lease.commit(5);

        assert_eq!(writer.occupancy(), 5);

        let lease = reader.request();
        assert_eq!(lease.len(), 5);
        assert_eq!(lease.as_slice(), b"hello");
        lease.commit(5);

        assert_eq!(reader.occupancy(), 0);
    }

    #[test]
    fn test_stats_invariant() {
        let (mut writer, mut reader) = Fifo::new(32).unwrap();

        let mut lease = writer.request();
        lease.as_mut_slice()[..20].fill(0xAB);
        lease.commit(20);
        reader.request().commit(7);

        let stats = writer.stats();
        assert_eq!(stats.capacity, 32);
        assert_eq!(stats.write_total, 20);
        assert_eq!(stats.read_total, 7);
        assert_eq!(stats.occupancy, 13);
        assert_eq!(
            stats.write_total - stats.read_total,
            stats.occupancy as u64
        );
        assert_eq!(reader.stats(), stats);
    }

    #[test]
    fn test_lease_never_spans_physical_end() {
        let (mut writer, mut reader) = Fifo::new(16).unwrap();

        for _ in 0..50 {
            let mut lease = writer.request();
            assert!(lease.offset() + lease.len() <= 16);
            let n = lease.len().min(5);
            lease.as_mut_slice()[..n].fill(0);
            lease.commit(n);

            let lease = reader.request();
            assert!(lease.offset() + lease.len() <= 16);
            let n = lease.len().min(3);
            lease.commit(n);
        }
    }

    #[test]
    fn test_headroom_clamps_grant() {
        let (mut writer, _reader) = Fifo::with_headroom(8, 2).unwrap();
        let lease = writer.request();
        assert_eq!(lease.len(), 6);
    }

    #[test]
    fn test_wraparound_two_step_protocol() {
        let (mut writer, mut reader) = Fifo::new(16).unwrap();

        // Park both cursors at offset 12.
        let mut lease = writer.request();
        assert_eq!(lease.len(), 16);
        lease.as_mut_slice()[..12].fill(0);
        lease.commit(12);
        let lease = reader.request();
        assert_eq!(lease.len(), 12);
        lease.commit(12);

        let data: Vec<u8> = (0u8..16).collect();

        let mut lease = writer.request();
        assert_eq!(lease.offset(), 12);
        assert_eq!(lease.len(), 4);
        lease.as_mut_slice().copy_from_slice(&data[..4]);
        lease.commit(4);

        let mut lease = writer.request();
        assert_eq!(lease.offset(), 0);
        assert_eq!(lease.len(), 12);
        lease.as_mut_slice().copy_from_slice(&data[4..]);
        lease.commit(12);

        let lease = reader.request();
        assert_eq!(lease.offset(), 12);
        assert_eq!(lease.len(), 4);
        let mut got = lease.as_slice().to_vec();
        lease.commit(4);

        let lease = reader.request();
        assert_eq!(lease.offset(), 0);
        assert_eq!(lease.len(), 12);
        got.extend_from_slice(lease.as_slice());
        lease.commit(12);

        assert_eq!(got, data);
    }

    #[test]
    fn test_end_to_end_partial_reads_and_wrap() {
        let (mut writer, mut reader) = Fifo::new(8).unwrap();

        // Write "ABCDE".
        let mut lease = writer.request();
        assert_eq!(lease.len(), 8);
        lease.as_mut_slice()[..5].copy_from_slice(b"ABCDE");
        lease.commit(5);
        assert_eq!(writer.occupancy(), 5);

        // Read back only "ABC".
        let lease = reader.request();
        assert_eq!(lease.len(), 5);
        assert_eq!(&lease.as_slice()[..3], b"ABC");
        lease.commit(3);
        assert_eq!(reader.occupancy(), 2);

        // "FGHIJK" needs two leases: the first is clamped at the
        // physical end (offset 5), not at the free-space count (6).
        let mut lease = writer.request();
        assert_eq!(lease.offset(), 5);
        assert_eq!(lease.len(), 3);
        lease.as_mut_slice().copy_from_slice(b"FGH");
        lease.commit(3);

        let mut lease = writer.request();
        assert_eq!(lease.offset(), 0);
        assert_eq!(lease.len(), 3);
        lease.as_mut_slice().copy_from_slice(b"IJK");
        lease.commit(3);
        assert_eq!(writer.occupancy(), 8);

        // Buffer is full: the next request must block until a read
        // commit frees space.
        let (tx, rx) = mpsc::channel();
        let blocked = thread::spawn(move || {
            let lease = writer.request();
            tx.send((lease.len(), lease.slept())).unwrap();
            lease.commit(0);
        });

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        let lease = reader.request();
        assert_eq!(lease.as_slice(), b"DEFGH");
        lease.commit(5);

        let (granted, slept) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(granted > 0);
        assert!(slept);
        blocked.join().unwrap();

        let lease = reader.request();
        assert_eq!(lease.as_slice(), b"IJK");
        lease.commit(3);
    }

    #[test]
    fn test_backpressure_blocks_full_writer() {
        let (mut writer, mut reader) = Fifo::new(4).unwrap();

        let mut lease = writer.request();
        lease.as_mut_slice().copy_from_slice(b"abcd");
        lease.commit(4);

        let (tx, rx) = mpsc::channel();
        let blocked = thread::spawn(move || {
            let lease = writer.request();
            tx.send(lease.len()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        let lease = reader.request();
        lease.commit(1);

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        blocked.join().unwrap();
    }

    #[test]
    fn test_shutdown_wakes_blocked_reader() {
        let (writer, mut reader) = Fifo::new(8).unwrap();

        let (tx, rx) = mpsc::channel();
        let blocked = thread::spawn(move || {
            let lease = reader.request();
            tx.send((lease.len(), lease.slept())).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        writer.shutdown();

        let (len, slept) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(len, 0);
        assert!(slept);
        blocked.join().unwrap();
    }

    #[test]
    fn test_shutdown_wakes_blocked_writer() {
        let (mut writer, reader) = Fifo::new(4).unwrap();

        let mut lease = writer.request();
        lease.as_mut_slice().fill(0);
        lease.commit(4);

        let (tx, rx) = mpsc::channel();
        let blocked = thread::spawn(move || {
            let lease = writer.request();
            tx.send(lease.len()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        reader.shutdown();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 0);
        blocked.join().unwrap();
    }

    #[test]
    fn test_shutdown_is_idempotent_and_nonblocking_after() {
        let (mut writer, mut reader) = Fifo::new(8).unwrap();
        writer.shutdown();
        writer.shutdown();
        reader.shutdown();

        assert!(writer.is_done());
        assert!(writer.request().is_empty());
        assert!(reader.request().is_empty());
    }

    #[test]
    fn test_reader_drains_buffered_data_after_shutdown() {
        let (mut writer, mut reader) = Fifo::new(8).unwrap();

        let mut lease = writer.request();
        lease.as_mut_slice()[..3].copy_from_slice(b"xyz");
        lease.commit(3);
        drop(writer); // drop signals shutdown

        assert!(reader.is_done());
        let lease = reader.request();
        assert_eq!(lease.as_slice(), b"xyz");
        lease.commit(3);

        assert!(reader.request().is_empty());
    }

    #[test]
    fn test_writer_rejected_after_reader_drop() {
        let (mut writer, reader) = Fifo::new(8).unwrap();
        drop(reader);
        assert!(writer.request().is_empty());
    }

    #[test]
    fn test_wait_drained_blocks_until_reader_catches_up() {
        let (mut writer, mut reader) = Fifo::new(16).unwrap();

        let mut lease = writer.request();
        lease.as_mut_slice()[..10].fill(0x5A);
        lease.commit(10);

        let (tx, rx) = mpsc::channel();
        let waiter = thread::spawn(move || {
            tx.send(writer.wait_drained()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        // A partial drain must not release the waiter.
        reader.request().commit(4);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        reader.request().commit(6);
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        waiter.join().unwrap();
    }

    #[test]
    fn test_wait_drained_reports_shutdown_with_data_buffered() {
        let (mut writer, reader) = Fifo::new(8).unwrap();

        let mut lease = writer.request();
        lease.as_mut_slice()[..3].fill(1);
        lease.commit(3);

        reader.shutdown();
        assert!(!writer.wait_drained());

        // An empty buffer counts as drained even after shutdown.
        let (mut writer, reader) = Fifo::new(8).unwrap();
        reader.shutdown();
        assert!(writer.wait_drained());
    }

    #[test]
    fn test_randomized_interleaving_preserves_stream() {
        const TOTAL: u64 = 1 << 20;
        let (mut writer, mut reader) = Fifo::new(192).unwrap();

        let producer = thread::spawn(move || {
            let mut produced = 0u64;
            let mut rng = 0x9E37_79B9_7F4A_7C15u64;
            while produced < TOTAL {
                let mut lease = writer.request();
                assert!(lease.offset() + lease.len() <= 192);
                if lease.is_empty() {
                    break;
                }
                rng ^= rng << 13;
                rng ^= rng >> 7;
                rng ^= rng << 17;
                let take = ((rng as usize % lease.len()) + 1).min((TOTAL - produced) as usize);
                let window = lease.as_mut_slice();
                for (i, byte) in window[..take].iter_mut().enumerate() {
                    *byte = pattern(produced + i as u64);
                }
                lease.commit(take);
                produced += take as u64;
            }
            produced
            // writer drops here, signalling end-of-stream
        });

        let mut consumed = 0u64;
        let mut rng = 0xD1B5_4A32_D192_ED03u64;
        loop {
            let lease = reader.request();
            assert!(lease.offset() + lease.len() <= 192);
            if lease.is_empty() {
                break;
            }
            rng ^= rng << 13;
            rng ^= rng >> 7;
            rng ^= rng << 17;
            // Commit partial windows to force commit-then-check races.
            let take = (rng as usize % lease.len()) + 1;
            for (i, byte) in lease.as_slice()[..take].iter().enumerate() {
                assert_eq!(*byte, pattern(consumed + i as u64));
            }
            lease.commit(take);
            consumed += take as u64;
        }

        assert_eq!(producer.join().unwrap(), TOTAL);
        assert_eq!(consumed, TOTAL);

        let stats = reader.stats();
        assert_eq!(stats.write_total, TOTAL);
        assert_eq!(stats.read_total, TOTAL);
        assert_eq!(stats.occupancy, 0);
    }
}
