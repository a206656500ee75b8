//! Device builder and the stream-pumping device handle.
//!
//! A [`Device`] owns one FIFO per direction and two hardware-facing pump
//! threads. The read pump fills the inbound FIFO from the device-to-host
//! stream; the write pump drains the outbound FIFO into the host-to-device
//! stream. The application moves bytes through the [`std::io::Read`] and
//! [`std::io::Write`] implementations on the device handle.

use crate::error::DriverError;
use crate::options::{DRIVER_NAME, StreamPaths, StreamRole};
use fpgastream_fifo::{Fifo, FifoReader, FifoWriter};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::thread::{self, JoinHandle};

/// Default per-direction FIFO capacity in bytes.
const DEFAULT_FIFO_CAPACITY: usize = 64 * 1024;

/// Builder for configuring and opening a device.
pub struct DeviceBuilder {
    paths: StreamPaths,
    fifo_capacity: usize,
    write_headroom: usize,
}

impl DeviceBuilder {
    /// Creates a builder with default stream paths and FIFO sizing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            paths: StreamPaths::default(),
            fifo_capacity: DEFAULT_FIFO_CAPACITY,
            write_headroom: 0,
        }
    }

    /// Sets the path for one stream role.
    #[must_use]
    pub fn stream_path(mut self, role: StreamRole, path: impl Into<std::path::PathBuf>) -> Self {
        self.paths.set(role, path);
        self
    }

    /// Replaces all stream paths at once.
    #[must_use]
    pub fn stream_paths(mut self, paths: StreamPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Sets the per-direction FIFO capacity in bytes.
    #[must_use]
    pub fn fifo_capacity(mut self, bytes: usize) -> Self {
        self.fifo_capacity = bytes;
        self
    }

    /// Sets the write-side headroom reserved in each FIFO. Defaults to
    /// zero, which disables the margin.
    #[must_use]
    pub fn write_headroom(mut self, bytes: usize) -> Self {
        self.write_headroom = bytes;
        self
    }

    /// Opens the data streams, creates the FIFOs and starts the pumps.
    ///
    /// Only the read and write data streams are opened here; the config
    /// and signal paths are carried as options for the configuration
    /// layer, which owns those streams.
    ///
    /// # Errors
    /// Returns `DriverError` if a stream cannot be opened, the FIFOs
    /// cannot be allocated, or a pump thread cannot be spawned.
    pub fn open(self) -> Result<Device, DriverError> {
        let read_path = self.paths.get(StreamRole::Read).to_path_buf();
        let read_stream = File::open(&read_path).map_err(|source| DriverError::Stream {
            role: StreamRole::Read,
            path: read_path.clone(),
            source,
        })?;

        let write_path = self.paths.get(StreamRole::Write).to_path_buf();
        let write_stream = OpenOptions::new().write(true).open(&write_path).map_err(
            |source| DriverError::Stream {
                role: StreamRole::Write,
                path: write_path.clone(),
                source,
            },
        )?;

        let (in_writer, in_reader) = Fifo::with_headroom(self.fifo_capacity, self.write_headroom)?;
        let (out_writer, out_reader) = Fifo::with_headroom(self.fifo_capacity, self.write_headroom)?;

        tracing::info!(
            "opened {DRIVER_NAME} device (read {read_path:?}, write {write_path:?}, \
             {} byte FIFOs)",
            self.fifo_capacity
        );

        let read_pump = thread::Builder::new()
            .name(format!("{DRIVER_NAME}-read-pump"))
            .spawn(move || pump_stream_to_fifo(read_stream, in_writer))
            .map_err(DriverError::Spawn)?;

        let write_pump = thread::Builder::new()
            .name(format!("{DRIVER_NAME}-write-pump"))
            .spawn(move || pump_fifo_to_stream(write_stream, out_reader))
            .map_err(DriverError::Spawn)?;

        Ok(Device {
            inbound: in_reader,
            outbound: out_writer,
            read_pump: Some(read_pump),
            write_pump: Some(write_pump),
        })
    }
}

impl Default for DeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An open streaming device.
///
/// Reading drains the inbound FIFO (device-to-host); writing fills the
/// outbound FIFO (host-to-device). Both directions apply blocking
/// backpressure through their FIFO. Call [`shutdown`](Device::shutdown)
/// (or drop the device) to stop the pumps in the required order:
/// signal both FIFOs, then join both threads, then release everything.
pub struct Device {
    inbound: FifoReader,
    outbound: FifoWriter,
    read_pump: Option<JoinHandle<()>>,
    write_pump: Option<JoinHandle<()>>,
}

impl Device {
    /// Shuts both directions down and joins the pump threads. Idempotent.
    ///
    /// A pump blocked on its FIFO wakes immediately. A pump blocked in a
    /// stream syscall returns once that call does; on a real character
    /// device the kernel ends the read when the stream closes.
    pub fn shutdown(&mut self) {
        self.inbound.shutdown();
        self.outbound.shutdown();

        if let Some(pump) = self.read_pump.take() {
            if pump.join().is_err() {
                tracing::warn!("read pump panicked");
            }
        }
        if let Some(pump) = self.write_pump.take() {
            if pump.join().is_err() {
                tracing::warn!("write pump panicked");
            }
        }

        tracing::info!("{DRIVER_NAME} device shut down");
    }

    /// Returns true once either direction has been shut down.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.read_pump.is_none() && self.write_pump.is_none()
    }

    /// Bytes currently buffered in the inbound (device-to-host) FIFO.
    #[must_use]
    pub fn inbound_occupancy(&self) -> usize {
        self.inbound.occupancy()
    }

    /// Bytes currently buffered in the outbound (host-to-device) FIFO.
    #[must_use]
    pub fn outbound_occupancy(&self) -> usize {
        self.outbound.occupancy()
    }
}

impl Read for Device {
    /// Drains buffered device data. Blocks while the inbound FIFO is
    /// empty; returns `Ok(0)` at end-of-stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let lease = self.inbound.request();
        if lease.is_empty() {
            return Ok(0);
        }
        let n = lease.len().min(buf.len());
        buf[..n].copy_from_slice(&lease.as_slice()[..n]);
        lease.commit(n);
        Ok(n)
    }
}

impl Write for Device {
    /// Buffers data for the device. Blocks while the outbound FIFO is
    /// full; fails with `BrokenPipe` once the direction is shut down.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut lease = self.outbound.request();
        if lease.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "outbound stream shut down",
            ));
        }
        let n = lease.len().min(buf.len());
        lease.as_mut_slice()[..n].copy_from_slice(&buf[..n]);
        lease.commit(n);
        Ok(n)
    }

    /// Waits until the write pump has drained everything buffered so far.
    fn flush(&mut self) -> io::Result<()> {
        if self.outbound.wait_drained() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "write pump stopped with data buffered",
            ))
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Read-pump body: device-to-host stream into the inbound FIFO.
fn pump_stream_to_fifo(mut stream: File, mut fifo: FifoWriter) {
    loop {
        let mut lease = fifo.request();
        if lease.is_empty() {
            tracing::debug!("read pump stopping: FIFO shut down");
            break;
        }
        match stream.read(lease.as_mut_slice()) {
            Ok(0) => {
                tracing::debug!("read pump stopping: stream ended");
                break;
            }
            Ok(n) => lease.commit(n),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => lease.commit(0),
            Err(err) => {
                tracing::warn!("read pump stopping: stream error: {err}");
                break;
            }
        }
    }
    // dropping the writer marks end-of-stream for the application
}

/// Write-pump body: outbound FIFO into the host-to-device stream.
///
/// Keeps draining data buffered before shutdown; the FIFO only hands out
/// a zero-length lease once it is empty.
fn pump_fifo_to_stream(mut stream: File, mut fifo: FifoReader) {
    loop {
        let lease = fifo.request();
        if lease.is_empty() {
            tracing::debug!("write pump stopping: FIFO drained and shut down");
            break;
        }
        match stream.write_all(lease.as_slice()) {
            Ok(()) => {
                let n = lease.len();
                lease.commit(n);
            }
            Err(err) => {
                tracing::warn!("write pump stopping: stream error: {err}");
                break;
            }
        }
    }
    let _ = stream.flush();
    // dropping the reader unblocks an application writer stuck on a full FIFO
}
