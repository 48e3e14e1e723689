//! Sync channel between the debugger and its controller.
//!
//! The collection only needs [`SyncChannel`]: write one record, read the next one if it is
//! ready. [`StreamChannel`] implements it over any byte stream pair (pipes, sockets) using
//! the frame layout documented on [`BreakpointRecord`].

use std::{
    io::{self, ErrorKind, Read, Write},
    sync::{Arc, Mutex},
};

#[cfg(unix)]
use std::{os::unix::io::AsRawFd, time::Duration};

use log::{debug, warn};

#[cfg(unix)]
use timeout_readwrite::TimeoutReader;

use crate::{
    breakpoint::record::{BreakpointRecord, MAX_FRAME_SIZE},
    Error, Result,
};

/// Message-level transport for breakpoint records.
///
/// A single read or write is atomic at the record level. Implementations serialize
/// concurrent calls themselves.
pub trait SyncChannel: Send + Sync {
    /// Send one record to the controller.
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] if the transport fails.
    fn write_breakpoint(&self, record: &BreakpointRecord) -> Result<()>;

    /// Receive the next record; `Ok(None)` if nothing is ready within a short bounded wait.
    ///
    /// # Errors
    /// - [`crate::Error::Malformed`] if the next record could not be decoded. The record is
    ///   consumed, so the following call continues with the next one.
    /// - [`crate::Error::Io`] if the transport fails or the stream can no longer be split
    ///   into records.
    fn read_breakpoint(&self) -> Result<Option<BreakpointRecord>>;
}

impl<T: SyncChannel + ?Sized> SyncChannel for Arc<T> {
    fn write_breakpoint(&self, record: &BreakpointRecord) -> Result<()> {
        (**self).write_breakpoint(record)
    }

    fn read_breakpoint(&self) -> Result<Option<BreakpointRecord>> {
        (**self).read_breakpoint()
    }
}

const READ_CHUNK: usize = 4096;

struct FrameReader<R> {
    inner: R,
    buffer: Vec<u8>,
    /// Set once a bogus length prefix was seen; frame boundaries are lost for good
    desynchronized: bool,
}

fn desynchronized_error() -> Error {
    Error::Io(io::Error::new(
        ErrorKind::InvalidData,
        "sync stream lost frame synchronization",
    ))
}

impl<R: Read> FrameReader<R> {
    /// Length of the first complete frame in the buffer, prefix included
    fn complete_frame(&mut self) -> Result<Option<usize>> {
        let Some(prefix) = self.buffer.get(..4) else {
            return Ok(None);
        };

        let mut length = [0u8; 4];
        length.copy_from_slice(prefix);
        let length = u32::from_le_bytes(length) as usize;

        if length > MAX_FRAME_SIZE {
            warn!(
                target: "sync",
                "frame of {} bytes exceeds the limit of {} bytes, stream is desynchronized",
                length,
                MAX_FRAME_SIZE
            );
            self.buffer.clear();
            self.desynchronized = true;
            return Err(desynchronized_error());
        }

        if self.buffer.len() >= length + 4 {
            Ok(Some(length + 4))
        } else {
            Ok(None)
        }
    }

    fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.desynchronized {
            return Err(desynchronized_error());
        }

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(size) = self.complete_frame()? {
                let frame: Vec<u8> = self.buffer.drain(..size).skip(4).collect();
                return Ok(Some(frame));
            }

            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    if self.buffer.is_empty() {
                        return Ok(None);
                    }
                    let dangling = self.buffer.len();
                    self.buffer.clear();
                    return Err(malformed_error!(
                        "Stream closed inside a frame, {} bytes dropped",
                        dangling
                    ));
                }
                Ok(read) => self.buffer.extend_from_slice(&chunk[..read]),
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error)
                    if matches!(error.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
                {
                    return Ok(None)
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}

/// [`SyncChannel`] over a reader and a writer.
///
/// Reads return `Ok(None)` when the reader reports a timeout (`TimedOut`/`WouldBlock`) or
/// end of stream, so the reader must not block indefinitely. On unix,
/// [`StreamChannel::with_timeout`] wraps a file-descriptor reader with a bounded wait.
///
/// # Examples
///
/// ```rust
/// use dotbreak::breakpoint::{BreakpointRecord, StreamChannel, SyncChannel};
///
/// let frame = BreakpointRecord::new("bp1", "Foo.cs", 10, true).encode_frame()?;
/// let channel = StreamChannel::new(std::io::Cursor::new(frame), Vec::new());
///
/// let record = channel.read_breakpoint()?.expect("one record");
/// assert_eq!(record.id, "bp1");
/// assert!(channel.read_breakpoint()?.is_none());
/// # Ok::<(), dotbreak::Error>(())
/// ```
pub struct StreamChannel<R, W> {
    reader: Mutex<FrameReader<R>>,
    writer: Mutex<W>,
}

impl<R: Read, W: Write> StreamChannel<R, W> {
    /// Creates a channel reading frames from `reader` and writing frames to `writer`
    pub fn new(reader: R, writer: W) -> Self {
        StreamChannel {
            reader: Mutex::new(FrameReader {
                inner: reader,
                buffer: Vec::new(),
                desynchronized: false,
            }),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the writer, e.g. to inspect what was sent
    ///
    /// # Errors
    /// Returns [`crate::Error::LockError`] if the writer lock was poisoned.
    pub fn into_writer(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| Error::LockError)
    }
}

#[cfg(unix)]
impl<R: Read + AsRawFd, W: Write> StreamChannel<TimeoutReader<R>, W> {
    /// Creates a channel whose reads wait at most `timeout` for data
    pub fn with_timeout(reader: R, writer: W, timeout: Duration) -> Self {
        StreamChannel::new(TimeoutReader::new(reader, timeout), writer)
    }
}

impl<R, W> SyncChannel for StreamChannel<R, W>
where
    R: Read + Send,
    W: Write + Send,
{
    fn write_breakpoint(&self, record: &BreakpointRecord) -> Result<()> {
        let frame = record.encode_frame()?;

        let mut writer = lock!(self.writer)?;
        writer.write_all(&frame)?;
        writer.flush()?;

        debug!(target: "sync", "sent breakpoint {} ({} bytes)", record.id, frame.len());
        Ok(())
    }

    fn read_breakpoint(&self) -> Result<Option<BreakpointRecord>> {
        let mut reader = lock!(self.reader)?;
        let Some(frame) = reader.next_frame()? else {
            return Ok(None);
        };
        drop(reader);

        match BreakpointRecord::decode_payload(&frame) {
            Ok(record) => {
                debug!(target: "sync", "received breakpoint {}", record.id);
                Ok(Some(record))
            }
            Err(error) => {
                warn!(target: "sync", "dropping undecodable frame of {} bytes: {}", frame.len(), error);
                Err(error)
            }
        }
    }
}
