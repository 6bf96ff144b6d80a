use tracing::debug;

use super::{MiniStream, RegularStream, StreamKind, StreamStrategy};
use crate::cfb::consts::ENDOFCHAIN;
use crate::common::error::Result;

/// Routes stream I/O to the mini or regular strategy by stream size.
///
/// Streams only ever move from the mini stream to regular sectors, when an
/// append takes them to 4096 bytes or more. The abandoned mini chain is not
/// reclaimed.
#[derive(Debug)]
pub struct StreamHolder {
    regular: RegularStream,
    mini: MiniStream,
}

impl StreamHolder {
    pub fn new(regular: RegularStream, mini: MiniStream) -> Self {
        Self { regular, mini }
    }

    pub fn mini(&self) -> &MiniStream {
        &self.mini
    }

    fn strategy(&self, kind: StreamKind) -> &dyn StreamStrategy {
        match kind {
            StreamKind::Mini => &self.mini,
            StreamKind::Regular => &self.regular,
        }
    }

    /// Full contents of a stream of `size` bytes starting at `start`.
    pub fn data(&self, start: u32, size: u64) -> Result<Vec<u8>> {
        if size == 0 || start >= crate::cfb::consts::DIFSECT {
            return Ok(Vec::new());
        }
        self.strategy(StreamKind::for_size(size)).read(start, size)
    }

    /// Bytes `[from, to)` of a stream of `size` bytes.
    pub fn read(&self, start: u32, size: u64, from: usize, to: usize) -> Result<Vec<u8>> {
        self.strategy(StreamKind::for_size(size))
            .read_range(start, from, to)
    }

    /// Store `data` as a new stream, returning its start (`ENDOFCHAIN` if empty).
    pub fn set_data(&self, data: &[u8]) -> Result<u32> {
        if data.is_empty() {
            return Ok(ENDOFCHAIN);
        }
        self.strategy(StreamKind::for_size(data.len() as u64))
            .write(data)
    }

    pub fn write_at(&self, start: u32, size: u64, position: usize, data: &[u8]) -> Result<()> {
        self.strategy(StreamKind::for_size(size))
            .write_at(start, position, data)
    }

    /// Append to a stream of `size` bytes; returns the start after appending,
    /// which changes when the stream is promoted.
    pub fn append(&self, start: u32, size: u64, data: &[u8]) -> Result<u32> {
        let before = StreamKind::for_size(size);
        let after = StreamKind::for_size(size + data.len() as u64);
        match (before, after) {
            (StreamKind::Mini, StreamKind::Regular) => {
                let mut merged = self.data(start, size)?;
                merged.extend_from_slice(data);
                let promoted = self.regular.write(&merged)?;
                debug!(
                    from = start,
                    to = promoted,
                    size = merged.len(),
                    "promoted stream out of the mini stream"
                );
                Ok(promoted)
            },
            (kind, _) => self.strategy(kind).append(start, size, data),
        }
    }
}
