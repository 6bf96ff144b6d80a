//! Stream storage strategies.
//!
//! A stream's bytes live either in regular 512-byte sectors chained through
//! the FAT, or, below the 4096-byte cutoff, in 64-byte mini sectors chained
//! through the MiniFAT. [`StreamHolder`] picks the strategy from the stream
//! size and moves the data across when a stream outgrows the mini stream.

mod holder;
mod mini;
mod regular;

pub use holder::StreamHolder;
pub use mini::MiniStream;
pub use regular::RegularStream;

use super::consts::MINI_STREAM_CUTOFF;
use crate::common::error::Result;

/// Reading and writing one stream's chain of storage units.
///
/// `start` is the first unit of the chain; sizes are in bytes.
pub trait StreamStrategy {
    /// The first `size` bytes of the chain at `start`.
    fn read(&self, start: u32, size: u64) -> Result<Vec<u8>>;

    /// Bytes `[from, to)` of the chain at `start`.
    fn read_range(&self, start: u32, from: usize, to: usize) -> Result<Vec<u8>>;

    /// Store `data` in a new chain and return its first unit.
    fn write(&self, data: &[u8]) -> Result<u32>;

    /// Overwrite bytes in place. Never grows the chain.
    fn write_at(&self, start: u32, position: usize, data: &[u8]) -> Result<()>;

    /// Extend a stream of `current_size` bytes; returns the (possibly new) start.
    fn append(&self, start: u32, current_size: u64, data: &[u8]) -> Result<u32>;
}

/// Where a stream of a given size is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Mini,
    Regular,
}

impl StreamKind {
    pub fn for_size(size: u64) -> Self {
        if size >= u64::from(MINI_STREAM_CUTOFF) {
            StreamKind::Regular
        } else {
            StreamKind::Mini
        }
    }
}
