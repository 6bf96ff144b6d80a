use std::rc::Rc;

use super::chain::DirectoryEntryChain;
use super::entry::EntryRecord;
use crate::cfb::consts::ENDOFCHAIN;
use crate::common::error::{Error, Result};

/// A stream entry and access to its bytes.
#[derive(Clone, Debug)]
pub struct Stream {
    chain: Rc<DirectoryEntryChain>,
    record: EntryRecord,
}

impl Stream {
    pub(crate) fn new(chain: Rc<DirectoryEntryChain>, record: EntryRecord) -> Self {
        Self { chain, record }
    }

    pub(crate) fn chain(&self) -> &Rc<DirectoryEntryChain> {
        &self.chain
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.record.sid()
    }

    pub fn name(&self) -> Result<String> {
        self.record.name()
    }

    pub fn record(&self) -> &EntryRecord {
        &self.record
    }

    pub fn size(&self) -> Result<u64> {
        self.record.stream_size()
    }

    pub fn has_data(&self) -> Result<bool> {
        Ok(self.record.starting_sector()? != ENDOFCHAIN)
    }

    /// The whole stream.
    pub fn data(&self) -> Result<Vec<u8>> {
        if !self.has_data()? {
            return Ok(Vec::new());
        }
        self.chain
            .streams()
            .data(self.record.starting_sector()?, self.size()?)
    }

    /// Bytes `[from, to)`.
    pub fn read(&self, from: usize, to: usize) -> Result<Vec<u8>> {
        let size = self.size()?;
        if from > to || to as u64 > size {
            return Err(Error::out_of_bounds("stream range", to, size as usize));
        }
        if from == to {
            return Ok(Vec::new());
        }
        self.chain
            .streams()
            .read(self.record.starting_sector()?, size, from, to)
    }

    /// Overwrite bytes in place; the stream never grows.
    pub fn write_at(&self, position: usize, data: &[u8]) -> Result<()> {
        let size = self.size()?;
        let end = position.saturating_add(data.len());
        if end as u64 > size {
            return Err(Error::out_of_bounds("stream write", end, size as usize));
        }
        if data.is_empty() {
            return Ok(());
        }
        self.chain
            .streams()
            .write_at(self.record.starting_sector()?, size, position, data)
    }

    /// Extend the stream, moving it out of the mini stream once it reaches
    /// the cutoff.
    pub fn append(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let size = self.size()?;
        let start = self
            .chain
            .streams()
            .append(self.record.starting_sector()?, size, data)?;
        self.record.set_starting_sector(start)?;
        self.record.set_stream_size(size + data.len() as u64)
    }

    /// Replace the contents with a freshly written chain.
    pub(crate) fn set_data(&self, data: &[u8]) -> Result<()> {
        let start = self.chain.streams().set_data(data)?;
        self.record.set_starting_sector(start)?;
        self.record.set_stream_size(data.len() as u64)
    }
}
