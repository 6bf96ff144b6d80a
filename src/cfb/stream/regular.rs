//! Streams stored directly in FAT-chained 512-byte sectors.

use std::rc::Rc;

use super::StreamStrategy;
use crate::cfb::alloc::Fat;
use crate::cfb::consts::{ENDOFCHAIN, SECTOR_SIZE};
use crate::cfb::sectors::Sectors;
use crate::cfb::view::VariableSizeChunkedView;
use crate::common::error::{Error, Result};

#[derive(Debug)]
pub struct RegularStream {
    sectors: Rc<Sectors>,
    fat: Rc<Fat>,
}

impl RegularStream {
    pub fn new(sectors: Rc<Sectors>, fat: Rc<Fat>) -> Self {
        Self { sectors, fat }
    }

    fn chain_view(&self, start: u32) -> Result<VariableSizeChunkedView> {
        let views = self
            .fat
            .build_chain(start)?
            .into_iter()
            .map(|position| Ok(self.sectors.sector(position)?.view().clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(VariableSizeChunkedView::new(views))
    }

    /// Allocate and chain one sector per 512 bytes of `data`, after `previous`.
    fn write_sectors(&self, data: &[u8], mut previous: Option<u32>) -> Result<Option<u32>> {
        let mut first = None;
        for chunk in data.chunks(SECTOR_SIZE) {
            let sector = self.sectors.allocate()?;
            sector.write_at(0, chunk)?;
            self.fat.register_sector(sector.position(), previous)?;
            first.get_or_insert(sector.position());
            previous = Some(sector.position());
        }
        Ok(first)
    }
}

impl StreamStrategy for RegularStream {
    fn read(&self, start: u32, size: u64) -> Result<Vec<u8>> {
        let size = size as usize;
        let mut data = Vec::with_capacity(size);
        for position in self.fat.build_chain(start)? {
            if data.len() >= size {
                break;
            }
            let take = (size - data.len()).min(SECTOR_SIZE);
            data.extend_from_slice(&self.sectors.sector(position)?.view().read(0..take)?);
        }
        if data.len() < size {
            return Err(Error::premature_end_of_chain());
        }
        Ok(data)
    }

    fn read_range(&self, start: u32, from: usize, to: usize) -> Result<Vec<u8>> {
        self.chain_view(start)?.read(from, to)
    }

    fn write(&self, data: &[u8]) -> Result<u32> {
        Ok(self.write_sectors(data, None)?.unwrap_or(ENDOFCHAIN))
    }

    fn write_at(&self, start: u32, position: usize, data: &[u8]) -> Result<()> {
        self.chain_view(start)?.write_at(position, data)
    }

    fn append(&self, start: u32, current_size: u64, data: &[u8]) -> Result<u32> {
        let chain = self.fat.build_chain(start)?;
        let Some(&last) = chain.last() else {
            return self.write(data);
        };
        let used = current_size as usize % SECTOR_SIZE;
        let mut consumed = 0;
        if used != 0 {
            consumed = data.len().min(SECTOR_SIZE - used);
            self.sectors.sector(last)?.write_at(used, &data[..consumed])?;
        }
        self.write_sectors(&data[consumed..], Some(last))?;
        Ok(start)
    }
}
