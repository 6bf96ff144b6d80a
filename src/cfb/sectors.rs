//! The flat sector array following the header.

use std::cell::RefCell;

use tracing::trace;

use super::consts;
use super::view::{FixedSizeChunkedView, SimpleView};
use crate::common::error::{Error, Result};

/// One 512-byte sector and its position in the sector array.
#[derive(Clone, Debug)]
pub struct Sector {
    position: u32,
    view: SimpleView,
}

impl Sector {
    #[inline]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[inline]
    pub fn view(&self) -> &SimpleView {
        &self.view
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        self.view.u32_at(offset)
    }

    pub fn set_u32(&self, offset: usize, value: u32) -> Result<()> {
        self.view.set_u32(offset, value)
    }

    pub fn write_at(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.view.write_at(offset, bytes)
    }

    pub fn subview(&self, start: usize, end: usize) -> Result<SimpleView> {
        self.view.subview(start, Some(end))
    }
}

/// Sector array over the chunked container backing.
///
/// Chunk 0 of a non-empty backing is the header and is skipped; sector `n`
/// is chunk `n + 1`. Sectors are only ever appended.
#[derive(Debug)]
pub struct Sectors {
    backing: FixedSizeChunkedView,
    sectors: RefCell<Vec<Sector>>,
}

impl Sectors {
    pub fn new(backing: FixedSizeChunkedView) -> Result<Self> {
        if backing.chunk_size() != consts::SECTOR_SIZE {
            return Err(Error::InvalidFormat(format!(
                "sector size {} is not supported",
                backing.chunk_size()
            )));
        }
        let mut sectors = Vec::with_capacity(backing.chunk_count().saturating_sub(1));
        for index in 1..backing.chunk_count() {
            sectors.push(Sector {
                position: sectors.len() as u32,
                view: backing.chunk(index)?,
            });
        }
        Ok(Self {
            backing,
            sectors: RefCell::new(sectors),
        })
    }

    pub fn len(&self) -> usize {
        self.sectors.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sector(&self, position: u32) -> Result<Sector> {
        let sectors = self.sectors.borrow();
        sectors
            .get(position as usize)
            .cloned()
            .ok_or_else(|| Error::out_of_bounds("sector", position as usize, sectors.len()))
    }

    /// Append a sector filled with `FREESECT`.
    ///
    /// The caller registers it in whichever table owns it.
    pub fn allocate(&self) -> Result<Sector> {
        let view = self.backing.allocate(consts::SECTOR_SIZE)?;
        view.fill(&consts::FREESECT_BYTES)?;
        let mut sectors = self.sectors.borrow_mut();
        let sector = Sector {
            position: sectors.len() as u32,
            view,
        };
        trace!(position = sector.position, "allocated sector");
        sectors.push(sector.clone());
        Ok(sector)
    }

    /// Append a DIFAT sector: all slots free, forward pointer `ENDOFCHAIN`.
    pub fn allocate_difat(&self) -> Result<Sector> {
        let sector = self.allocate()?;
        sector.set_u32(consts::DIFAT_NEXT_SECTOR_OFFSET, consts::ENDOFCHAIN)?;
        Ok(sector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_chunk_is_skipped() {
        let backing = FixedSizeChunkedView::from_bytes(512, vec![0u8; 512 * 3]).unwrap();
        let sectors = Sectors::new(backing).unwrap();
        assert_eq!(sectors.len(), 2);
        assert_eq!(sectors.sector(1).unwrap().position(), 1);
        assert!(sectors.sector(2).is_err());
    }

    #[test]
    fn test_allocate_fills_with_freesect() {
        let backing = FixedSizeChunkedView::new(512);
        let sectors = Sectors::new(backing.clone()).unwrap();
        let first = sectors.allocate().unwrap();
        let second = sectors.allocate().unwrap();
        assert_eq!((first.position(), second.position()), (0, 1));
        assert_eq!(backing.chunk_count(), 2);
        assert!(first.view().to_vec().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_allocate_difat_sets_forward_pointer() {
        let sectors = Sectors::new(FixedSizeChunkedView::new(512)).unwrap();
        let difat = sectors.allocate_difat().unwrap();
        assert_eq!(difat.u32_at(508).unwrap(), consts::ENDOFCHAIN);
        assert_eq!(difat.u32_at(0).unwrap(), consts::FREESECT);
        assert_eq!(difat.u32_at(504).unwrap(), consts::FREESECT);
    }

    #[test]
    fn test_rejects_other_sector_sizes() {
        assert!(Sectors::new(FixedSizeChunkedView::new(4096)).is_err());
    }
}
