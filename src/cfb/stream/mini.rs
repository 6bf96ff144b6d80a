//! Small streams packed into 64-byte mini sectors.
//!
//! All mini sectors live inside one regular-sector chain, the mini stream,
//! whose start and length are recorded on the root directory entry.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use super::StreamStrategy;
use crate::cfb::alloc::{Fat, MiniFat};
use crate::cfb::consts::{ENDOFCHAIN, MINI_SECTOR_SIZE, SECTOR_SIZE, direntry};
use crate::cfb::header::Header;
use crate::cfb::sectors::{Sector, Sectors};
use crate::cfb::view::{SimpleView, VariableSizeChunkedView};
use crate::common::error::{Error, Result};

#[derive(Debug)]
pub struct MiniStream {
    sectors: Rc<Sectors>,
    header: Rc<Header>,
    fat: Rc<Fat>,
    minifat: Rc<MiniFat>,
    /// Regular sectors holding the mini stream
    chain: RefCell<Vec<u32>>,
    /// Bytes of the mini stream in use, always a multiple of 64
    len: Cell<u64>,
}

impl MiniStream {
    /// Pick up the mini stream recorded on the root entry, if any.
    pub fn open(
        sectors: Rc<Sectors>,
        header: Rc<Header>,
        fat: Rc<Fat>,
        minifat: Rc<MiniFat>,
    ) -> Result<Self> {
        let (chain, len) = match root_entry_sector(&sectors, &header)? {
            Some(root) => {
                let start = root.u32_at(direntry::STARTING_SECTOR)?;
                let size = u64::from(root.u32_at(direntry::STREAM_SIZE)?);
                let len = size.div_ceil(MINI_SECTOR_SIZE as u64) * MINI_SECTOR_SIZE as u64;
                (fat.build_chain(start)?, len)
            },
            None => (Vec::new(), 0),
        };
        Ok(Self {
            sectors,
            header,
            fat,
            minifat,
            chain: RefCell::new(chain),
            len: Cell::new(len),
        })
    }

    pub fn len(&self) -> u64 {
        self.len.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len.get() == 0
    }

    /// First regular sector of the mini stream, `ENDOFCHAIN` while empty.
    pub fn first_sector(&self) -> u32 {
        if self.is_empty() {
            return ENDOFCHAIN;
        }
        self.chain.borrow().first().copied().unwrap_or(ENDOFCHAIN)
    }

    /// The 64 bytes of mini sector `position`.
    fn mini_sector(&self, position: u32) -> Result<SimpleView> {
        let offset = position as usize * MINI_SECTOR_SIZE;
        let index = offset / SECTOR_SIZE;
        let inside = offset % SECTOR_SIZE;
        let sector = {
            let chain = self.chain.borrow();
            chain
                .get(index)
                .copied()
                .ok_or_else(|| Error::out_of_bounds("mini stream sector", index, chain.len()))?
        };
        self.sectors
            .sector(sector)?
            .subview(inside, inside + MINI_SECTOR_SIZE)
    }

    fn chain_view(&self, start: u32) -> Result<VariableSizeChunkedView> {
        let views = self
            .minifat
            .build_chain(start)?
            .into_iter()
            .map(|position| self.mini_sector(position))
            .collect::<Result<Vec<_>>>()?;
        Ok(VariableSizeChunkedView::new(views))
    }

    /// Regular sector receiving the next mini sector, growing the chain when
    /// the mini stream has used up all of it.
    fn sector_for_next_chunk(&self) -> Result<Sector> {
        let index = (self.len.get() / SECTOR_SIZE as u64) as usize;
        let (existing, last) = {
            let chain = self.chain.borrow();
            (chain.get(index).copied(), chain.last().copied())
        };
        match existing {
            Some(position) => self.sectors.sector(position),
            None => {
                let sector = self.sectors.allocate()?;
                self.fat.register_sector(sector.position(), last)?;
                self.chain.borrow_mut().push(sector.position());
                debug!(position = sector.position(), "extended mini stream");
                Ok(sector)
            },
        }
    }

    /// Store `data` in fresh mini sectors chained after `previous`.
    fn write_chunks(&self, data: &[u8], mut previous: Option<u32>) -> Result<Option<u32>> {
        let mut first = None;
        for chunk in data.chunks(MINI_SECTOR_SIZE) {
            let inside = (self.len.get() % SECTOR_SIZE as u64) as usize;
            self.sector_for_next_chunk()?.write_at(inside, chunk)?;
            let position = (self.len.get() / MINI_SECTOR_SIZE as u64) as u32;
            self.minifat.register_sector(position, previous)?;
            first.get_or_insert(position);
            previous = Some(position);
            self.len.set(self.len.get() + MINI_SECTOR_SIZE as u64);
        }
        Ok(first)
    }

    /// Record the mini stream's start and length on the root entry.
    fn persist_root(&self) -> Result<()> {
        let root = root_entry_sector(&self.sectors, &self.header)?
            .ok_or_else(|| Error::Structure("mini stream written before root entry".to_string()))?;
        root.set_u32(direntry::STARTING_SECTOR, self.first_sector())?;
        root.view().set_u64(direntry::STREAM_SIZE, self.len.get())
    }
}

/// First directory sector, whose first slot is the root entry.
fn root_entry_sector(sectors: &Sectors, header: &Header) -> Result<Option<Sector>> {
    let first = header.first_directory_sector()?;
    if first >= crate::cfb::consts::DIFSECT {
        return Ok(None);
    }
    sectors.sector(first).map(Some)
}

impl StreamStrategy for MiniStream {
    fn read(&self, start: u32, size: u64) -> Result<Vec<u8>> {
        let size = size as usize;
        let mut data = Vec::with_capacity(size);
        for position in self.minifat.build_chain(start)? {
            if data.len() >= size {
                break;
            }
            let take = (size - data.len()).min(MINI_SECTOR_SIZE);
            data.extend_from_slice(&self.mini_sector(position)?.read(0..take)?);
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
        let first = self.write_chunks(data, None)?;
        self.persist_root()?;
        Ok(first.unwrap_or(ENDOFCHAIN))
    }

    fn write_at(&self, start: u32, position: usize, data: &[u8]) -> Result<()> {
        self.chain_view(start)?.write_at(position, data)
    }

    fn append(&self, start: u32, current_size: u64, data: &[u8]) -> Result<u32> {
        let chain = self.minifat.build_chain(start)?;
        let Some(&last) = chain.last() else {
            return self.write(data);
        };
        let used = current_size as usize % MINI_SECTOR_SIZE;
        let mut consumed = 0;
        if used != 0 {
            consumed = data.len().min(MINI_SECTOR_SIZE - used);
            self.mini_sector(last)?.write_at(used, &data[..consumed])?;
        }
        self.write_chunks(&data[consumed..], Some(last))?;
        self.persist_root()?;
        Ok(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfb::alloc::{Tables, open_tables};
    use crate::cfb::consts::{FREESECT, HEADER_SIZE};
    use crate::cfb::view::FixedSizeChunkedView;

    struct Fixture {
        sectors: Rc<Sectors>,
        header: Rc<Header>,
        tables: Tables,
    }

    /// Empty container with one directory sector standing in for the root entry.
    fn fixture() -> Fixture {
        let backing = FixedSizeChunkedView::new(512);
        let header = Rc::new(Header::empty(backing.allocate(HEADER_SIZE).unwrap()).unwrap());
        let sectors = Rc::new(Sectors::new(backing).unwrap());
        let tables = open_tables(&sectors, &header).unwrap();
        let directory = sectors.allocate().unwrap();
        tables.fat.register_sector(directory.position(), None).unwrap();
        directory.set_u32(direntry::STARTING_SECTOR, ENDOFCHAIN).unwrap();
        directory.view().set_u64(direntry::STREAM_SIZE, 0).unwrap();
        header.set_first_directory_sector(directory.position()).unwrap();
        Fixture {
            sectors,
            header,
            tables,
        }
    }

    fn open(fx: &Fixture) -> MiniStream {
        MiniStream::open(
            Rc::clone(&fx.sectors),
            Rc::clone(&fx.header),
            Rc::clone(&fx.tables.fat),
            Rc::clone(&fx.tables.minifat),
        )
        .unwrap()
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 3 % 256) as u8).collect()
    }

    #[test]
    fn test_write_520_bytes_spans_two_regular_sectors() {
        let fx = fixture();
        let mini = open(&fx);
        let data = pattern(520);
        let start = mini.write(&data).unwrap();

        assert_eq!(start, 0);
        assert_eq!(fx.tables.minifat.build_chain(start).unwrap(), (0..9).collect::<Vec<u32>>());
        assert_eq!(mini.len(), 9 * 64);
        let mini_chain = fx.tables.fat.build_chain(mini.first_sector()).unwrap();
        assert_eq!(mini_chain.len(), 2);
        assert_eq!(mini.read(start, 520).unwrap(), data);
    }

    #[test]
    fn test_root_entry_tracks_mini_stream() {
        let fx = fixture();
        let mini = open(&fx);
        mini.write(&[7u8; 100]).unwrap();
        let root = fx.sectors.sector(fx.header.first_directory_sector().unwrap()).unwrap();
        assert_eq!(root.u32_at(direntry::STARTING_SECTOR).unwrap(), mini.first_sector());
        assert_eq!(root.u32_at(direntry::STREAM_SIZE).unwrap(), 128);

        let reopened = open(&fx);
        assert_eq!(reopened.len(), 128);
        let second = reopened.write(&[8u8; 10]).unwrap();
        assert_eq!(second, 2);
        assert_eq!(reopened.read(0, 100).unwrap(), vec![7u8; 100]);
    }

    #[test]
    fn test_append_tops_up_last_mini_sector() {
        let fx = fixture();
        let mini = open(&fx);
        let start = mini.write(&[1u8; 40]).unwrap();
        mini.append(start, 40, &[2u8; 100]).unwrap();
        assert_eq!(fx.tables.minifat.build_chain(start).unwrap().len(), 3);

        let mut expected = vec![1u8; 40];
        expected.extend(vec![2u8; 100]);
        assert_eq!(mini.read(start, 140).unwrap(), expected);
    }

    #[test]
    fn test_interleaved_streams_keep_their_own_chains() {
        let fx = fixture();
        let mini = open(&fx);
        let a = mini.write(&[0xAA; 64]).unwrap();
        let b = mini.write(&[0xBB; 64]).unwrap();
        mini.append(a, 64, &[0xAC; 64]).unwrap();
        assert_eq!(fx.tables.minifat.build_chain(a).unwrap(), vec![0, 2]);
        assert_eq!(mini.read(b, 64).unwrap(), vec![0xBB; 64]);
        assert_eq!(mini.read_range(a, 60, 68).unwrap(), [[0xAA; 4], [0xAC; 4]].concat());
    }

    #[test]
    fn test_write_at_inside_chain() {
        let fx = fixture();
        let mini = open(&fx);
        let start = mini.write(&[0u8; 128]).unwrap();
        mini.write_at(start, 62, &[5, 5, 5, 5]).unwrap();
        assert_eq!(mini.read_range(start, 60, 68).unwrap(), vec![0, 0, 5, 5, 5, 5, 0, 0]);
        assert!(mini.write_at(start, 126, &[1, 1, 1]).is_err());
    }

    #[test]
    fn test_unused_root_slot_reads_as_empty() {
        let fx = fixture();
        let root = fx.sectors.sector(fx.header.first_directory_sector().unwrap()).unwrap();
        root.set_u32(direntry::STARTING_SECTOR, FREESECT).unwrap();
        let mini = open(&fx);
        assert!(mini.is_empty());
        assert_eq!(mini.first_sector(), ENDOFCHAIN);
    }
}
