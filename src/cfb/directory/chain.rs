use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use super::entry::{EntryRecord, ObjectType, ROOT_ID};
use super::{DirectoryEntry, Storage, Stream};
use crate::cfb::alloc::Fat;
use crate::cfb::consts::{DIRENTRIES_PER_SECTOR, DIRENTRY_SIZE, ROOT_ENTRY_NAME, direntry};
use crate::cfb::header::Header;
use crate::cfb::sectors::Sectors;
use crate::cfb::stream::StreamHolder;
use crate::cfb::tree::Color;
use crate::cfb::view::SimpleView;
use crate::common::error::{Error, Result};

/// All directory entries of a container, stored four to a sector in one
/// FAT chain starting at the header's first directory sector.
#[derive(Debug)]
pub struct DirectoryEntryChain {
    sectors: Rc<Sectors>,
    fat: Rc<Fat>,
    header: Rc<Header>,
    streams: StreamHolder,
    sector_chain: RefCell<Vec<u32>>,
    count: Cell<u32>,
}

impl DirectoryEntryChain {
    pub fn open(
        sectors: Rc<Sectors>,
        fat: Rc<Fat>,
        header: Rc<Header>,
        streams: StreamHolder,
    ) -> Result<Self> {
        let sector_chain = fat.build_chain(header.first_directory_sector()?)?;
        let count = count_entries(&sectors, &sector_chain)?;
        debug!(
            sectors = sector_chain.len(),
            entries = count,
            "opened directory"
        );
        Ok(Self {
            sectors,
            fat,
            header,
            streams,
            sector_chain: RefCell::new(sector_chain),
            count: Cell::new(count),
        })
    }

    /// Number of entries in use.
    pub fn len(&self) -> u32 {
        self.count.get()
    }

    pub fn is_empty(&self) -> bool {
        self.count.get() == 0
    }

    pub fn streams(&self) -> &StreamHolder {
        &self.streams
    }

    /// Record of entry `sid`.
    pub fn record(&self, sid: u32) -> Result<EntryRecord> {
        if sid >= self.count.get() {
            return Err(Error::out_of_bounds(
                "directory entry",
                sid as usize,
                self.count.get() as usize,
            ));
        }
        EntryRecord::load(sid, self.slot(sid)?)
    }

    fn slot(&self, sid: u32) -> Result<SimpleView> {
        let index = sid as usize / DIRENTRIES_PER_SECTOR;
        let sector = {
            let chain = self.sector_chain.borrow();
            chain
                .get(index)
                .copied()
                .ok_or_else(|| Error::out_of_bounds("directory sector", index, chain.len()))?
        };
        let offset = sid as usize % DIRENTRIES_PER_SECTOR * DIRENTRY_SIZE;
        self.sectors.sector(sector)?.subview(offset, offset + DIRENTRY_SIZE)
    }

    /// Reserve the next entry slot, growing the directory chain when the
    /// slot falls outside it.
    fn allocate_slot(&self) -> Result<(u32, SimpleView)> {
        let sid = self.count.get();
        let index = sid as usize / DIRENTRIES_PER_SECTOR;
        if index >= self.sector_chain.borrow().len() {
            let sector = self.sectors.allocate()?;
            let previous = self.sector_chain.borrow().last().copied();
            match previous {
                None => {
                    self.header.set_first_directory_sector(sector.position())?;
                    self.fat.register_sector(sector.position(), None)?;
                },
                Some(previous) => self.fat.register_sector(sector.position(), Some(previous))?,
            }
            self.sector_chain.borrow_mut().push(sector.position());
            debug!(position = sector.position(), "allocated directory sector");
        }
        let view = self.slot(sid)?;
        self.count.set(sid + 1);
        Ok((sid, view))
    }

    /// Create the root storage of an empty directory.
    pub fn create_root(self: &Rc<Self>) -> Result<Storage> {
        if !self.is_empty() {
            return Err(Error::Structure(
                "the root storage must be the first directory entry".to_string(),
            ));
        }
        let (sid, view) = self.allocate_slot()?;
        let record = EntryRecord::init(sid, view, ROOT_ENTRY_NAME, ObjectType::Root, Color::Black)?;
        Ok(Storage::new(Rc::clone(self), record))
    }

    /// Append a fresh, unlinked entry.
    pub(crate) fn create_entry(&self, name: &str, object_type: ObjectType) -> Result<EntryRecord> {
        let (sid, view) = self.allocate_slot()?;
        let record = EntryRecord::init(sid, view, name, object_type, Color::Red)?;
        debug!(sid, name, ?object_type, "created directory entry");
        Ok(record)
    }

    /// Typed handle for entry `sid`.
    pub fn entry(self: &Rc<Self>, sid: u32) -> Result<DirectoryEntry> {
        let record = self.record(sid)?;
        let chain = Rc::clone(self);
        match record.object_type()? {
            ObjectType::Root => Ok(DirectoryEntry::Root(Storage::new(chain, record))),
            ObjectType::Storage => Ok(DirectoryEntry::Storage(Storage::new(chain, record))),
            ObjectType::Stream => Ok(DirectoryEntry::Stream(Stream::new(chain, record))),
            ObjectType::Empty => Err(Error::Structure(format!(
                "directory entry {sid} is referenced but unused"
            ))),
        }
    }

    pub fn root(self: &Rc<Self>) -> Result<Storage> {
        match self.entry(ROOT_ID)? {
            DirectoryEntry::Root(root) => Ok(root),
            _ => Err(Error::Structure("entry 0 is not the root storage".to_string())),
        }
    }
}

/// Entries in use: one past the highest id any entry links to, at least the
/// root, never more than the chain has slots.
fn count_entries(sectors: &Sectors, chain: &[u32]) -> Result<u32> {
    let mut highest = None;
    for &position in chain {
        let sector = sectors.sector(position)?;
        for slot in 0..DIRENTRIES_PER_SECTOR {
            let base = slot * DIRENTRY_SIZE;
            for field in [direntry::LEFT_SIBLING, direntry::RIGHT_SIBLING, direntry::CHILD] {
                let id = sector.u32_at(base + field)?;
                if id < crate::cfb::consts::DIFSECT {
                    highest = highest.max(Some(id));
                }
            }
        }
    }
    let slots = (chain.len() * DIRENTRIES_PER_SECTOR) as u32;
    let used = highest.map_or(1, |id| id.saturating_add(1));
    Ok(if chain.is_empty() { 0 } else { used.min(slots) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfb::alloc::open_tables;
    use crate::cfb::consts::{ENDOFCHAIN, HEADER_SIZE};
    use crate::cfb::stream::{MiniStream, RegularStream};
    use crate::cfb::view::FixedSizeChunkedView;

    fn chain_over(backing: FixedSizeChunkedView, header: Rc<Header>) -> Rc<DirectoryEntryChain> {
        let sectors = Rc::new(Sectors::new(backing).unwrap());
        let tables = open_tables(&sectors, &header).unwrap();
        let streams = StreamHolder::new(
            RegularStream::new(Rc::clone(&sectors), Rc::clone(&tables.fat)),
            MiniStream::open(
                Rc::clone(&sectors),
                Rc::clone(&header),
                Rc::clone(&tables.fat),
                Rc::clone(&tables.minifat),
            )
            .unwrap(),
        );
        Rc::new(DirectoryEntryChain::open(sectors, tables.fat, header, streams).unwrap())
    }

    fn empty_chain() -> (FixedSizeChunkedView, Rc<Header>, Rc<DirectoryEntryChain>) {
        let backing = FixedSizeChunkedView::new(512);
        let header = Rc::new(Header::empty(backing.allocate(HEADER_SIZE).unwrap()).unwrap());
        let chain = chain_over(backing.clone(), Rc::clone(&header));
        (backing, header, chain)
    }

    #[test]
    fn test_root_goes_into_first_directory_sector() {
        let (_, header, chain) = empty_chain();
        assert_eq!(header.first_directory_sector().unwrap(), ENDOFCHAIN);
        let root = chain.create_root().unwrap();
        assert_eq!(root.id(), ROOT_ID);
        assert_ne!(header.first_directory_sector().unwrap(), ENDOFCHAIN);
        assert!(chain.create_root().is_err());
    }

    #[test]
    fn test_fifth_entry_chains_a_second_sector() {
        let (_, header, chain) = empty_chain();
        chain.create_root().unwrap();
        for name in ["a", "b", "c", "d"] {
            chain.create_entry(name, ObjectType::Storage).unwrap();
        }
        assert_eq!(chain.len(), 5);
        assert_eq!(chain.sector_chain.borrow().len(), 2);
        let first = header.first_directory_sector().unwrap();
        assert_eq!(chain.fat.build_chain(first).unwrap(), *chain.sector_chain.borrow());
        assert_eq!(chain.record(4).unwrap().name().unwrap(), "d");
    }

    #[test]
    fn test_record_is_bounds_checked() {
        let (_, _, chain) = empty_chain();
        chain.create_root().unwrap();
        assert!(matches!(chain.record(1), Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn test_entry_dispatches_on_type() {
        let (_, _, chain) = empty_chain();
        chain.create_root().unwrap();
        chain.create_entry("dir", ObjectType::Storage).unwrap();
        chain.create_entry("file", ObjectType::Stream).unwrap();
        assert!(matches!(chain.entry(0).unwrap(), DirectoryEntry::Root(_)));
        assert!(matches!(chain.entry(1).unwrap(), DirectoryEntry::Storage(_)));
        assert!(matches!(chain.entry(2).unwrap(), DirectoryEntry::Stream(_)));
    }

    #[test]
    fn test_reopen_counts_linked_entries() {
        let (backing, header, chain) = empty_chain();
        let root = chain.create_root().unwrap();
        root.add_storage("one").unwrap();
        root.add_storage("two").unwrap();
        root.add_storage("three").unwrap();

        let reopened = chain_over(backing, header);
        assert_eq!(reopened.len(), 4);
        let reopened_root = reopened.root().unwrap();
        assert_eq!(reopened_root.children().unwrap().len(), 3);
    }

    #[test]
    fn test_lone_root_survives_reopen() {
        let (backing, header, chain) = empty_chain();
        chain.create_root().unwrap();
        let reopened = chain_over(backing, header);
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.root().unwrap().name().unwrap(), ROOT_ENTRY_NAME);
    }
}
