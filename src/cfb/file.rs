//! The compound file: one backing buffer and everything layered on it.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::ops::ControlFlow;
use std::path::Path;
use std::rc::Rc;

use tracing::{info, warn};

use super::alloc::{Tables, open_tables};
use super::consts::{HEADER_SIZE, MAGIC, SECTOR_SIZE};
use super::directory::{DirectoryEntry, DirectoryEntryChain, EntryRecord, Storage};
use super::header::Header;
use super::sectors::Sectors;
use super::stream::{MiniStream, RegularStream, StreamHolder};
use super::view::FixedSizeChunkedView;
use crate::common::error::{Error, Result};

/// A compound file held entirely in memory.
///
/// All handles obtained from it ([`Storage`], [`Stream`](super::Stream))
/// write straight into the shared backing, so [`as_bytes`](Self::as_bytes)
/// always reflects every change made so far.
///
/// # Example
///
/// ```
/// use cfbkit::CompoundFile;
///
/// # fn main() -> cfbkit::Result<()> {
/// let file = CompoundFile::new()?;
/// let root = file.root_storage()?;
/// root.add_storage("docs")?.add_stream("readme", b"hello")?;
///
/// let reopened = CompoundFile::from_bytes(file.into_bytes())?;
/// let stream = reopened.root_storage()?.stream_at(&["docs", "readme"])?;
/// assert_eq!(stream.data()?, b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CompoundFile {
    backing: FixedSizeChunkedView,
    header: Rc<Header>,
    sectors: Rc<Sectors>,
    tables: Tables,
    directory: Rc<DirectoryEntryChain>,
}

impl CompoundFile {
    /// An empty container holding only the root storage.
    pub fn new() -> Result<Self> {
        let backing = FixedSizeChunkedView::new(SECTOR_SIZE);
        Header::empty(backing.allocate(HEADER_SIZE)?)?;
        let file = Self::assemble(backing)?;
        file.directory.create_root()?;
        info!(sectors = file.sectors.len(), "created compound file");
        Ok(file)
    }

    /// Parse a container from its serialized bytes.
    ///
    /// Bytes past the last whole sector are dropped.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::InvalidFormat(format!(
                "{} bytes is too short for a compound file",
                bytes.len()
            )));
        }
        let trailing = bytes.len() % SECTOR_SIZE;
        if trailing != 0 {
            warn!(trailing, "ignoring bytes past the last whole sector");
            bytes.truncate(bytes.len() - trailing);
        }
        let file = Self::assemble(FixedSizeChunkedView::from_bytes(SECTOR_SIZE, bytes)?)?;
        file.directory.root()?;
        info!(
            sectors = file.sectors.len(),
            entries = file.directory.len(),
            "opened compound file"
        );
        Ok(file)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(bytes)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    fn assemble(backing: FixedSizeChunkedView) -> Result<Self> {
        let header = Rc::new(Header::new(backing.chunk(0)?)?);
        let sectors = Rc::new(Sectors::new(backing.clone())?);
        let tables = open_tables(&sectors, &header)?;
        let regular = RegularStream::new(Rc::clone(&sectors), Rc::clone(&tables.fat));
        let mini = MiniStream::open(
            Rc::clone(&sectors),
            Rc::clone(&header),
            Rc::clone(&tables.fat),
            Rc::clone(&tables.minifat),
        )?;
        let directory = Rc::new(DirectoryEntryChain::open(
            Rc::clone(&sectors),
            Rc::clone(&tables.fat),
            Rc::clone(&header),
            StreamHolder::new(regular, mini),
        )?);
        Ok(Self {
            backing,
            header,
            sectors,
            tables,
            directory,
        })
    }

    pub fn root_storage(&self) -> Result<Storage> {
        self.directory.root()
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn directory(&self) -> &Rc<DirectoryEntryChain> {
        &self.directory
    }

    /// Number of sectors after the header.
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /// The serialized container.
    pub fn as_bytes(&self) -> Vec<u8> {
        self.backing.to_vec()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.as_bytes()
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_to(BufWriter::new(File::create(path)?))
    }

    /// A compacted deep copy: every storage and stream re-added, in visiting
    /// order, to a fresh container. Orphaned chains are left behind.
    pub fn rewrite(&self) -> Result<CompoundFile> {
        let copy = CompoundFile::new()?;
        let root = self.root_storage()?;
        let copy_root = copy.root_storage()?;
        copy_metadata(root.record(), copy_root.record())?;
        copy_children(&root, &copy_root)?;
        info!(
            before = self.sectors.len(),
            after = copy.sectors.len(),
            "rewrote compound file"
        );
        Ok(copy)
    }
}

fn copy_children(source: &Storage, target: &Storage) -> Result<()> {
    let mut outcome = Ok(());
    source.each_child(|entry| {
        outcome = copy_entry(&entry, target);
        if outcome.is_err() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })?;
    outcome
}

fn copy_entry(entry: &DirectoryEntry, target: &Storage) -> Result<()> {
    let name = entry.name()?;
    match entry {
        DirectoryEntry::Storage(storage) => {
            let copy = target.add_storage(&name)?;
            copy_metadata(entry.record(), copy.record())?;
            copy_children(storage, &copy)
        },
        DirectoryEntry::Stream(stream) => {
            let copy = target.add_stream(&name, &stream.data()?)?;
            copy_metadata(entry.record(), copy.record())
        },
        DirectoryEntry::Root(_) => Err(Error::Structure(
            "the root storage cannot be a child".to_string(),
        )),
    }
}

fn copy_metadata(source: &EntryRecord, target: &EntryRecord) -> Result<()> {
    target.set_clsid(&source.clsid()?)?;
    target.set_state_bits(source.state_bits()?)?;
    target.set_creation_time(source.creation_time()?)?;
    target.set_modified_time(source.modified_time()?)
}

/// Whether `data` starts with the compound file signature.
pub fn is_compound_file(data: &[u8]) -> bool {
    data.len() >= HEADER_SIZE && data.starts_with(MAGIC)
}
