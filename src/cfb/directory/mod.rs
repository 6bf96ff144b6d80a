//! Directory entries and the storage/stream hierarchy.
//!
//! Every storage keeps its children in a red-black tree whose links are the
//! children's left/right sibling fields; the storage's child field points at
//! the tree root. Handles ([`Storage`], [`Stream`]) are cheap views onto the
//! shared [`DirectoryEntryChain`].

mod chain;
mod entry;
mod nodes;
mod storage;
mod stream;

use std::rc::Rc;

use fixedbitset::FixedBitSet;

pub use chain::DirectoryEntryChain;
pub use entry::{
    EntryRecord, NameKey, ObjectType, ROOT_ID, compare_names, datetime_to_filetime,
    filetime_to_datetime, name_key, validate_name,
};
pub use storage::Storage;
pub use stream::Stream;

use crate::common::error::{Error, Result};

/// A directory entry, typed by its stored object type.
#[derive(Clone, Debug)]
pub enum DirectoryEntry {
    Root(Storage),
    Storage(Storage),
    Stream(Stream),
}

impl DirectoryEntry {
    pub fn id(&self) -> u32 {
        self.record().sid()
    }

    pub fn name(&self) -> Result<String> {
        self.record().name()
    }

    pub fn record(&self) -> &EntryRecord {
        match self {
            DirectoryEntry::Root(storage) | DirectoryEntry::Storage(storage) => storage.record(),
            DirectoryEntry::Stream(stream) => stream.record(),
        }
    }

    fn chain(&self) -> &Rc<DirectoryEntryChain> {
        match self {
            DirectoryEntry::Root(storage) | DirectoryEntry::Storage(storage) => storage.chain(),
            DirectoryEntry::Stream(stream) => stream.chain(),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            DirectoryEntry::Root(_) => ObjectType::Root,
            DirectoryEntry::Storage(_) => ObjectType::Storage,
            DirectoryEntry::Stream(_) => ObjectType::Stream,
        }
    }

    pub fn as_storage(&self) -> Option<&Storage> {
        match self {
            DirectoryEntry::Root(storage) | DirectoryEntry::Storage(storage) => Some(storage),
            DirectoryEntry::Stream(_) => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            DirectoryEntry::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn into_storage(self) -> Option<Storage> {
        match self {
            DirectoryEntry::Root(storage) | DirectoryEntry::Storage(storage) => Some(storage),
            DirectoryEntry::Stream(_) => None,
        }
    }

    pub fn into_stream(self) -> Option<Stream> {
        match self {
            DirectoryEntry::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    /// Pre-order walk over this entry and everything its sibling and child
    /// links reach: self, left, right, child. Each id is visited once.
    pub fn traverse<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&DirectoryEntry),
    {
        let chain = self.chain();
        let mut visited = FixedBitSet::with_capacity(chain.len() as usize);
        let mut pending = vec![self.id()];
        while let Some(sid) = pending.pop() {
            if sid >= chain.len() {
                return Err(Error::out_of_bounds(
                    "directory entry",
                    sid as usize,
                    chain.len() as usize,
                ));
            }
            if sid as usize >= visited.len() {
                visited.grow(sid as usize + 1);
            }
            if visited.put(sid as usize) {
                continue;
            }
            let entry = chain.entry(sid)?;
            let record = entry.record();
            let links = [record.child()?, record.right_sibling()?, record.left_sibling()?];
            f(&entry);
            pending.extend(links.into_iter().flatten());
        }
        Ok(())
    }
}
