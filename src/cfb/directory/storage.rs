use std::ops::ControlFlow;
use std::rc::Rc;

use fixedbitset::FixedBitSet;
use tracing::warn;

use super::chain::DirectoryEntryChain;
use super::entry::{EntryRecord, ObjectType, name_key, validate_name};
use super::nodes::EntryNodes;
use super::{DirectoryEntry, Stream};
use crate::cfb::tree::{Color, NodeStore, RedBlackTree};
use crate::common::error::{Error, Result};

/// A storage (or the root storage) and the red-black tree of its children.
#[derive(Clone, Debug)]
pub struct Storage {
    chain: Rc<DirectoryEntryChain>,
    record: EntryRecord,
}

impl Storage {
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

    /// The underlying record, for CLSID, state bits and timestamps.
    pub fn record(&self) -> &EntryRecord {
        &self.record
    }

    pub fn is_root(&self) -> Result<bool> {
        self.record.is_root()
    }

    fn tree(&self) -> Result<RedBlackTree> {
        RedBlackTree::load(&EntryNodes::new(&self.chain), self.record.child()?)
    }

    /// Add an empty child storage.
    pub fn add_storage(&self, name: &str) -> Result<Storage> {
        let record = self.add_child(name, ObjectType::Storage, &[])?;
        Ok(Storage::new(Rc::clone(&self.chain), record))
    }

    /// Add a child stream holding `data`.
    pub fn add_stream(&self, name: &str, data: &[u8]) -> Result<Stream> {
        let record = self.add_child(name, ObjectType::Stream, data)?;
        Ok(Stream::new(Rc::clone(&self.chain), record))
    }

    fn add_child(&self, name: &str, object_type: ObjectType, data: &[u8]) -> Result<EntryRecord> {
        validate_name(name)?;
        let mut nodes = EntryNodes::new(&self.chain);
        let mut tree = self.tree()?;
        let key = name_key(name);
        let existing = tree.find(&nodes, |node| Ok(key.cmp(&self.chain.record(node)?.key()?)))?;
        if existing.is_some() {
            return Err(Error::DuplicateName(name.to_string()));
        }

        let record = self.chain.create_entry(name, object_type)?;
        if object_type == ObjectType::Stream {
            let start = self.chain.streams().set_data(data)?;
            record.set_starting_sector(start)?;
            record.set_stream_size(data.len() as u64)?;
        }
        if let Some(root) = tree.root() {
            nodes.set_color(root, Color::Black)?;
        }
        tree.insert(&mut nodes, record.sid())?;
        self.record.set_child(tree.root())?;
        Ok(record)
    }

    /// Visit the children in tree pre-order until `f` breaks.
    ///
    /// Each entry is visited at most once even if the stored links form a
    /// graph rather than a tree.
    pub fn each_child<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(DirectoryEntry) -> ControlFlow<()>,
    {
        let Some(top) = self.record.child()? else {
            return Ok(());
        };
        let mut visited = FixedBitSet::with_capacity(self.chain.len() as usize);
        let mut pending = vec![top];
        while let Some(sid) = pending.pop() {
            if sid >= self.chain.len() {
                return Err(Error::out_of_bounds(
                    "directory entry",
                    sid as usize,
                    self.chain.len() as usize,
                ));
            }
            if sid as usize >= visited.len() {
                visited.grow(sid as usize + 1);
            }
            if visited.put(sid as usize) {
                warn!(sid, parent = self.id(), "directory entry linked more than once");
                continue;
            }
            let record = self.chain.record(sid)?;
            let right = record.right_sibling()?;
            let left = record.left_sibling()?;
            if f(self.chain.entry(sid)?).is_break() {
                break;
            }
            pending.extend(right);
            pending.extend(left);
        }
        Ok(())
    }

    pub fn children(&self) -> Result<Vec<DirectoryEntry>> {
        let mut children = Vec::new();
        self.each_child(|entry| {
            children.push(entry);
            ControlFlow::Continue(())
        })?;
        Ok(children)
    }

    /// First child, in visiting order, matching `predicate`.
    pub fn find_child<P>(&self, mut predicate: P) -> Result<Option<DirectoryEntry>>
    where
        P: FnMut(&DirectoryEntry) -> bool,
    {
        let mut found = None;
        self.each_child(|entry| {
            if predicate(&entry) {
                found = Some(entry);
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;
        Ok(found)
    }

    pub fn find_children<P>(&self, mut predicate: P) -> Result<Vec<DirectoryEntry>>
    where
        P: FnMut(&DirectoryEntry) -> bool,
    {
        let mut found = Vec::new();
        self.each_child(|entry| {
            if predicate(&entry) {
                found.push(entry);
            }
            ControlFlow::Continue(())
        })?;
        Ok(found)
    }

    pub fn storages(&self) -> Result<Vec<Storage>> {
        Ok(self
            .children()?
            .into_iter()
            .filter_map(DirectoryEntry::into_storage)
            .collect())
    }

    pub fn streams(&self) -> Result<Vec<Stream>> {
        Ok(self
            .children()?
            .into_iter()
            .filter_map(DirectoryEntry::into_stream)
            .collect())
    }

    /// Direct child named `name`, compared case-insensitively.
    pub fn child(&self, name: &str) -> Result<Option<DirectoryEntry>> {
        let key = name_key(name);
        let found = self.tree()?.find(&EntryNodes::new(&self.chain), |node| {
            Ok(key.cmp(&self.chain.record(node)?.key()?))
        })?;
        found.map(|sid| self.chain.entry(sid)).transpose()
    }

    /// Storage reached by following `path` from this storage.
    pub fn storage_at<S: AsRef<str>>(&self, path: &[S]) -> Result<Storage> {
        let mut current = self.clone();
        for name in path {
            let name = name.as_ref();
            current = self
                .lookup(&current, name)?
                .into_storage()
                .ok_or_else(|| Error::NotFound(format!("{name} is not a storage")))?;
        }
        Ok(current)
    }

    /// Stream reached by following `path`; the last element names the stream.
    pub fn stream_at<S: AsRef<str>>(&self, path: &[S]) -> Result<Stream> {
        let Some((last, parents)) = path.split_last() else {
            return Err(Error::NotFound("empty stream path".to_string()));
        };
        let parent = self.storage_at(parents)?;
        let last = last.as_ref();
        self.lookup(&parent, last)?
            .into_stream()
            .ok_or_else(|| Error::NotFound(format!("{last} is not a stream")))
    }

    fn lookup(&self, parent: &Storage, name: &str) -> Result<DirectoryEntry> {
        parent
            .child(name)?
            .ok_or_else(|| Error::NotFound(format!("no entry named {name}")))
    }
}
