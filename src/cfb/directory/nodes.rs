use std::cmp::Ordering;

use super::chain::DirectoryEntryChain;
use crate::cfb::tree::{Color, NodeStore};
use crate::common::error::Result;

/// Directory entries seen as red-black tree nodes: left/right siblings are
/// the child links and the color flag is the node color.
pub(crate) struct EntryNodes<'a> {
    chain: &'a DirectoryEntryChain,
}

impl<'a> EntryNodes<'a> {
    pub(crate) fn new(chain: &'a DirectoryEntryChain) -> Self {
        Self { chain }
    }
}

impl NodeStore for EntryNodes<'_> {
    fn left(&self, node: u32) -> Result<Option<u32>> {
        self.chain.record(node)?.left_sibling()
    }

    fn right(&self, node: u32) -> Result<Option<u32>> {
        self.chain.record(node)?.right_sibling()
    }

    fn set_left(&mut self, node: u32, child: Option<u32>) -> Result<()> {
        self.chain.record(node)?.set_left_sibling(child)
    }

    fn set_right(&mut self, node: u32, child: Option<u32>) -> Result<()> {
        self.chain.record(node)?.set_right_sibling(child)
    }

    fn color(&self, node: u32) -> Result<Color> {
        self.chain.record(node)?.color()
    }

    fn set_color(&mut self, node: u32, color: Color) -> Result<()> {
        self.chain.record(node)?.set_color(color)
    }

    fn compare(&self, a: u32, b: u32) -> Result<Ordering> {
        Ok(self.chain.record(a)?.key()?.cmp(&self.chain.record(b)?.key()?))
    }

    fn label(&self, node: u32) -> String {
        self.chain
            .record(node)
            .and_then(|record| record.name())
            .unwrap_or_else(|_| node.to_string())
    }
}
