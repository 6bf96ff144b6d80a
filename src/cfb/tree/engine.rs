use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::{Color, NodeStore};
use crate::common::error::{Error, Result};

/// Red-black tree state: the root id and derived parent links.
#[derive(Debug, Clone, Default)]
pub struct RedBlackTree {
    root: Option<u32>,
    parents: HashMap<u32, u32>,
}

impl RedBlackTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild parent links for the tree stored under `root`.
    pub fn load<S: NodeStore + ?Sized>(store: &S, root: Option<u32>) -> Result<Self> {
        let mut tree = Self {
            root,
            parents: HashMap::new(),
        };
        let Some(root) = root else {
            return Ok(tree);
        };
        let mut visited = HashSet::new();
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            if !visited.insert(node) {
                return Err(Error::Structure(format!(
                    "tree node {node} is referenced more than once"
                )));
            }
            for child in [store.left(node)?, store.right(node)?].into_iter().flatten() {
                tree.parents.insert(child, node);
                pending.push(child);
            }
        }
        Ok(tree)
    }

    #[inline]
    pub fn root(&self) -> Option<u32> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn parent(&self, node: u32) -> Option<u32> {
        if self.root == Some(node) {
            None
        } else {
            self.parents.get(&node).copied()
        }
    }

    /// Locate the node for which `probe` reports `Equal`.
    ///
    /// `probe(node)` orders the searched key relative to `node`.
    pub fn find<S, F>(&self, store: &S, mut probe: F) -> Result<Option<u32>>
    where
        S: NodeStore + ?Sized,
        F: FnMut(u32) -> Result<Ordering>,
    {
        let mut current = self.root;
        while let Some(node) = current {
            current = match probe(node)? {
                Ordering::Equal => return Ok(Some(node)),
                Ordering::Greater => store.right(node)?,
                Ordering::Less => store.left(node)?,
            };
        }
        Ok(None)
    }

    /// Validate ordering, coloring and black height. Returns the black height.
    pub fn check_invariants<S: NodeStore + ?Sized>(&self, store: &S) -> Result<usize> {
        let Some(root) = self.root else {
            return Ok(0);
        };
        if store.color(root)? != Color::Black {
            return Err(Error::Structure("root is red".to_string()));
        }
        self.check_subtree(store, root)
    }

    fn check_subtree<S: NodeStore + ?Sized>(&self, store: &S, node: u32) -> Result<usize> {
        let color = store.color(node)?;
        let mut heights = [0usize; 2];
        for (slot, child) in [store.left(node)?, store.right(node)?].into_iter().enumerate() {
            let Some(child) = child else {
                continue;
            };
            if color == Color::Red && store.color(child)? == Color::Red {
                return Err(Error::Structure(format!("red node {node} has red child {child}")));
            }
            let expected = if slot == 0 { Ordering::Less } else { Ordering::Greater };
            if store.compare(child, node)? != expected {
                return Err(Error::Structure(format!("child {child} of {node} is out of order")));
            }
            heights[slot] = self.check_subtree(store, child)?;
        }
        if heights[0] != heights[1] {
            return Err(Error::Structure(format!(
                "black heights differ below {node}: {} vs {}",
                heights[0], heights[1]
            )));
        }
        Ok(heights[0] + usize::from(color == Color::Black))
    }

    pub(super) fn set_root(&mut self, node: Option<u32>) {
        self.root = node;
        if let Some(node) = node {
            self.parents.remove(&node);
        }
    }

    pub(super) fn link_left<S: NodeStore + ?Sized>(
        &mut self,
        store: &mut S,
        node: u32,
        child: Option<u32>,
    ) -> Result<()> {
        store.set_left(node, child)?;
        if let Some(child) = child {
            self.parents.insert(child, node);
        }
        Ok(())
    }

    pub(super) fn link_right<S: NodeStore + ?Sized>(
        &mut self,
        store: &mut S,
        node: u32,
        child: Option<u32>,
    ) -> Result<()> {
        store.set_right(node, child)?;
        if let Some(child) = child {
            self.parents.insert(child, node);
        }
        Ok(())
    }

    pub(super) fn is_left_child<S: NodeStore + ?Sized>(
        store: &S,
        parent: u32,
        node: u32,
    ) -> Result<bool> {
        Ok(store.left(parent)? == Some(node))
    }

    pub(super) fn is_right_child<S: NodeStore + ?Sized>(
        store: &S,
        parent: u32,
        node: u32,
    ) -> Result<bool> {
        Ok(store.right(parent)? == Some(node))
    }

    /// Replace `node` with `substitute` under `parent`.
    pub(super) fn substitute<S: NodeStore + ?Sized>(
        &mut self,
        store: &mut S,
        parent: u32,
        node: u32,
        substitute: u32,
    ) -> Result<()> {
        if Self::is_right_child(store, parent, node)? {
            self.link_right(store, parent, Some(substitute))
        } else if Self::is_left_child(store, parent, node)? {
            self.link_left(store, parent, Some(substitute))
        } else {
            Ok(())
        }
    }

    pub(super) fn grandparent(&self, node: u32) -> Option<u32> {
        self.parent(node).and_then(|parent| self.parent(parent))
    }

    pub(super) fn sibling<S: NodeStore + ?Sized>(
        &self,
        store: &S,
        node: u32,
    ) -> Result<Option<u32>> {
        let Some(parent) = self.parent(node) else {
            return Ok(None);
        };
        if Self::is_left_child(store, parent, node)? {
            store.right(parent)
        } else {
            store.left(parent)
        }
    }

    pub(super) fn uncle<S: NodeStore + ?Sized>(&self, store: &S, node: u32) -> Result<Option<u32>> {
        match self.parent(node) {
            Some(parent) => self.sibling(store, parent),
            None => Ok(None),
        }
    }

    /// Color of an optional node; absent leaves are black.
    pub(super) fn color_of<S: NodeStore + ?Sized>(store: &S, node: Option<u32>) -> Result<Color> {
        match node {
            Some(node) => store.color(node),
            None => Ok(Color::Black),
        }
    }

    pub(super) fn swap_color<S: NodeStore + ?Sized>(store: &mut S, a: u32, b: u32) -> Result<()> {
        let color_a = store.color(a)?;
        let color_b = store.color(b)?;
        store.set_color(a, color_b)?;
        store.set_color(b, color_a)
    }

    /// Rotate `pivot`, the left child of `subtree_root`, into its place.
    ///
    /// The two nodes swap colors.
    pub(super) fn right_rotate<S: NodeStore + ?Sized>(
        &mut self,
        store: &mut S,
        subtree_root: u32,
        pivot: u32,
    ) -> Result<()> {
        let parent = self.parent(subtree_root);
        let was_left = match parent {
            Some(parent) => Self::is_left_child(store, parent, subtree_root)?,
            None => false,
        };
        let inner = store.right(pivot)?;
        self.link_left(store, subtree_root, inner)?;
        self.link_right(store, pivot, Some(subtree_root))?;
        match parent {
            None => self.set_root(Some(pivot)),
            Some(parent) if was_left => self.link_left(store, parent, Some(pivot))?,
            Some(parent) => self.link_right(store, parent, Some(pivot))?,
        }
        Self::swap_color(store, subtree_root, pivot)
    }

    /// Rotate `pivot`, the right child of `subtree_root`, into its place.
    ///
    /// The two nodes swap colors.
    pub(super) fn left_rotate<S: NodeStore + ?Sized>(
        &mut self,
        store: &mut S,
        subtree_root: u32,
        pivot: u32,
    ) -> Result<()> {
        let parent = self.parent(subtree_root);
        let was_left = match parent {
            Some(parent) => Self::is_left_child(store, parent, subtree_root)?,
            None => false,
        };
        let inner = store.left(pivot)?;
        self.link_right(store, subtree_root, inner)?;
        self.link_left(store, pivot, Some(subtree_root))?;
        match parent {
            None => self.set_root(Some(pivot)),
            Some(parent) if was_left => self.link_left(store, parent, Some(pivot))?,
            Some(parent) => self.link_right(store, parent, Some(pivot))?,
        }
        Self::swap_color(store, subtree_root, pivot)
    }
}

pub(super) fn missing(what: &str, node: u32) -> Error {
    Error::Structure(format!("tree node {node} has no {what}"))
}
