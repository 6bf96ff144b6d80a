use std::cmp::Ordering;

use super::engine::{RedBlackTree, missing};
use super::{Color, NodeStore};
use crate::common::error::{Error, Result};

impl RedBlackTree {
    /// Insert `node`, already present in the store, and rebalance.
    ///
    /// Fails with [`Error::DuplicateName`] if a node with an equal key exists;
    /// the tree is left untouched in that case.
    pub fn insert<S: NodeStore + ?Sized>(&mut self, store: &mut S, node: u32) -> Result<()> {
        self.place(store, node)?;
        let at_top = self.root() == Some(node)
            || self.parent(node).is_some_and(|parent| self.root() == Some(parent));
        if !at_top {
            self.fix_red_red(store, node)?;
        }
        Ok(())
    }

    fn place<S: NodeStore + ?Sized>(&mut self, store: &mut S, node: u32) -> Result<()> {
        let Some(mut current) = self.root() else {
            Self::reset_leaf(store, node, Color::Black)?;
            self.set_root(Some(node));
            return Ok(());
        };
        loop {
            match store.compare(node, current)? {
                Ordering::Equal => return Err(Error::DuplicateName(store.label(node))),
                Ordering::Less => match store.left(current)? {
                    Some(left) => current = left,
                    None => {
                        Self::reset_leaf(store, node, Color::Red)?;
                        return self.link_left(store, current, Some(node));
                    },
                },
                Ordering::Greater => match store.right(current)? {
                    Some(right) => current = right,
                    None => {
                        Self::reset_leaf(store, node, Color::Red)?;
                        return self.link_right(store, current, Some(node));
                    },
                },
            }
        }
    }

    fn reset_leaf<S: NodeStore + ?Sized>(store: &mut S, node: u32, color: Color) -> Result<()> {
        store.set_left(node, None)?;
        store.set_right(node, None)?;
        store.set_color(node, color)
    }

    fn fix_red_red<S: NodeStore + ?Sized>(&mut self, store: &mut S, node: u32) -> Result<()> {
        let mut grandchild = Some(node);
        while let Some(child) = grandchild {
            let Some(parent) = self.parent(child) else {
                break;
            };
            if store.color(child)? != Color::Red || store.color(parent)? != Color::Red {
                break;
            }
            let uncle = self.uncle(store, child)?;
            match Self::color_of(store, uncle)? {
                Color::Black => self.rotate_subtree(store, child)?,
                Color::Red => self.recolor_around(store, child)?,
            }
            grandchild = self.grandparent(child);
        }
        Ok(())
    }

    fn rotate_subtree<S: NodeStore + ?Sized>(
        &mut self,
        store: &mut S,
        grandchild: u32,
    ) -> Result<()> {
        let parent = self.parent(grandchild).ok_or_else(|| missing("parent", grandchild))?;
        let grandparent = self.parent(parent).ok_or_else(|| missing("grandparent", grandchild))?;
        let parent_is_left = Self::is_left_child(store, grandparent, parent)?;
        let child_is_left = Self::is_left_child(store, parent, grandchild)?;
        match (parent_is_left, child_is_left) {
            (true, true) => self.right_rotate(store, grandparent, parent),
            (true, false) => {
                self.left_rotate(store, parent, grandchild)?;
                self.right_rotate(store, grandparent, grandchild)?;
                store.set_color(grandchild, Color::Black)?;
                store.set_color(grandparent, Color::Red)
            },
            (false, false) => self.left_rotate(store, grandparent, parent),
            (false, true) => {
                self.right_rotate(store, parent, grandchild)?;
                self.left_rotate(store, grandparent, grandchild)?;
                store.set_color(grandchild, Color::Black)?;
                store.set_color(grandparent, Color::Red)
            },
        }
    }

    fn recolor_around<S: NodeStore + ?Sized>(
        &mut self,
        store: &mut S,
        grandchild: u32,
    ) -> Result<()> {
        if let Some(uncle) = self.uncle(store, grandchild)? {
            store.set_color(uncle, Color::Black)?;
        }
        if let Some(parent) = self.parent(grandchild) {
            store.set_color(parent, Color::Black)?;
        }
        if let Some(grandparent) = self.grandparent(grandchild) {
            let color = if self.root() == Some(grandparent) {
                Color::Black
            } else {
                Color::Red
            };
            store.set_color(grandparent, color)?;
        }
        Ok(())
    }
}
