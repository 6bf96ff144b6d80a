use super::engine::{RedBlackTree, missing};
use super::{Color, NodeStore};
use crate::common::error::Result;

impl RedBlackTree {
    /// Unlink `node` from the tree and rebalance.
    ///
    /// The node itself stays in the store; its links are not cleared.
    pub fn delete<S: NodeStore + ?Sized>(&mut self, store: &mut S, node: u32) -> Result<()> {
        let left = store.left(node)?;
        let right = store.right(node)?;
        match (left, right) {
            (None, None) => self.delete_leaf(store, node),
            (Some(left), Some(_)) => {
                let predecessor = Self::rightmost(store, left)?;
                self.swap(store, node, predecessor)?;
                self.delete(store, node)
            },
            (Some(child), None) | (None, Some(child)) => self.delete_with_child(store, node, child),
        }
    }

    fn delete_leaf<S: NodeStore + ?Sized>(&mut self, store: &mut S, node: u32) -> Result<()> {
        let Some(parent) = self.parent(node) else {
            self.set_root(None);
            return Ok(());
        };
        if store.color(node)? == Color::Black {
            let sibling = self.sibling(store, node)?;
            Self::unlink_child(store, parent, node)?;
            self.recover(store, sibling.ok_or_else(|| missing("sibling", node))?)
        } else {
            Self::unlink_child(store, parent, node)
        }
    }

    fn delete_with_child<S: NodeStore + ?Sized>(
        &mut self,
        store: &mut S,
        node: u32,
        child: u32,
    ) -> Result<()> {
        let Some(parent) = self.parent(node) else {
            self.set_root(Some(child));
            return store.set_color(child, Color::Black);
        };
        if store.color(child)? == Color::Red || store.color(node)? == Color::Red {
            self.substitute(store, parent, node, child)?;
            store.set_color(child, Color::Black)
        } else {
            let sibling = self.sibling(store, node)?;
            self.substitute(store, parent, node, child)?;
            self.recover(store, sibling.ok_or_else(|| missing("sibling", node))?)
        }
    }

    fn unlink_child<S: NodeStore + ?Sized>(store: &mut S, parent: u32, node: u32) -> Result<()> {
        if Self::is_left_child(store, parent, node)? {
            store.set_left(parent, None)
        } else if Self::is_right_child(store, parent, node)? {
            store.set_right(parent, None)
        } else {
            Ok(())
        }
    }

    fn rightmost<S: NodeStore + ?Sized>(store: &S, mut node: u32) -> Result<u32> {
        while let Some(right) = store.right(node)? {
            node = right;
        }
        Ok(node)
    }

    /// Delete fixup starting from the sibling of the removed black node.
    fn recover<S: NodeStore + ?Sized>(&mut self, store: &mut S, sibling: u32) -> Result<()> {
        let parent = self.parent(sibling).ok_or_else(|| missing("parent", sibling))?;
        let sibling_left = store.left(sibling)?;
        let sibling_right = store.right(sibling)?;
        let left_color = Self::color_of(store, sibling_left)?;
        let right_color = Self::color_of(store, sibling_right)?;
        let sibling_is_left = Self::is_left_child(store, parent, sibling)?;

        if store.color(sibling)? == Color::Red {
            // The rotation's color swap leaves the sibling black and the parent red.
            let next = if sibling_is_left {
                self.right_rotate(store, parent, sibling)?;
                sibling_right
            } else {
                self.left_rotate(store, parent, sibling)?;
                sibling_left
            };
            return self.recover(store, next.ok_or_else(|| missing("nephew", sibling))?);
        }

        if left_color == Color::Black && right_color == Color::Black {
            store.set_color(sibling, Color::Red)?;
            if store.color(parent)? == Color::Black && self.root() != Some(parent) {
                let uncle = self.sibling(store, parent)?;
                return self.recover(store, uncle.ok_or_else(|| missing("sibling", parent))?);
            }
            return store.set_color(parent, Color::Black);
        }

        match (sibling_is_left, sibling_left, sibling_right) {
            (true, Some(outer), _) if left_color == Color::Red => {
                self.right_rotate(store, parent, sibling)?;
                store.set_color(outer, Color::Black)
            },
            (true, _, Some(inner)) => {
                self.left_rotate(store, sibling, inner)?;
                let grandparent = self
                    .grandparent(sibling)
                    .ok_or_else(|| missing("grandparent", sibling))?;
                let new_parent = self.parent(sibling).ok_or_else(|| missing("parent", sibling))?;
                self.right_rotate(store, grandparent, new_parent)?;
                store.set_color(sibling, Color::Black)
            },
            (false, _, Some(outer)) if right_color == Color::Red => {
                self.left_rotate(store, parent, sibling)?;
                store.set_color(outer, Color::Black)
            },
            (false, Some(inner), _) => {
                self.right_rotate(store, sibling, inner)?;
                let grandparent = self
                    .grandparent(sibling)
                    .ok_or_else(|| missing("grandparent", sibling))?;
                let new_parent = self.parent(sibling).ok_or_else(|| missing("parent", sibling))?;
                self.left_rotate(store, grandparent, new_parent)?;
                store.set_color(sibling, Color::Black)
            },
            _ => Err(missing("red child", sibling)),
        }
    }

    /// Exchange the tree positions and colors of two nodes.
    fn swap<S: NodeStore + ?Sized>(&mut self, store: &mut S, a: u32, b: u32) -> Result<()> {
        if self.parent(a) == Some(b) {
            return self.swap_child_parent(store, b, a);
        }
        if self.parent(b) == Some(a) {
            return self.swap_child_parent(store, a, b);
        }
        let a_parent = self.parent(a);
        let a_left = store.left(a)?;
        let a_right = store.right(a)?;
        let b_parent = self.parent(b);
        let b_left = store.left(b)?;
        let b_right = store.right(b)?;
        self.link_left(store, a, b_left)?;
        self.link_right(store, a, b_right)?;
        self.link_left(store, b, a_left)?;
        self.link_right(store, b, a_right)?;
        Self::swap_color(store, a, b)?;
        match a_parent {
            None => self.set_root(Some(b)),
            Some(parent) => self.substitute(store, parent, a, b)?,
        }
        match b_parent {
            None => self.set_root(Some(a)),
            Some(parent) => self.substitute(store, parent, b, a)?,
        }
        Ok(())
    }

    fn swap_child_parent<S: NodeStore + ?Sized>(
        &mut self,
        store: &mut S,
        parent: u32,
        child: u32,
    ) -> Result<()> {
        let parent_color = store.color(parent)?;
        let child_color = store.color(child)?;
        let child_left = store.left(child)?;
        let child_right = store.right(child)?;
        match self.parent(parent) {
            None => self.set_root(Some(child)),
            Some(grandparent) if Self::is_left_child(store, grandparent, parent)? => {
                self.link_left(store, grandparent, Some(child))?
            },
            Some(grandparent) => self.link_right(store, grandparent, Some(child))?,
        }
        if Self::is_left_child(store, parent, child)? {
            let sibling = store.right(parent)?;
            self.link_left(store, child, Some(parent))?;
            self.link_right(store, child, sibling)?;
        } else {
            let sibling = store.left(parent)?;
            self.link_right(store, child, Some(parent))?;
            self.link_left(store, child, sibling)?;
        }
        store.set_color(child, parent_color)?;
        self.link_left(store, parent, child_left)?;
        self.link_right(store, parent, child_right)?;
        store.set_color(parent, child_color)
    }
}
