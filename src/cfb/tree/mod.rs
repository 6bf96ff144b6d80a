//! Red-black tree engine over an id-addressed node store.
//!
//! Nodes are plain `u32` ids. Child links and colors live in the store
//! (for directory entries, in the entry bytes themselves), so every
//! rotation or recoloring is written through immediately. Parent links are
//! derived and kept only in the engine.

mod delete;
mod engine;
mod insert;


use std::cmp::Ordering;

pub use engine::RedBlackTree;

use crate::common::error::Result;

/// Node color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub fn from_flag(flag: u8) -> Self {
        if flag == crate::cfb::consts::COLOR_BLACK {
            Color::Black
        } else {
            Color::Red
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            Color::Red => crate::cfb::consts::COLOR_RED,
            Color::Black => crate::cfb::consts::COLOR_BLACK,
        }
    }
}

/// Storage of child links, colors and ordering for tree nodes.
pub trait NodeStore {
    fn left(&self, node: u32) -> Result<Option<u32>>;

    fn right(&self, node: u32) -> Result<Option<u32>>;

    fn set_left(&mut self, node: u32, child: Option<u32>) -> Result<()>;

    fn set_right(&mut self, node: u32, child: Option<u32>) -> Result<()>;

    fn color(&self, node: u32) -> Result<Color>;

    fn set_color(&mut self, node: u32, color: Color) -> Result<()>;

    /// Order of `a` relative to `b`.
    fn compare(&self, a: u32, b: u32) -> Result<Ordering>;

    /// Human-readable key of `node`, used in error messages.
    fn label(&self, node: u32) -> String {
        node.to_string()
    }
}
