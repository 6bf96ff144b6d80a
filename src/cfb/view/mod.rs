//! Sliceable, mutable byte ranges over shared backings.
//!
//! Every structure above this module (header, sectors, tables, directory
//! entries, streams) addresses bytes only through these views.
//!
//! # Backings
//!
//! - [`SimpleView`]: one contiguous buffer, or a window over one.
//! - [`FixedSizeChunkedView`]: equally sized chunks; ranges must stay inside
//!   one chunk. Backs the sector array.
//! - [`VariableSizeChunkedView`]: a logical concatenation of other views.
//!   Presents a scattered sector chain as one stream.
//!
//! Subviews never copy: writes through any handle land in the shared backing.

mod fixed;
mod simple;
mod variable;

pub use fixed::FixedSizeChunkedView;
pub use simple::SimpleView;
pub use variable::VariableSizeChunkedView;

use crate::common::error::{Error, Result};

/// Any of the supported backings.
#[derive(Clone, Debug)]
pub enum ByteView {
    Simple(SimpleView),
    FixedSizeChunked(FixedSizeChunkedView),
    VariableSizeChunked(VariableSizeChunkedView),
}

impl ByteView {
    pub fn len(&self) -> usize {
        match self {
            ByteView::Simple(v) => v.len(),
            ByteView::FixedSizeChunked(v) => v.len(),
            ByteView::VariableSizeChunked(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        match self {
            ByteView::Simple(v) => v.to_vec(),
            ByteView::FixedSizeChunked(v) => v.to_vec(),
            ByteView::VariableSizeChunked(v) => v.to_vec(),
        }
    }

    /// Copy out `[start, end)`.
    pub fn read(&self, start: usize, end: usize) -> Result<Vec<u8>> {
        match self {
            ByteView::Simple(v) => v.read(start..end),
            _ => Ok(self.subview(start, Some(end))?.to_vec()),
        }
    }

    pub fn write_at(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        match self {
            ByteView::Simple(v) => v.write_at(offset, bytes),
            ByteView::FixedSizeChunked(v) => v.write_at(offset, bytes),
            ByteView::VariableSizeChunked(v) => v.write_at(offset, bytes),
        }
    }

    pub fn subview(&self, start: usize, end: Option<usize>) -> Result<ByteView> {
        match self {
            ByteView::Simple(v) => v.subview(start, end).map(ByteView::Simple),
            ByteView::FixedSizeChunked(v) => v.subview(start, end).map(ByteView::Simple),
            ByteView::VariableSizeChunked(v) => v.subview(start, end),
        }
    }

    pub fn fill(&self, pattern: &[u8]) -> Result<()> {
        match self {
            ByteView::Simple(v) => v.fill(pattern),
            ByteView::FixedSizeChunked(_) => {
                Err(Error::Unsupported("fill on a fixed-size chunked view"))
            },
            ByteView::VariableSizeChunked(v) => v.fill(pattern),
        }
    }

    /// Grow the backing by `len` bytes and return the new region.
    ///
    /// Only chunked backings can grow; windows and chains cannot.
    pub fn allocate(&self, len: usize) -> Result<ByteView> {
        match self {
            ByteView::FixedSizeChunked(v) => v.allocate(len).map(ByteView::Simple),
            ByteView::Simple(_) => Err(Error::Unsupported("allocate on a simple view")),
            ByteView::VariableSizeChunked(_) => {
                Err(Error::Unsupported("allocate on a variable-size chunked view"))
            },
        }
    }
}

impl From<SimpleView> for ByteView {
    fn from(view: SimpleView) -> Self {
        ByteView::Simple(view)
    }
}

impl From<FixedSizeChunkedView> for ByteView {
    fn from(view: FixedSizeChunkedView) -> Self {
        ByteView::FixedSizeChunked(view)
    }
}

impl From<VariableSizeChunkedView> for ByteView {
    fn from(view: VariableSizeChunkedView) -> Self {
        ByteView::VariableSizeChunked(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_operations() {
        let simple = ByteView::from(SimpleView::zeroed(8));
        assert!(matches!(simple.allocate(8), Err(Error::Unsupported(_))));

        let chained = ByteView::from(VariableSizeChunkedView::new(vec![SimpleView::zeroed(4)]));
        assert!(matches!(chained.allocate(4), Err(Error::Unsupported(_))));

        let chunked = ByteView::from(FixedSizeChunkedView::new(4));
        assert!(matches!(chunked.fill(&[0]), Err(Error::Unsupported(_))));
        assert_eq!(chunked.allocate(4).unwrap().len(), 4);
        assert_eq!(chunked.len(), 4);
    }

    #[test]
    fn test_read_through_any_backing() {
        let chunked = FixedSizeChunkedView::from_bytes(4, (0u8..8).collect()).unwrap();
        let view = ByteView::from(chunked.clone());
        assert_eq!(view.read(5, 7).unwrap(), vec![5, 6]);

        let chained = ByteView::from(VariableSizeChunkedView::new(vec![
            chunked.chunk(1).unwrap(),
            chunked.chunk(0).unwrap(),
        ]));
        assert_eq!(chained.read(2, 6).unwrap(), vec![6, 7, 0, 1]);
    }
}
