//! Ordered sequence of equally sized chunks; the backing for the sector array.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::SimpleView;
use crate::common::error::{Error, Result};

/// A growable list of `chunk_size`-byte chunks addressed as one byte range.
///
/// Ranges must stay inside one chunk. Clones share the chunk list, so a chunk
/// allocated through one handle is visible through all of them.
#[derive(Clone)]
pub struct FixedSizeChunkedView {
    chunk_size: usize,
    chunks: Rc<RefCell<Vec<SimpleView>>>,
}

impl FixedSizeChunkedView {
    /// An empty view with no chunks.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunks: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Split `bytes` into chunks. The chunks are windows over one buffer.
    pub fn from_bytes(chunk_size: usize, bytes: Vec<u8>) -> Result<Self> {
        if chunk_size == 0 || bytes.len() % chunk_size != 0 {
            return Err(Error::InvalidFormat(format!(
                "length {} is not a multiple of {}",
                bytes.len(),
                chunk_size
            )));
        }
        let backing = SimpleView::new(bytes);
        let chunks = (0..backing.len() / chunk_size)
            .map(|i| backing.subview(i * chunk_size, Some((i + 1) * chunk_size)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            chunk_size,
            chunks: Rc::new(RefCell::new(chunks)),
        })
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.borrow().len()
    }

    pub fn chunk(&self, index: usize) -> Result<SimpleView> {
        self.chunks
            .borrow()
            .get(index)
            .cloned()
            .ok_or_else(|| Error::out_of_bounds("chunk", index, self.chunk_count()))
    }

    pub fn len(&self) -> usize {
        self.chunk_count() * self.chunk_size
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_count() == 0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let chunks = self.chunks.borrow();
        let mut out = Vec::with_capacity(chunks.len() * self.chunk_size);
        for chunk in chunks.iter() {
            chunk.with_bytes(|b| out.extend_from_slice(b));
        }
        out
    }

    /// A window enclosed by a single chunk; `end` is mandatory.
    pub fn subview(&self, start: usize, end: Option<usize>) -> Result<SimpleView> {
        let end = end.ok_or(Error::Unsupported(
            "open-ended subview of a fixed-size chunked view",
        ))?;
        if start >= end {
            return Err(Error::out_of_bounds("subview start", start, end));
        }
        let index = start / self.chunk_size;
        if index != (end - 1) / self.chunk_size {
            return Err(Error::Unsupported(
                "subview must be enclosed by one chunk",
            ));
        }
        let base = index * self.chunk_size;
        self.chunk(index)?.subview(start - base, Some(end - base))
    }

    pub fn write_at(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.subview(offset, Some(offset + bytes.len()))?
            .write_at(0, bytes)
    }

    /// Append one zeroed chunk. `len` must equal the chunk size.
    pub fn allocate(&self, len: usize) -> Result<SimpleView> {
        if len != self.chunk_size {
            return Err(Error::Unsupported(
                "allocation length must equal the chunk size",
            ));
        }
        let chunk = SimpleView::zeroed(len);
        self.chunks.borrow_mut().push(chunk.clone());
        Ok(chunk)
    }
}

impl fmt::Debug for FixedSizeChunkedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedSizeChunkedView")
            .field("chunk_size", &self.chunk_size)
            .field("chunks", &self.chunk_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_requires_whole_chunks() {
        assert!(FixedSizeChunkedView::from_bytes(512, vec![0; 1000]).is_err());
        let view = FixedSizeChunkedView::from_bytes(512, vec![0; 1024]).unwrap();
        assert_eq!(view.chunk_count(), 2);
        assert_eq!(view.len(), 1024);
    }

    #[test]
    fn test_subview_enclosed_by_one_chunk() {
        let view = FixedSizeChunkedView::from_bytes(16, (0u8..48).collect()).unwrap();
        let sub = view.subview(20, Some(32)).unwrap();
        assert_eq!(sub.to_vec(), (20u8..32).collect::<Vec<_>>());
        assert!(view.subview(10, Some(20)).is_err());
        assert!(view.subview(10, None).is_err());
        assert!(view.subview(5, Some(5)).is_err());
    }

    #[test]
    fn test_allocate_appends_chunk() {
        let view = FixedSizeChunkedView::new(16);
        assert!(view.allocate(8).is_err());
        let chunk = view.allocate(16).unwrap();
        chunk.fill(&[7]).unwrap();
        let other = view.clone();
        assert_eq!(other.chunk_count(), 1);
        assert_eq!(other.to_vec(), vec![7; 16]);
        view.write_at(4, &[1, 2]).unwrap();
        assert_eq!(chunk.read(4..6).unwrap(), vec![1, 2]);
    }
}
