//! Contiguous byte buffer and zero-copy windows over it.

use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use crate::common::binary::{
    read_u16_le, read_u32_le, read_u64_le, u16_le_bytes, u32_le_bytes, u64_le_bytes,
};
use crate::common::error::{Error, Result};

/// A window `[start, end)` over a shared, growable-in-place buffer.
///
/// Cloning a `SimpleView` or taking a [`subview`](Self::subview) never copies
/// bytes: every handle writes through to the same backing buffer.
#[derive(Clone)]
pub struct SimpleView {
    buf: Rc<RefCell<Vec<u8>>>,
    start: usize,
    end: usize,
}

impl SimpleView {
    /// Wrap an owned buffer.
    pub fn new(bytes: Vec<u8>) -> Self {
        let end = bytes.len();
        Self {
            buf: Rc::new(RefCell::new(bytes)),
            start: 0,
            end,
        }
    }

    /// A zero-filled buffer of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self::new(vec![0u8; len])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn absolute(&self, offset: usize, len: usize) -> Result<Range<usize>> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.len())
            .ok_or_else(|| {
                Error::out_of_bounds("view range", offset.saturating_add(len), self.len())
            })?;
        Ok(self.start + offset..self.start + end)
    }

    /// Copy out the whole window.
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.borrow()[self.start..self.end].to_vec()
    }

    /// Copy out `range`, relative to this window.
    pub fn read(&self, range: Range<usize>) -> Result<Vec<u8>> {
        if range.start > range.end {
            return Err(Error::out_of_bounds("view range", range.start, range.end));
        }
        let abs = self.absolute(range.start, range.end - range.start)?;
        Ok(self.buf.borrow()[abs].to_vec())
    }

    /// Run `f` over the window without copying.
    pub fn with_bytes<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T {
        f(&self.buf.borrow()[self.start..self.end])
    }

    pub fn write_at(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        let abs = self.absolute(offset, bytes.len())?;
        self.buf.borrow_mut()[abs].copy_from_slice(bytes);
        Ok(())
    }

    /// A narrower window sharing this backing. `end` defaults to the window end.
    pub fn subview(&self, start: usize, end: Option<usize>) -> Result<SimpleView> {
        let end = end.unwrap_or(self.len());
        if start > end {
            return Err(Error::out_of_bounds("subview start", start, end));
        }
        if end > self.len() {
            return Err(Error::out_of_bounds("subview end", end, self.len()));
        }
        Ok(Self {
            buf: Rc::clone(&self.buf),
            start: self.start + start,
            end: self.start + end,
        })
    }

    /// Repeat `pattern` over the whole window.
    pub fn fill(&self, pattern: &[u8]) -> Result<()> {
        if pattern.is_empty() || self.len() % pattern.len() != 0 {
            return Err(Error::Unsupported("fill pattern must evenly divide the view"));
        }
        let mut buf = self.buf.borrow_mut();
        for chunk in buf[self.start..self.end].chunks_exact_mut(pattern.len()) {
            chunk.copy_from_slice(pattern);
        }
        Ok(())
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        let abs = self.absolute(offset, 1)?;
        Ok(self.buf.borrow()[abs.start])
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16> {
        Ok(self.with_bytes(|b| read_u16_le(b, offset))?)
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        Ok(self.with_bytes(|b| read_u32_le(b, offset))?)
    }

    pub fn u64_at(&self, offset: usize) -> Result<u64> {
        Ok(self.with_bytes(|b| read_u64_le(b, offset))?)
    }

    pub fn set_u8(&self, offset: usize, value: u8) -> Result<()> {
        self.write_at(offset, &[value])
    }

    pub fn set_u16(&self, offset: usize, value: u16) -> Result<()> {
        self.write_at(offset, &u16_le_bytes(value))
    }

    pub fn set_u32(&self, offset: usize, value: u32) -> Result<()> {
        self.write_at(offset, &u32_le_bytes(value))
    }

    pub fn set_u64(&self, offset: usize, value: u64) -> Result<()> {
        self.write_at(offset, &u64_le_bytes(value))
    }
}

impl fmt::Debug for SimpleView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleView")
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subview_shares_backing() {
        let view = SimpleView::zeroed(16);
        let sub = view.subview(4, Some(8)).unwrap();
        sub.write_at(0, &[1, 2, 3, 4]).unwrap();
        assert_eq!(view.read(4..8).unwrap(), vec![1, 2, 3, 4]);

        let nested = sub.subview(2, None).unwrap();
        assert_eq!(nested.len(), 2);
        nested.set_u16(0, 0xBEEF).unwrap();
        assert_eq!(view.u16_at(6).unwrap(), 0xBEEF);
    }

    #[test]
    fn test_bounds_are_checked() {
        let view = SimpleView::zeroed(8);
        assert!(view.write_at(6, &[0; 3]).is_err());
        assert!(view.subview(2, Some(9)).is_err());
        assert!(view.subview(5, Some(4)).is_err());
        assert!(view.read(0..9).is_err());
        assert!(view.u32_at(5).is_err());
        assert!(view.u8_at(8).is_err());
    }

    #[test]
    fn test_fill_repeats_pattern() {
        let view = SimpleView::zeroed(8);
        view.fill(&[0xAB, 0xCD]).unwrap();
        assert_eq!(view.to_vec(), vec![0xAB, 0xCD, 0xAB, 0xCD, 0xAB, 0xCD, 0xAB, 0xCD]);
        assert!(view.fill(&[1, 2, 3]).is_err());
        assert!(view.fill(&[]).is_err());
    }

    #[test]
    fn test_typed_accessors() {
        let view = SimpleView::zeroed(16);
        view.set_u32(0, 0xFFFF_FFFE).unwrap();
        view.set_u64(8, 4096).unwrap();
        view.set_u8(4, 5).unwrap();
        assert_eq!(view.u32_at(0).unwrap(), 0xFFFF_FFFE);
        assert_eq!(view.u64_at(8).unwrap(), 4096);
        assert_eq!(view.u8_at(4).unwrap(), 5);
    }
}
