//! Logical contiguous view over a scattered list of views.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::{ByteView, SimpleView};
use crate::common::error::{Error, Result};

/// Concatenation of heterogeneously sized views, keyed by cumulative offset.
///
/// Stream chains are presented through this type: each sector (or mini
/// sector) of the chain is one part, and writes or subviews may span parts.
#[derive(Clone, Debug, Default)]
pub struct VariableSizeChunkedView {
    /// Start offset of each part -> part
    parts: BTreeMap<usize, ByteView>,
    len: usize,
}

impl VariableSizeChunkedView {
    pub fn new<I>(views: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ByteView>,
    {
        let mut parts = BTreeMap::new();
        let mut len = 0;
        for view in views {
            let view = view.into();
            if view.is_empty() {
                continue;
            }
            let view_len = view.len();
            parts.insert(len, view);
            len += view_len;
        }
        Self { parts, len }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Part holding byte `offset`, with the part's start offset.
    fn part_at(&self, offset: usize) -> Result<(usize, &ByteView)> {
        self.parts
            .range(..=offset)
            .next_back()
            .filter(|(start, view)| offset < **start + view.len())
            .map(|(start, view)| (*start, view))
            .ok_or_else(|| Error::out_of_bounds("chained view offset", offset, self.len))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for view in self.parts.values() {
            out.extend(view.to_vec());
        }
        out
    }

    pub fn write_at(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        if offset.saturating_add(bytes.len()) > self.len {
            return Err(Error::premature_end_of_chain());
        }
        let mut written = 0;
        while written < bytes.len() {
            let position = offset + written;
            let (start, view) = self.part_at(position)?;
            let local = position - start;
            let count = (view.len() - local).min(bytes.len() - written);
            view.write_at(local, &bytes[written..written + count])?;
            written += count;
        }
        Ok(())
    }

    /// Window `[start, end)`. A window inside one part returns that part's
    /// own subview; a spanning window returns a new chained view.
    pub fn subview(&self, start: usize, end: Option<usize>) -> Result<ByteView> {
        let end = end.unwrap_or(self.len);
        if start > end {
            return Err(Error::out_of_bounds("subview start", start, end));
        }
        if end > self.len {
            return Err(Error::out_of_bounds("subview end", end, self.len));
        }
        if start == end {
            return Ok(ByteView::Simple(SimpleView::zeroed(0)));
        }
        let (first_start, first) = self.part_at(start)?;
        let (last_start, last) = self.part_at(end - 1)?;
        if first_start == last_start {
            return first.subview(start - first_start, Some(end - first_start));
        }
        let mut views = Vec::new();
        views.push(first.subview(start - first_start, None)?);
        views.extend(
            self.parts
                .range((Bound::Excluded(first_start), Bound::Excluded(last_start)))
                .map(|(_, view)| view.clone()),
        );
        views.push(last.subview(0, Some(end - last_start))?);
        Ok(ByteView::VariableSizeChunked(Self::new(views)))
    }

    pub fn read(&self, start: usize, end: usize) -> Result<Vec<u8>> {
        Ok(self.subview(start, Some(end))?.to_vec())
    }

    pub fn fill(&self, pattern: &[u8]) -> Result<()> {
        for view in self.parts.values() {
            view.fill(pattern)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_of(sizes: &[usize]) -> (Vec<SimpleView>, VariableSizeChunkedView) {
        let views: Vec<SimpleView> = sizes.iter().map(|&n| SimpleView::zeroed(n)).collect();
        let chained = VariableSizeChunkedView::new(views.clone());
        (views, chained)
    }

    #[test]
    fn test_write_spanning_parts() {
        let (views, chained) = chain_of(&[4, 3, 5]);
        assert_eq!(chained.len(), 12);
        chained.write_at(2, &[1, 2, 3, 4, 5, 6, 7]).unwrap();
        assert_eq!(views[0].to_vec(), vec![0, 0, 1, 2]);
        assert_eq!(views[1].to_vec(), vec![3, 4, 5]);
        assert_eq!(views[2].to_vec(), vec![6, 7, 0, 0, 0]);
    }

    #[test]
    fn test_write_past_end_is_premature_end_of_chain() {
        let (_, chained) = chain_of(&[4, 4]);
        let err = chained.write_at(6, &[0; 3]).unwrap_err();
        assert!(err.to_string().contains("premature end of chain"));
    }

    #[test]
    fn test_subview_single_and_spanning() {
        let (_, chained) = chain_of(&[4, 4, 4]);
        chained.write_at(0, &(0u8..12).collect::<Vec<_>>()).unwrap();

        let inner = chained.subview(5, Some(7)).unwrap();
        assert!(matches!(inner, ByteView::Simple(_)));
        assert_eq!(inner.to_vec(), vec![5, 6]);

        let spanning = chained.subview(2, Some(11)).unwrap();
        assert!(matches!(spanning, ByteView::VariableSizeChunked(_)));
        assert_eq!(spanning.to_vec(), (2u8..11).collect::<Vec<_>>());

        spanning.write_at(1, &[0xAA; 4]).unwrap();
        assert_eq!(chained.read(3, 7).unwrap(), vec![0xAA; 4]);

        assert!(chained.subview(3, Some(13)).is_err());
        assert!(chained.subview(6, Some(6)).unwrap().is_empty());
        assert_eq!(chained.subview(9, None).unwrap().len(), 3);
    }

    #[test]
    fn test_fill_every_part() {
        let (views, chained) = chain_of(&[2, 4]);
        chained.fill(&[0xFF, 0xFF]).unwrap();
        assert!(views.iter().all(|v| v.to_vec().iter().all(|&b| b == 0xFF)));
    }
}
