//! The 512-byte compound file header.
//!
//! The header pins the format constants, the chain start pointers of the
//! directory, MiniFAT and DIFAT, and the first 109 DIFAT entries.

use std::cell::RefCell;

use zerocopy::{FromBytes, LE, U16, U32};
use zerocopy_derive::FromBytes as DeriveFromBytes;

use super::consts::{self, header as off};
use super::view::SimpleView;
use crate::common::error::{Error, Result};

/// On-disk layout of the fixed header fields preceding the inline DIFAT.
#[allow(dead_code)]
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawHeader {
    signature: [u8; 8],
    clsid: [u8; 16],
    minor_version: U16<LE>,
    major_version: U16<LE>,
    byte_order: U16<LE>,
    sector_shift: U16<LE>,
    mini_sector_shift: U16<LE>,
    reserved: [u8; 6],
    number_of_directory_sectors: U32<LE>,
    number_of_fat_sectors: U32<LE>,
    first_directory_sector: U32<LE>,
    transaction_signature: U32<LE>,
    mini_stream_cutoff: U32<LE>,
    first_minifat_sector: U32<LE>,
    number_of_minifat_sectors: U32<LE>,
    first_difat_sector: U32<LE>,
    number_of_difat_sectors: U32<LE>,
}

impl RawHeader {
    fn validate(&self) -> Result<()> {
        fn check(ok: bool, field: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(Error::InvalidFormat(format!("unexpected {field}")))
            }
        }
        check(&self.signature == consts::MAGIC, "signature")?;
        check(self.minor_version.get() == consts::MINOR_VERSION, "minor version")?;
        check(self.major_version.get() == consts::MAJOR_VERSION, "major version")?;
        check(self.byte_order.get() == consts::BYTE_ORDER_MARK, "byte order")?;
        check(self.sector_shift.get() == consts::SECTOR_SHIFT, "sector shift")?;
        check(
            self.mini_sector_shift.get() == consts::MINI_SECTOR_SHIFT,
            "mini sector shift",
        )?;
        check(self.reserved == [0u8; 6], "reserved bytes")?;
        check(
            self.number_of_directory_sectors.get() == 0,
            "number of directory sectors",
        )?;
        check(
            self.mini_stream_cutoff.get() == consts::MINI_STREAM_CUTOFF,
            "mini stream cutoff",
        )
    }
}

/// Typed accessor over the header bytes.
///
/// Every getter and setter touches exactly its own byte range of the shared
/// view, so changes are immediately part of the serialized container.
#[derive(Debug)]
pub struct Header {
    view: SimpleView,
    difat_entries: RefCell<Vec<u32>>,
}

impl Header {
    /// Validate `view` as a header of the supported revision.
    pub fn new(view: SimpleView) -> Result<Self> {
        if view.len() != consts::HEADER_SIZE {
            return Err(Error::InvalidFormat(format!(
                "header must be {} bytes, got {}",
                consts::HEADER_SIZE,
                view.len()
            )));
        }
        let raw = view.with_bytes(|b| RawHeader::read_from_bytes(&b[..off::DIFAT]).ok());
        raw.ok_or_else(|| Error::InvalidFormat("truncated header".to_string()))?
            .validate()?;

        let mut difat_entries = Vec::with_capacity(consts::HEADER_DIFAT_ENTRIES);
        for i in 0..consts::HEADER_DIFAT_ENTRIES {
            let entry = view.u32_at(off::DIFAT + i * 4)?;
            if consts::is_free_or_nostream(entry) {
                break;
            }
            difat_entries.push(entry);
        }
        Ok(Self {
            view,
            difat_entries: RefCell::new(difat_entries),
        })
    }

    /// Initialize `view` as a fresh header and parse it.
    pub fn empty(view: SimpleView) -> Result<Self> {
        view.write_at(off::SIGNATURE, consts::MAGIC)?;
        view.write_at(off::CLSID, &[0u8; 16])?;
        view.set_u16(off::MINOR_VERSION, consts::MINOR_VERSION)?;
        view.set_u16(off::MAJOR_VERSION, consts::MAJOR_VERSION)?;
        view.set_u16(off::BYTE_ORDER, consts::BYTE_ORDER_MARK)?;
        view.set_u16(off::SECTOR_SHIFT, consts::SECTOR_SHIFT)?;
        view.set_u16(off::MINI_SECTOR_SHIFT, consts::MINI_SECTOR_SHIFT)?;
        view.write_at(off::RESERVED, &[0u8; 6])?;
        view.set_u32(off::NUMBER_OF_DIRECTORY_SECTORS, 0)?;
        view.set_u32(off::NUMBER_OF_FAT_SECTORS, 0)?;
        view.set_u32(off::FIRST_DIRECTORY_SECTOR, consts::ENDOFCHAIN)?;
        view.set_u32(off::TRANSACTION_SIGNATURE, 0)?;
        view.set_u32(off::MINI_STREAM_CUTOFF, consts::MINI_STREAM_CUTOFF)?;
        view.set_u32(off::FIRST_MINIFAT_SECTOR, consts::ENDOFCHAIN)?;
        view.set_u32(off::NUMBER_OF_MINIFAT_SECTORS, 0)?;
        view.set_u32(off::FIRST_DIFAT_SECTOR, consts::ENDOFCHAIN)?;
        view.set_u32(off::NUMBER_OF_DIFAT_SECTORS, 0)?;
        view.subview(off::DIFAT, None)?
            .fill(&consts::FREESECT_BYTES)?;
        Self::new(view)
    }

    pub fn signature(&self) -> Result<Vec<u8>> {
        self.view.read(off::SIGNATURE..off::SIGNATURE + 8)
    }

    pub fn clsid(&self) -> Result<Vec<u8>> {
        self.view.read(off::CLSID..off::CLSID + 16)
    }

    pub fn minor_version(&self) -> Result<u16> {
        self.view.u16_at(off::MINOR_VERSION)
    }

    pub fn major_version(&self) -> Result<u16> {
        self.view.u16_at(off::MAJOR_VERSION)
    }

    pub fn byte_order(&self) -> Result<u16> {
        self.view.u16_at(off::BYTE_ORDER)
    }

    /// Sector size in bytes (2^shift).
    pub fn sector_size(&self) -> Result<usize> {
        Ok(1usize << self.view.u16_at(off::SECTOR_SHIFT)?)
    }

    /// Mini sector size in bytes (2^shift).
    pub fn mini_sector_size(&self) -> Result<usize> {
        Ok(1usize << self.view.u16_at(off::MINI_SECTOR_SHIFT)?)
    }

    pub fn mini_stream_cutoff(&self) -> Result<u32> {
        self.view.u32_at(off::MINI_STREAM_CUTOFF)
    }

    pub fn number_of_fat_sectors(&self) -> Result<u32> {
        self.view.u32_at(off::NUMBER_OF_FAT_SECTORS)
    }

    pub fn set_number_of_fat_sectors(&self, count: u32) -> Result<()> {
        self.view.set_u32(off::NUMBER_OF_FAT_SECTORS, count)
    }

    pub fn first_directory_sector(&self) -> Result<u32> {
        self.view.u32_at(off::FIRST_DIRECTORY_SECTOR)
    }

    pub fn set_first_directory_sector(&self, position: u32) -> Result<()> {
        self.view.set_u32(off::FIRST_DIRECTORY_SECTOR, position)
    }

    pub fn first_minifat_sector(&self) -> Result<u32> {
        self.view.u32_at(off::FIRST_MINIFAT_SECTOR)
    }

    pub fn set_first_minifat_sector(&self, position: u32) -> Result<()> {
        self.view.set_u32(off::FIRST_MINIFAT_SECTOR, position)
    }

    pub fn number_of_minifat_sectors(&self) -> Result<u32> {
        self.view.u32_at(off::NUMBER_OF_MINIFAT_SECTORS)
    }

    pub fn set_number_of_minifat_sectors(&self, count: u32) -> Result<()> {
        self.view.set_u32(off::NUMBER_OF_MINIFAT_SECTORS, count)
    }

    pub fn first_difat_sector(&self) -> Result<u32> {
        self.view.u32_at(off::FIRST_DIFAT_SECTOR)
    }

    pub fn set_first_difat_sector(&self, position: u32) -> Result<()> {
        self.view.set_u32(off::FIRST_DIFAT_SECTOR, position)
    }

    pub fn number_of_difat_sectors(&self) -> Result<u32> {
        self.view.u32_at(off::NUMBER_OF_DIFAT_SECTORS)
    }

    pub fn set_number_of_difat_sectors(&self, count: u32) -> Result<()> {
        self.view.set_u32(off::NUMBER_OF_DIFAT_SECTORS, count)
    }

    /// FAT sector positions registered inline, in chain order.
    pub fn difat_entries(&self) -> Vec<u32> {
        self.difat_entries.borrow().clone()
    }

    pub fn can_fit_more_difat_entries(&self) -> bool {
        self.difat_entries.borrow().len() < consts::HEADER_DIFAT_ENTRIES
    }

    /// Append a FAT sector position to the inline DIFAT.
    ///
    /// Fails once all 109 slots are used; further FAT sectors go to DIFAT sectors.
    pub fn register_fat_sector(&self, position: u32) -> Result<()> {
        let mut entries = self.difat_entries.borrow_mut();
        if entries.len() >= consts::HEADER_DIFAT_ENTRIES {
            return Err(Error::Capacity(
                "no inline DIFAT slot left in the header".to_string(),
            ));
        }
        self.view.set_u32(off::DIFAT + entries.len() * 4, position)?;
        entries.push(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_header() -> (SimpleView, Header) {
        let view = SimpleView::zeroed(consts::HEADER_SIZE);
        let header = Header::empty(view.clone()).unwrap();
        (view, header)
    }

    #[test]
    fn test_empty_header_reparses() {
        let (view, _) = empty_header();
        let header = Header::new(view).unwrap();
        assert_eq!(header.first_directory_sector().unwrap(), consts::ENDOFCHAIN);
        assert_eq!(header.number_of_fat_sectors().unwrap(), 0);
        assert_eq!(header.first_difat_sector().unwrap(), consts::ENDOFCHAIN);
        assert_eq!(header.first_minifat_sector().unwrap(), consts::ENDOFCHAIN);
        assert_eq!(header.sector_size().unwrap(), 512);
        assert_eq!(header.mini_sector_size().unwrap(), 64);
        assert_eq!(header.mini_stream_cutoff().unwrap(), 4096);
        assert_eq!(header.major_version().unwrap(), 3);
        assert_eq!(header.minor_version().unwrap(), 0x3E);
        assert_eq!(header.byte_order().unwrap(), 0xFFFE);
        assert_eq!(header.signature().unwrap(), consts::MAGIC.to_vec());
        assert!(header.difat_entries().is_empty());
    }

    #[test]
    fn test_layout_bytes() {
        let (view, _) = empty_header();
        let bytes = view.to_vec();
        assert_eq!(&bytes[0..8], &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
        assert_eq!(&bytes[24..34], &[0x3E, 0, 3, 0, 0xFE, 0xFF, 9, 0, 6, 0]);
        assert_eq!(&bytes[56..60], &[0, 0x10, 0, 0]);
        assert!(bytes[76..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_rejects_each_deviating_field() {
        let cases: &[(usize, &[u8])] = &[
            (0, &[0x00]),
            (24, &[0x3F]),
            (26, &[4]),
            (28, &[0xFF, 0xFE]),
            (30, &[12]),
            (32, &[7]),
            (36, &[1]),
            (40, &[1]),
            (57, &[0x20]),
        ];
        for (offset, patch) in cases {
            let (view, _) = empty_header();
            view.write_at(*offset, patch).unwrap();
            assert!(
                matches!(Header::new(view), Err(Error::InvalidFormat(_))),
                "offset {offset} should be rejected"
            );
        }
        assert!(Header::new(SimpleView::zeroed(511)).is_err());
        assert!(Header::new(SimpleView::zeroed(512)).is_err());
    }

    #[test]
    fn test_register_fat_sectors_inline() {
        let (view, header) = empty_header();
        for i in 0..consts::HEADER_DIFAT_ENTRIES as u32 {
            assert!(header.can_fit_more_difat_entries());
            header.register_fat_sector(i + 10).unwrap();
        }
        assert!(!header.can_fit_more_difat_entries());
        assert!(matches!(
            header.register_fat_sector(999),
            Err(Error::Capacity(_))
        ));
        let reparsed = Header::new(view).unwrap();
        let entries = reparsed.difat_entries();
        assert_eq!(entries.len(), 109);
        assert_eq!(entries[0], 10);
        assert_eq!(entries[108], 118);
    }

    #[test]
    fn test_setters_touch_their_fields() {
        let (view, header) = empty_header();
        header.set_number_of_fat_sectors(3).unwrap();
        header.set_first_directory_sector(1).unwrap();
        header.set_first_minifat_sector(2).unwrap();
        header.set_number_of_minifat_sectors(4).unwrap();
        header.set_first_difat_sector(5).unwrap();
        header.set_number_of_difat_sectors(6).unwrap();
        assert_eq!(view.u32_at(44).unwrap(), 3);
        assert_eq!(view.u32_at(48).unwrap(), 1);
        assert_eq!(view.u32_at(60).unwrap(), 2);
        assert_eq!(view.u32_at(64).unwrap(), 4);
        assert_eq!(view.u32_at(68).unwrap(), 5);
        assert_eq!(view.u32_at(72).unwrap(), 6);
    }
}
