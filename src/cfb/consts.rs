//! Format constants for the single supported revision (major version 3).

/// Magic bytes that open every compound file
pub const MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Header length in bytes
pub const HEADER_SIZE: usize = 512;

/// Sector size (2^9)
pub const SECTOR_SIZE: usize = 512;

/// Mini sector size (2^6)
pub const MINI_SECTOR_SIZE: usize = 64;

/// Streams below this size live in the mini stream
pub const MINI_STREAM_CUTOFF: u32 = 4096;

pub const MAJOR_VERSION: u16 = 3;
pub const MINOR_VERSION: u16 = 0x003E;
/// 0xFFFE stored little-endian, i.e. bytes FE FF
pub const BYTE_ORDER_MARK: u16 = 0xFFFE;
pub const SECTOR_SHIFT: u16 = 9;
pub const MINI_SECTOR_SHIFT: u16 = 6;

/// Inline DIFAT slots in the header
pub const HEADER_DIFAT_ENTRIES: usize = 109;

/// FAT sector slots in one DIFAT sector (the last 4 bytes chain to the next one)
pub const DIFAT_SECTOR_ENTRIES: usize = 127;

/// Offset of the next-DIFAT-sector pointer inside a DIFAT sector
pub const DIFAT_NEXT_SECTOR_OFFSET: usize = 508;

/// 4-byte slots in one allocation table sector
pub const ENTRIES_PER_TABLE_SECTOR: usize = 128;

/// Size of a directory entry in bytes
pub const DIRENTRY_SIZE: usize = 128;

/// Directory entries per sector
pub const DIRENTRIES_PER_SECTOR: usize = SECTOR_SIZE / DIRENTRY_SIZE;

// Sector IDs
/// Denotes a DIFAT sector in a FAT
pub const DIFSECT: u32 = 0xFFFF_FFFC;
/// Denotes a FAT sector in a FAT
pub const FATSECT: u32 = 0xFFFF_FFFD;
/// End of a chain
pub const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
/// Unallocated sector
pub const FREESECT: u32 = 0xFFFF_FFFF;

/// Absent directory entry reference
pub const NOSTREAM: u32 = 0xFFFF_FFFF;

/// Byte pattern used to fill freshly allocated sectors
pub const FREESECT_BYTES: [u8; 4] = [0xFF; 4];

/// Name of entry 0
pub const ROOT_ENTRY_NAME: &str = "Root Entry";

/// Directory entry names hold at most 31 UTF-16 code units plus a terminator
pub const MAX_NAME_CHARS: usize = 31;

/// Bytes reserved for the UTF-16 name field
pub const NAME_FIELD_SIZE: usize = 64;

/// Header field offsets
pub mod header {
    pub const SIGNATURE: usize = 0;
    pub const CLSID: usize = 8;
    pub const MINOR_VERSION: usize = 24;
    pub const MAJOR_VERSION: usize = 26;
    pub const BYTE_ORDER: usize = 28;
    pub const SECTOR_SHIFT: usize = 30;
    pub const MINI_SECTOR_SHIFT: usize = 32;
    pub const RESERVED: usize = 34;
    pub const NUMBER_OF_DIRECTORY_SECTORS: usize = 40;
    pub const NUMBER_OF_FAT_SECTORS: usize = 44;
    pub const FIRST_DIRECTORY_SECTOR: usize = 48;
    pub const TRANSACTION_SIGNATURE: usize = 52;
    pub const MINI_STREAM_CUTOFF: usize = 56;
    pub const FIRST_MINIFAT_SECTOR: usize = 60;
    pub const NUMBER_OF_MINIFAT_SECTORS: usize = 64;
    pub const FIRST_DIFAT_SECTOR: usize = 68;
    pub const NUMBER_OF_DIFAT_SECTORS: usize = 72;
    pub const DIFAT: usize = 76;
}

/// Directory entry field offsets
pub mod direntry {
    pub const NAME: usize = 0;
    pub const NAME_LENGTH: usize = 64;
    pub const OBJECT_TYPE: usize = 66;
    pub const COLOR: usize = 67;
    pub const LEFT_SIBLING: usize = 68;
    pub const RIGHT_SIBLING: usize = 72;
    pub const CHILD: usize = 76;
    pub const CLSID: usize = 80;
    pub const STATE_BITS: usize = 96;
    pub const CREATION_TIME: usize = 100;
    pub const MODIFIED_TIME: usize = 108;
    pub const STARTING_SECTOR: usize = 116;
    pub const STREAM_SIZE: usize = 120;
}

// Object types in storage
/// Unknown or unallocated entry
pub const STGTY_EMPTY: u8 = 0;
/// Element is a storage object
pub const STGTY_STORAGE: u8 = 1;
/// Element is a stream object
pub const STGTY_STREAM: u8 = 2;
/// Element is the root storage
pub const STGTY_ROOT: u8 = 5;

/// Color flag values
pub const COLOR_RED: u8 = 0;
pub const COLOR_BLACK: u8 = 1;

/// True for both `FREESECT` and `NOSTREAM`
#[inline]
pub fn is_free_or_nostream(value: u32) -> bool {
    value == FREESECT
}
