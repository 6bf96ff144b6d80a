//! Compound File Binary (major version 3) read/write engine.
//!
//! A compound file is a small file system inside one file: a 512-byte
//! header followed by 512-byte sectors. Sectors are chained through the
//! FAT, whose own sectors are listed by the DIFAT. Directory entries form
//! a hierarchy of storages and streams; streams below 4096 bytes are packed
//! into 64-byte mini sectors chained through the MiniFAT.
//!
//! Everything is read and written in place in one shared buffer:
//!
//! - [`view`]: byte views over the buffer (contiguous, sector-chunked, chained)
//! - [`header`] and [`sectors`]: the fixed header and the sector array
//! - [`alloc`]: the FAT, DIFAT and MiniFAT
//! - [`directory`]: directory entries, storages and streams
//! - [`tree`]: the red-black tree ordering each storage's children
//! - [`stream`]: regular and mini stream storage
//! - [`CompoundFile`]: the whole container

pub mod alloc;
pub mod consts;
pub mod directory;
mod file;
pub mod header;
pub mod sectors;
pub mod stream;
pub mod tree;
pub mod view;


pub use directory::{DirectoryEntry, EntryRecord, ObjectType, Storage, Stream};
pub use file::{CompoundFile, is_compound_file};
pub use header::Header;
