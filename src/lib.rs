//! cfbkit - A Rust library for reading and writing Compound File Binary containers
//!
//! Compound File Binary (CFB, also known as OLE2 structured storage) is the
//! container behind legacy Microsoft Office files (.doc, .xls, .ppt), MSI
//! packages and many other formats. This crate edits such containers in
//! memory: every change is written in place into one buffer, which can be
//! serialized at any time.
//!
//! # Features
//!
//! - **Create or open**: start from an empty container or parse existing bytes
//! - **Storages and streams**: add, enumerate, find and look up by path
//! - **Stream I/O**: read ranges, overwrite in place, append
//! - **Small streams**: transparently packed into the mini stream and promoted
//!   to regular sectors once they reach 4096 bytes
//! - **Compaction**: `rewrite` produces a defragmented deep copy
//!
//! # Example - Building a container
//!
//! ```
//! use cfbkit::CompoundFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = CompoundFile::new()?;
//! let root = file.root_storage()?;
//!
//! let storage = root.add_storage("Properties")?;
//! let stream = storage.add_stream("Summary", &[1, 2, 3, 4])?;
//! stream.append(&[5, 6])?;
//!
//! let bytes = file.as_bytes();
//! assert_eq!(bytes.len() % 512, 0);
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Reading a container
//!
//! ```no_run
//! use cfbkit::CompoundFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = CompoundFile::open("document.doc")?;
//! let root = file.root_storage()?;
//!
//! // List the top-level entries
//! for entry in root.children()? {
//!     println!("{} ({:?})", entry.name()?, entry.object_type());
//! }
//!
//! // Read one stream
//! let word = root.stream_at(&["WordDocument"])?;
//! println!("WordDocument: {} bytes", word.size()?);
//! # Ok(())
//! # }
//! ```

/// Compound File Binary engine
///
/// Byte views, header, sectors, allocation tables, the directory tree and
/// stream storage, tied together by [`cfb::CompoundFile`].
pub mod cfb;

/// Error type and binary helpers shared by the engine
pub mod common;

// Re-export commonly used types for convenience
pub use cfb::{CompoundFile, DirectoryEntry, ObjectType, Storage, Stream, is_compound_file};
pub use common::{Error, Result};
