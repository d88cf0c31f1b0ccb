//! # Container - Named Block Files
//!
//! Immutable on-disk files that package several named byte ranges (entries)
//! behind a checksummed directory. The datafacade maps containers into memory
//! and turns their directories into block catalogs; this crate only knows
//! about bytes, names and offsets.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ DATA SECTION (entry payloads)                                  │
//! │                                                               │
//! │ [padding to 8 bytes] payload                                  │
//! │                                                               │
//! │ ... repeated for each entry ...                                │
//! ├───────────────────────────────────────────────────────────────┤
//! │ DIRECTORY (name -> offset/size mapping)                        │
//! │                                                               │
//! │ name_len (u32) | name | offset (u64) | size (u64)              │
//! │                                                               │
//! │ ... repeated for each entry, in write order ...                │
//! ├───────────────────────────────────────────────────────────────┤
//! │ FOOTER (always last 20 bytes)                                  │
//! │                                                               │
//! │ directory_offset (u64 LE) | entry_count (u32 LE)               │
//! │ directory_crc (u32 LE) | magic (u32 LE) "SHC1"                 │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. The directory CRC32 acts as the file's
//! fingerprint: a reader refuses to list entries of a file whose magic or
//! checksum does not match.
//!
//! ## Metadata entries
//!
//! An entry named `<block>.meta` holds the element count of `<block>` as a
//! single `u64`. [`ContainerWriter::add_block`] writes both entries and
//! [`ContainerReader::read_element_count`] reads the count back.

mod format;
mod reader;
mod writer;

pub use format::{padding_for, CONTAINER_MAGIC, ENTRY_ALIGNMENT, FOOTER_BYTES};
pub use reader::{ContainerReader, FileEntry};
pub use writer::ContainerWriter;

#[cfg(test)]
mod tests;
