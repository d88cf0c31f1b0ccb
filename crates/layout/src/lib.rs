//! # Layout - Block Descriptors
//!
//! The vocabulary shared by every crate that touches a mapped dataset.
//!
//! A [`Block`] describes one named byte range inside a memory region: where
//! it starts (relative to the region base), how many bytes it spans, and how
//! many logical elements it holds. A [`DataLayout`] is the catalog of all
//! blocks that live in one region.
//!
//! ## Reserved names
//!
//! Two names are part of the contract between the storage layer and its
//! consumers:
//!
//! - [`METADATA_SUFFIX`]: container entries ending in `.meta` carry companion
//!   data (element counts) and never become blocks themselves.
//! - [`FILE_INDEX_PATH_BLOCK`]: the block whose bytes are the absolute path of
//!   the spatial-index file, followed by a NUL terminator.
//!
//! ## Example
//!
//! ```rust,no_run
//! use layout::{Block, DataLayout};
//!
//! let mut layout = DataLayout::new();
//! layout.set_block("coordinates", Block::new(512, 4096, 0)).unwrap();
//! assert_eq!(layout.get_block("coordinates").unwrap().byte_size, 4096);
//! ```
use anyhow::{bail, Result};
use std::collections::HashMap;

/// Suffix marking container entries that hold metadata for a same-named block.
pub const METADATA_SUFFIX: &str = ".meta";

/// Reserved block name resolving to the absolute spatial-index file path.
pub const FILE_INDEX_PATH_BLOCK: &str = "/common/rtree/file_index_path";

/// Location and size of one named region of bytes.
///
/// `byte_offset` is relative to the start of the owning region, never an
/// absolute address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Block {
    /// Number of logical elements stored in the block.
    pub element_count: u64,
    /// Size of the block payload in bytes.
    pub byte_size: u64,
    /// Offset of the first payload byte from the region base.
    pub byte_offset: u64,
}

impl Block {
    pub fn new(element_count: u64, byte_size: u64, byte_offset: u64) -> Self {
        Self {
            element_count,
            byte_size,
            byte_offset,
        }
    }

    /// Offset one past the last payload byte, or `None` on overflow.
    #[must_use]
    pub fn end_offset(&self) -> Option<u64> {
        self.byte_offset.checked_add(self.byte_size)
    }

    /// Returns `true` if the block lies entirely within `region_len` bytes.
    #[must_use]
    pub fn fits_within(&self, region_len: u64) -> bool {
        matches!(self.end_offset(), Some(end) if end <= region_len)
    }
}

/// Returns `true` if `name` denotes a metadata entry rather than a data block.
#[must_use]
pub fn is_metadata_name(name: &str) -> bool {
    name.ends_with(METADATA_SUFFIX)
}

/// Catalog of the blocks stored in a single region.
///
/// Built once while a region is loaded and treated as read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataLayout {
    blocks: HashMap<String, Block>,
}

impl DataLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `block` under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is already present. Block names are unique
    /// within one region.
    pub fn set_block(&mut self, name: impl Into<String>, block: Block) -> Result<()> {
        let name = name.into();
        if self.blocks.contains_key(&name) {
            bail!("duplicate block name in layout: {}", name);
        }
        self.blocks.insert(name, block);
        Ok(())
    }

    #[must_use]
    pub fn get_block(&self, name: &str) -> Option<&Block> {
        self.blocks.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterates over `(name, block)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Block)> {
        self.blocks.iter().map(|(name, block)| (name.as_str(), block))
    }

    /// Total payload bytes across all blocks.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.blocks.values().map(|b| b.byte_size).sum()
    }
}
