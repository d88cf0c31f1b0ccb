//! # Datafacade - Memory-Mapped Block Index
//!
//! Turns the container files of a dataset into one read-only address space
//! and answers "where is block X" without copying anything.
//!
//! ## Architecture
//!
//! ```text
//! DatasetFiles (config)
//!   |
//!   |  static files ++ updatable files
//!   v
//! ┌───────────────────────────────────────────────┐
//! │             MmapMemoryAllocator               │
//! │                                               │
//! │ for each file:                                │
//! │   missing? required -> error / optional skip  │
//! │   mmap_file() -> ContainerReader              │
//! │   read_blocks() -> DataLayout                 │
//! │   AllocatedRegion { Mapped(mmap), layout }    │
//! │                                               │
//! │ + AllocatedRegion { Owned(path\0), layout }   │
//! │   (spatial-index path, offset 0)              │
//! │              |                                │
//! │              v                                │
//! │       SharedDataIndex (immutable)             │
//! └───────────────────────────────────────────────┘
//!   |
//!   v
//! resolve(name) -> BlockView { ptr, size, count }
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module        | Purpose                                              |
//! |--------------|------------------------------------------------------|
//! | [`allocator`] | Dataset discovery, mapping, synthetic path region    |
//! | [`blocks`]   | Container directory -> `DataLayout`                   |
//! | [`region`]   | Region memory (mapping or owned bytes) + layout       |
//! | [`index`]    | Name -> region lookup and `BlockView`                 |
//!
//! ## Ownership
//!
//! The allocator owns the index, the index owns the regions, and each region
//! owns its mapping or buffer. A [`BlockView`] borrows the index, so the
//! compiler rejects any view that would outlive the memory behind it.
pub mod allocator;
pub mod blocks;
pub mod index;
pub mod region;

pub use allocator::{mmap_file, MmapMemoryAllocator};
pub use blocks::{read_blocks, BlockSource};
pub use index::{BlockView, SharedDataIndex};
pub use layout::{Block, DataLayout, FILE_INDEX_PATH_BLOCK, METADATA_SUFFIX};
pub use region::{AllocatedRegion, RegionMemory};

#[cfg(test)]
mod tests;
