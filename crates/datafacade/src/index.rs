use anyhow::{bail, Result};
use layout::{Block, FILE_INDEX_PATH_BLOCK};
use std::collections::HashMap;

use crate::region::AllocatedRegion;

/// Read-only view of one resolved block.
///
/// The view borrows the index it came from, so it cannot outlive the
/// allocator that owns the underlying memory.
#[derive(Clone, Copy)]
pub struct BlockView<'a> {
    region: usize,
    block: Block,
    data: &'a [u8],
}

impl<'a> BlockView<'a> {
    /// Absolute address of the first byte (region base + block offset).
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    #[must_use]
    pub fn block(&self) -> Block {
        self.block
    }

    #[must_use]
    pub fn byte_size(&self) -> u64 {
        self.block.byte_size
    }

    #[must_use]
    pub fn byte_offset(&self) -> u64 {
        self.block.byte_offset
    }

    #[must_use]
    pub fn element_count(&self) -> u64 {
        self.block.element_count
    }

    /// Position of the owning region in the index.
    #[must_use]
    pub fn region(&self) -> usize {
        self.region
    }
}

impl std::fmt::Debug for BlockView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockView")
            .field("region", &self.region)
            .field("ptr", &self.as_ptr())
            .field("block", &self.block)
            .finish()
    }
}

/// Flat namespace of blocks across every loaded region.
///
/// Built once from the complete region list and never modified afterwards;
/// all lookups take `&self` and the type is `Send + Sync`, so any number of
/// threads can resolve blocks concurrently.
#[derive(Debug)]
pub struct SharedDataIndex {
    regions: Vec<AllocatedRegion>,
    /// Block name -> position in `regions`.
    block_to_region: HashMap<String, usize>,
}

impl SharedDataIndex {
    /// Takes ownership of `regions` and indexes every block they contain.
    ///
    /// # Errors
    ///
    /// Returns an error if the same block name appears in more than one
    /// region.
    pub fn new(regions: Vec<AllocatedRegion>) -> Result<Self> {
        let mut block_to_region = HashMap::new();
        for (region_id, region) in regions.iter().enumerate() {
            for (name, _) in region.layout().iter() {
                if let Some(previous) = block_to_region.insert(name.to_string(), region_id) {
                    bail!(
                        "block {} is defined in both region {} and region {}",
                        name,
                        previous,
                        region_id
                    );
                }
            }
        }
        Ok(Self {
            regions,
            block_to_region,
        })
    }

    /// Resolves `name` to a view of its bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if no region contains a block named `name`.
    pub fn resolve(&self, name: &str) -> Result<BlockView<'_>> {
        let region_id = match self.block_to_region.get(name) {
            Some(&id) => id,
            None => bail!("block not found: {}", name),
        };
        let region = &self.regions[region_id];
        let block = match region.layout().get_block(name) {
            Some(b) => *b,
            None => bail!("block {} missing from region {}", name, region_id),
        };
        let data = region.slice(&block)?;
        Ok(BlockView {
            region: region_id,
            block,
            data,
        })
    }

    /// Like [`resolve`](Self::resolve) but returns `None` for unknown names.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<BlockView<'_>> {
        self.resolve(name).ok()
    }

    /// Returns the descriptor of `name` without touching its bytes.
    #[must_use]
    pub fn get_block(&self, name: &str) -> Option<Block> {
        let &region_id = self.block_to_region.get(name)?;
        self.regions[region_id].layout().get_block(name).copied()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.block_to_region.contains_key(name)
    }

    /// All block names, sorted.
    #[must_use]
    pub fn block_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.block_to_region.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn regions(&self) -> &[AllocatedRegion] {
        &self.regions
    }

    #[must_use]
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.block_to_region.len()
    }

    /// Absolute path of the spatial-index file, read from its reserved block.
    ///
    /// The block stores the path followed by a NUL terminator; the element
    /// count is the path length without it.
    #[must_use]
    pub fn file_index_path(&self) -> Option<&str> {
        let view = self.get(FILE_INDEX_PATH_BLOCK)?;
        let bytes = view.as_bytes().get(..view.element_count() as usize)?;
        std::str::from_utf8(bytes).ok()
    }
}
