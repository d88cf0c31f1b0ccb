use anyhow::{bail, Result};
use layout::{Block, DataLayout};
use memmap2::Mmap;

/// Backing memory of one region.
pub enum RegionMemory {
    /// A read-only mapping of a dataset file.
    Mapped(Mmap),
    /// Bytes owned by the allocator that are published as if they were mapped.
    Owned(Box<[u8]>),
}

impl RegionMemory {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RegionMemory::Mapped(mmap) => &mmap[..],
            RegionMemory::Owned(bytes) => &bytes[..],
        }
    }

    #[must_use]
    pub fn is_mapped(&self) -> bool {
        matches!(self, RegionMemory::Mapped(_))
    }
}

impl std::fmt::Debug for RegionMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_mapped() { "Mapped" } else { "Owned" };
        f.debug_struct("RegionMemory")
            .field("kind", &kind)
            .field("len", &self.as_bytes().len())
            .finish()
    }
}

/// A contiguous block of memory together with the catalog of blocks it holds.
///
/// Construction checks that every block in the layout lies inside the memory,
/// so slicing a block out of a region can only fail if that invariant was
/// broken.
#[derive(Debug)]
pub struct AllocatedRegion {
    memory: RegionMemory,
    layout: DataLayout,
}

impl AllocatedRegion {
    /// # Errors
    ///
    /// Returns an error if any block of `layout` extends past the end of
    /// `memory`.
    pub fn new(memory: RegionMemory, layout: DataLayout) -> Result<Self> {
        let len = memory.as_bytes().len() as u64;
        for (name, block) in layout.iter() {
            if !block.fits_within(len) {
                bail!(
                    "block {} ({} bytes at offset {}) exceeds region of {} bytes",
                    name,
                    block.byte_size,
                    block.byte_offset,
                    len
                );
            }
        }
        Ok(Self { memory, layout })
    }

    #[must_use]
    pub fn memory(&self) -> &RegionMemory {
        &self.memory
    }

    #[must_use]
    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Base address of the region.
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.memory.as_bytes().as_ptr()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.memory.as_bytes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the bytes of `block`.
    ///
    /// # Errors
    ///
    /// Returns an error if `block` does not lie inside this region.
    pub fn slice(&self, block: &Block) -> Result<&[u8]> {
        let bytes = self.memory.as_bytes();
        if !block.fits_within(bytes.len() as u64) {
            bail!(
                "block of {} bytes at offset {} is outside region of {} bytes",
                block.byte_size,
                block.byte_offset,
                bytes.len()
            );
        }
        let start = block.byte_offset as usize;
        Ok(&bytes[start..start + block.byte_size as usize])
    }
}
