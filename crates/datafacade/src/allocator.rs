use anyhow::{bail, Context, Result};
use config::DatasetFiles;
use container::ContainerReader;
use layout::{Block, DataLayout, FILE_INDEX_PATH_BLOCK};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::blocks::read_blocks;
use crate::index::SharedDataIndex;
use crate::region::{AllocatedRegion, RegionMemory};

/// Maps every file of a dataset into memory and publishes their blocks
/// through one [`SharedDataIndex`].
///
/// # Construction
///
/// 1. Walk the static files, then the updatable files.
/// 2. A missing required file aborts construction; a missing optional file
///    is skipped.
/// 3. Every existing file is mapped read-only and its container directory is
///    parsed into a block catalog.
/// 4. One extra region is synthesized holding the absolute spatial-index
///    path under [`FILE_INDEX_PATH_BLOCK`].
///
/// Construction either returns a complete allocator or an error. Mappings
/// created before a failure are released when the partial region list is
/// dropped.
///
/// # Lifetime
///
/// The allocator owns every mapping. Views returned by the index borrow the
/// allocator, and dropping it unmaps all files.
pub struct MmapMemoryAllocator {
    index: SharedDataIndex,
    /// Dataset files that were found and mapped, in load order.
    mapped_files: Vec<PathBuf>,
    file_index_path: String,
}

impl std::fmt::Debug for MmapMemoryAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapMemoryAllocator")
            .field("mapped_files", &self.mapped_files)
            .field("file_index_path", &self.file_index_path)
            .field("regions", &self.index.num_regions())
            .field("blocks", &self.index.num_blocks())
            .finish()
    }
}

impl MmapMemoryAllocator {
    /// Loads the dataset described by `dataset`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required file is missing, a file cannot be
    /// accessed or mapped, a container fails its integrity check, or two files define
    /// the same block name.
    pub fn new<D: DatasetFiles + ?Sized>(dataset: &D) -> Result<Self> {
        let _span = tracing::info_span!("MmapMemoryAllocator::new").entered();

        let mut regions = Vec::new();
        let mut mapped_files = Vec::new();

        for file in dataset.all_files() {
            let exists = file
                .path
                .try_exists()
                .with_context(|| format!("failed to access {}", file.path.display()))?;
            if !exists {
                if file.required {
                    bail!("could not find required file: {}", file.path.display());
                }
                tracing::debug!(path = %file.path.display(), "optional file not found, skipping");
                continue;
            }

            let region = map_container(&file.path)?;
            tracing::info!(
                path = %file.path.display(),
                blocks = region.layout().len(),
                bytes = region.len(),
                "mapped dataset file"
            );
            regions.push(region);
            mapped_files.push(file.path);
        }

        let file_index_path = absolute_path_string(&dataset.file_index_path())?;
        regions.push(file_index_region(&file_index_path)?);

        let index = SharedDataIndex::new(regions)?;
        tracing::info!(
            files = mapped_files.len(),
            regions = index.num_regions(),
            blocks = index.num_blocks(),
            "shared data index ready"
        );

        Ok(Self {
            index,
            mapped_files,
            file_index_path,
        })
    }

    #[must_use]
    pub fn get_index(&self) -> &SharedDataIndex {
        &self.index
    }

    /// Dataset files that were mapped, in load order.
    #[must_use]
    pub fn mapped_files(&self) -> &[PathBuf] {
        &self.mapped_files
    }

    /// Absolute spatial-index path published under [`FILE_INDEX_PATH_BLOCK`].
    #[must_use]
    pub fn file_index_path(&self) -> &str {
        &self.file_index_path
    }
}

/// Maps `path` read-only.
///
/// # Errors
///
/// Returns an error naming `path` if it cannot be opened or mapped.
pub fn mmap_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    // SAFETY: dataset files are never modified while a dataset is loaded.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("failed to map {}", path.display()))?;
    Ok(mmap)
}

/// Maps one container file and catalogs its blocks.
fn map_container(path: &Path) -> Result<AllocatedRegion> {
    let mmap = mmap_file(path)?;

    let layout = {
        let mut reader = ContainerReader::from_bytes(&mmap[..])
            .with_context(|| format!("invalid container {}", path.display()))?;
        read_blocks(&mut reader)
            .with_context(|| format!("failed to read blocks of {}", path.display()))?
    };

    AllocatedRegion::new(RegionMemory::Mapped(mmap), layout)
        .with_context(|| format!("invalid block layout in {}", path.display()))
}

/// Builds the region publishing `path` as a NUL-terminated string at offset 0.
fn file_index_region(path: &str) -> Result<AllocatedRegion> {
    let mut bytes = Vec::with_capacity(path.len() + 1);
    bytes.extend_from_slice(path.as_bytes());
    bytes.push(0);

    let mut layout = DataLayout::new();
    layout.set_block(
        FILE_INDEX_PATH_BLOCK,
        Block::new(path.len() as u64, bytes.len() as u64, 0),
    )?;

    AllocatedRegion::new(RegionMemory::Owned(bytes.into_boxed_slice()), layout)
}

fn absolute_path_string(path: &Path) -> Result<String> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("failed to resolve {}", path.display()))?;
    match absolute.into_os_string().into_string() {
        Ok(s) => Ok(s),
        Err(raw) => bail!("file index path is not valid UTF-8: {:?}", raw),
    }
}
