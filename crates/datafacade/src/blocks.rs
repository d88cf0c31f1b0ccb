use anyhow::Result;
use container::{ContainerReader, FileEntry};
use layout::{is_metadata_name, Block, DataLayout};
use std::io::{Read, Seek};

/// A container whose directory can be turned into a block catalog.
///
/// Implementors have already verified the container's integrity before the
/// first entry is listed.
pub trait BlockSource {
    /// All entries in stored order, metadata entries included.
    fn list_entries(&self) -> Vec<FileEntry>;

    /// Number of logical elements in block `name`.
    fn read_element_count(&mut self, name: &str) -> Result<u64>;
}

impl<R: Read + Seek> BlockSource for ContainerReader<R> {
    fn list_entries(&self) -> Vec<FileEntry> {
        self.entries().to_vec()
    }

    fn read_element_count(&mut self, name: &str) -> Result<u64> {
        ContainerReader::read_element_count(self, name)
    }
}

/// Builds the catalog of data blocks stored in `source`.
///
/// Entries ending in [`METADATA_SUFFIX`](layout::METADATA_SUFFIX) are skipped;
/// their content is only reachable through
/// [`read_element_count`](BlockSource::read_element_count) of the data entry
/// they belong to.
///
/// # Errors
///
/// Returns an error if an element count cannot be read or a block name
/// occurs twice.
pub fn read_blocks<S: BlockSource + ?Sized>(source: &mut S) -> Result<DataLayout> {
    let mut layout = DataLayout::new();
    for entry in source.list_entries() {
        if is_metadata_name(&entry.name) {
            continue;
        }
        let element_count = source.read_element_count(&entry.name)?;
        layout.set_block(entry.name, Block::new(element_count, entry.size, entry.offset))?;
    }
    Ok(layout)
}
