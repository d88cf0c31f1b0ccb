use anyhow::Result;
use config::{DatasetFile, DatasetFiles};
use container::ContainerWriter;
use std::path::{Path, PathBuf};

/// Dataset description with explicit file lists.
pub struct TestDataset {
    pub static_files: Vec<DatasetFile>,
    pub updatable_files: Vec<DatasetFile>,
    pub file_index: PathBuf,
}

impl TestDataset {
    pub fn new(file_index: impl Into<PathBuf>) -> Self {
        Self {
            static_files: Vec::new(),
            updatable_files: Vec::new(),
            file_index: file_index.into(),
        }
    }
}

impl DatasetFiles for TestDataset {
    fn static_files(&self) -> Vec<DatasetFile> {
        self.static_files.clone()
    }

    fn updatable_files(&self) -> Vec<DatasetFile> {
        self.updatable_files.clone()
    }

    fn file_index_path(&self) -> PathBuf {
        self.file_index.clone()
    }
}

/// Writes a container holding `(name, payload, element_count)` blocks.
pub fn write_container(path: &Path, blocks: &[(&str, Vec<u8>, u64)]) -> Result<()> {
    let mut w = ContainerWriter::create(path)?;
    for (name, data, count) in blocks {
        w.add_block(name, data, *count)?;
    }
    w.finish()
}
