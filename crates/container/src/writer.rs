use anyhow::{bail, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use layout::{is_metadata_name, METADATA_SUFFIX};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{rename, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::format::{padding_for, write_footer, Footer};
use crate::reader::MAX_NAME_BYTES;

/// Builds a container file entry by entry.
///
/// Payloads are streamed to a temporary file next to the target as they are
/// added; [`finish`](ContainerWriter::finish) appends the directory and
/// footer, fsyncs, and atomically renames the file into place. A writer that
/// is dropped without `finish` removes its temporary file, so a half-written
/// container never appears under the final name.
pub struct ContainerWriter {
    path: PathBuf,
    tmp_path: PathBuf,
    file: Option<BufWriter<File>>,
    /// `(name, offset, size)` per entry, in write order.
    entries: Vec<(String, u64, u64)>,
    names: HashSet<String>,
    /// Bytes written so far.
    position: u64,
}

impl ContainerWriter {
    /// Starts a new container that will be published at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut tmp: OsString = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp_path = PathBuf::from(tmp);

        let raw_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        Ok(Self {
            path,
            tmp_path,
            file: Some(BufWriter::new(raw_file)),
            entries: Vec::new(),
            names: HashSet::new(),
            position: 0,
        })
    }

    /// Writes a data block followed by its `<name>.meta` element count.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` itself ends in the metadata suffix, if
    /// either entry name is already taken, or on I/O failure.
    pub fn add_block(&mut self, name: &str, data: &[u8], element_count: u64) -> Result<()> {
        if is_metadata_name(name) {
            bail!("block name {} uses the reserved {} suffix", name, METADATA_SUFFIX);
        }
        let meta_name = format!("{}{}", name, METADATA_SUFFIX);
        if self.names.contains(&meta_name) {
            bail!("duplicate entry name: {}", meta_name);
        }
        self.add_raw(name, data)?;
        self.add_raw(&meta_name, &element_count.to_le_bytes())
    }

    /// Writes a single entry without any companion metadata.
    ///
    /// The payload is aligned to [`ENTRY_ALIGNMENT`](crate::ENTRY_ALIGNMENT).
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is empty, too long, or already used, or on
    /// I/O failure.
    pub fn add_raw(&mut self, name: &str, data: &[u8]) -> Result<()> {
        if name.is_empty() {
            bail!("entry name must not be empty");
        }
        if name.len() > MAX_NAME_BYTES {
            bail!("entry name of {} bytes exceeds maximum {}", name.len(), MAX_NAME_BYTES);
        }
        if self.names.contains(name) {
            bail!("duplicate entry name: {}", name);
        }

        self.pad()?;
        let offset = self.position;
        self.file_mut()?.write_all(data)?;
        self.position += data.len() as u64;

        self.names.insert(name.to_string());
        self.entries.push((name.to_string(), offset, data.len() as u64));
        Ok(())
    }

    /// Number of entries written so far, metadata entries included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends the directory and footer and publishes the container.
    ///
    /// # Crash Safety
    ///
    /// Everything is written to `<path>.tmp`, synced, and then renamed over
    /// `path`. A crash before the rename leaves only the temporary file.
    pub fn finish(mut self) -> Result<()> {
        let directory_offset = self.position;

        let mut directory: Vec<u8> = Vec::new();
        for (name, offset, size) in &self.entries {
            directory.write_u32::<LittleEndian>(name.len() as u32)?;
            directory.extend_from_slice(name.as_bytes());
            directory.write_u64::<LittleEndian>(*offset)?;
            directory.write_u64::<LittleEndian>(*size)?;
        }

        let mut hasher = Crc32::new();
        hasher.update(&directory);
        let footer = Footer {
            directory_offset,
            entry_count: self.entries.len() as u32,
            directory_crc: hasher.finalize(),
        };

        let mut file = match self.file.take() {
            Some(f) => f,
            None => bail!("container writer already finished"),
        };
        file.write_all(&directory)?;
        write_footer(&mut file, &footer)?;

        file.flush()?;
        file.into_inner()?.sync_all()?;

        rename(&self.tmp_path, &self.path)?;

        // Fsync the parent directory so the rename survives a crash.
        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    fn pad(&mut self) -> Result<()> {
        let padding = padding_for(self.position);
        if padding > 0 {
            let zeros = [0u8; 8];
            self.file_mut()?.write_all(&zeros[..padding as usize])?;
            self.position += padding;
        }
        Ok(())
    }

    fn file_mut(&mut self) -> Result<&mut BufWriter<File>> {
        match self.file.as_mut() {
            Some(f) => Ok(f),
            None => bail!("container writer already finished"),
        }
    }
}

impl Drop for ContainerWriter {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            let _ = std::fs::remove_file(&self.tmp_path);
        }
    }
}
