use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use crc32fast::Hasher as Crc32;
use layout::METADATA_SUFFIX;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use crate::format::{read_footer, Footer, FOOTER_BYTES};

/// Maximum entry name size we'll allocate during reads (4 KiB). Prevents OOM on corrupt files.
pub(crate) const MAX_NAME_BYTES: usize = 4 * 1024;
/// Maximum directory size we'll load (64 MiB). Prevents OOM on corrupt files.
const MAX_DIRECTORY_BYTES: u64 = 64 * 1024 * 1024;
/// Size of an element-count metadata payload.
const ELEMENT_COUNT_BYTES: u64 = 8;
/// Smallest encoded directory entry: name_len + 1 name byte + offset + size.
const MIN_ENTRY_BYTES: u64 = 4 + 1 + 8 + 8;

/// One named entry of a container, as recorded in its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    /// Payload size in bytes.
    pub size: u64,
    /// Payload offset from the start of the file.
    pub offset: u64,
}

/// Reads the directory of a container and the payloads it points at.
///
/// [`new`](ContainerReader::new) validates the footer magic and the directory
/// checksum before any entry is exposed, so a reader that exists has already
/// passed the integrity check. Entries are kept in the order they are stored
/// in the file.
///
/// The reader is generic over its source: [`open`](ContainerReader::open)
/// reads from a file, while an in-memory or memory-mapped image can be read
/// through a [`Cursor`].
pub struct ContainerReader<R> {
    inner: R,
    entries: Vec<FileEntry>,
    /// Entry name -> position in `entries`.
    lookup: HashMap<String, usize>,
    footer: Footer,
}

impl ContainerReader<BufReader<File>> {
    /// Opens the container file at `path` and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or fails validation
    /// (see [`new`](ContainerReader::new)).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("failed to open container {}", path.display()))?;
        Self::new(BufReader::new(f))
            .with_context(|| format!("invalid container {}", path.display()))
    }
}

impl<'a> ContainerReader<Cursor<&'a [u8]>> {
    /// Reads a container image that is already in memory (e.g. a mapped file).
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> ContainerReader<R> {
    /// Loads and validates the directory of the container behind `inner`.
    ///
    /// # Validation
    ///
    /// - The source must be at least [`FOOTER_BYTES`] long.
    /// - The footer magic must be `SHC1`.
    /// - The directory must lie between the data section and the footer and
    ///   its CRC32 must match the footer.
    /// - Every entry must lie inside the data section, have a UTF-8 name and
    ///   appear only once.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first check that failed, or on I/O
    /// failure.
    pub fn new(mut inner: R) -> Result<Self> {
        let footer = read_footer(&mut inner)?;
        let directory_end = inner.stream_position()? - FOOTER_BYTES;

        if footer.directory_offset > directory_end {
            bail!(
                "invalid directory_offset {} (directory must end at {})",
                footer.directory_offset,
                directory_end
            );
        }

        let directory_len = directory_end - footer.directory_offset;
        if directory_len > MAX_DIRECTORY_BYTES {
            bail!(
                "corrupt directory: {} bytes exceeds maximum {}",
                directory_len,
                MAX_DIRECTORY_BYTES
            );
        }

        inner.seek(SeekFrom::Start(footer.directory_offset))?;
        let mut directory = vec![0u8; directory_len as usize];
        inner.read_exact(&mut directory)?;

        let mut hasher = Crc32::new();
        hasher.update(&directory);
        let actual_crc = hasher.finalize();
        if actual_crc != footer.directory_crc {
            bail!(
                "fingerprint mismatch: expected {:#010x}, got {:#010x} (data corruption)",
                footer.directory_crc,
                actual_crc
            );
        }

        let entries = parse_directory(&directory, &footer)?;

        let mut lookup = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if lookup.insert(entry.name.clone(), i).is_some() {
                bail!("duplicate entry name in container: {}", entry.name);
            }
        }

        Ok(Self {
            inner,
            entries,
            lookup,
            footer,
        })
    }

    /// Returns all entries in stored order, metadata entries included.
    #[must_use]
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&FileEntry> {
        self.lookup.get(name).map(|&i| &self.entries[i])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Byte offset where the data section ends and the directory begins.
    #[must_use]
    pub fn data_len(&self) -> u64 {
        self.footer.directory_offset
    }

    /// Reads the full payload of entry `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not exist or on I/O failure.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = match self.entry(name) {
            Some(e) => e.clone(),
            None => bail!("no entry named {} in container", name),
        };
        self.inner.seek(SeekFrom::Start(entry.offset))?;
        let mut buf = vec![0u8; entry.size as usize];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads the element count of block `name` from its `<name>.meta` entry.
    ///
    /// The count is stored separately from the payload because the number of
    /// logical elements cannot always be derived from the byte size (packed
    /// bit vectors, variable-width records).
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata entry is missing or is not exactly
    /// eight bytes long.
    pub fn read_element_count(&mut self, name: &str) -> Result<u64> {
        let meta_name = format!("{}{}", name, METADATA_SUFFIX);
        let entry = match self.entry(&meta_name) {
            Some(e) => e.clone(),
            None => bail!("missing element count for block {} (no {} entry)", name, meta_name),
        };
        if entry.size != ELEMENT_COUNT_BYTES {
            bail!(
                "corrupt element count for block {}: expected {} bytes, found {}",
                name,
                ELEMENT_COUNT_BYTES,
                entry.size
            );
        }
        self.inner.seek(SeekFrom::Start(entry.offset))?;
        Ok(self.inner.read_u64::<LittleEndian>()?)
    }
}

/// Decodes the directory section. `directory` has already passed its CRC check.
fn parse_directory(directory: &[u8], footer: &Footer) -> Result<Vec<FileEntry>> {
    let min_len = u64::from(footer.entry_count) * MIN_ENTRY_BYTES;
    if min_len > directory.len() as u64 {
        bail!(
            "corrupt directory: {} entries cannot fit in {} bytes",
            footer.entry_count,
            directory.len()
        );
    }

    let mut cur = Cursor::new(directory);
    let mut entries = Vec::with_capacity(footer.entry_count as usize);

    for i in 0..footer.entry_count {
        let name_len = cur.read_u32::<LittleEndian>()? as usize;
        if name_len == 0 || name_len > MAX_NAME_BYTES {
            bail!("corrupt directory: entry {} has name_len {}", i, name_len);
        }
        let mut name = vec![0u8; name_len];
        cur.read_exact(&mut name)?;
        let name = String::from_utf8(name)
            .with_context(|| format!("corrupt directory: entry {} name is not UTF-8", i))?;

        let offset = cur.read_u64::<LittleEndian>()?;
        let size = cur.read_u64::<LittleEndian>()?;

        match offset.checked_add(size) {
            Some(end) if end <= footer.directory_offset => {}
            _ => bail!(
                "corrupt directory: entry {} ({} bytes at {}) exceeds data section of {} bytes",
                name,
                size,
                offset,
                footer.directory_offset
            ),
        }

        entries.push(FileEntry { name, size, offset });
    }

    if cur.position() != directory.len() as u64 {
        bail!(
            "corrupt directory: {} trailing bytes after {} entries",
            directory.len() as u64 - cur.position(),
            footer.entry_count
        );
    }

    Ok(entries)
}
