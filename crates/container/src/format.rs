//! Container binary format constants and footer read/write helpers.
//!
//! ## Footer (20 bytes) - magic `SHC1` (`0x5348_4331`)
//!
//! ```text
//! [directory_offset: u64 LE][entry_count: u32 LE][directory_crc: u32 LE][magic: u32 LE]
//! ```
//!
//! The reader reads the footer first, then loads the directory that sits
//! between `directory_offset` and the footer and checks it against
//! `directory_crc` before trusting any entry.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Result as IoResult, Seek, SeekFrom, Write};

/// Magic number identifying container files (ASCII "SHC1").
pub const CONTAINER_MAGIC: u32 = 0x5348_4331;

/// Size of the footer in bytes: 8 (`directory_offset`) + 4 (`entry_count`)
/// + 4 (`directory_crc`) + 4 (`magic`).
pub const FOOTER_BYTES: u64 = 8 + 4 + 4 + 4;

/// Every entry payload starts on a multiple of this many bytes, so a block
/// inside a page-aligned mapping can be reinterpreted as `u64` records.
pub const ENTRY_ALIGNMENT: u64 = 8;

/// Parsed container footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub directory_offset: u64,
    pub entry_count: u32,
    pub directory_crc: u32,
}

/// Returns the number of zero bytes needed to align `position`.
#[must_use]
pub fn padding_for(position: u64) -> u64 {
    let rem = position % ENTRY_ALIGNMENT;
    if rem == 0 {
        0
    } else {
        ENTRY_ALIGNMENT - rem
    }
}

/// Writes the container footer to `w`.
pub fn write_footer<W: Write>(w: &mut W, footer: &Footer) -> IoResult<()> {
    w.write_u64::<LittleEndian>(footer.directory_offset)?;
    w.write_u32::<LittleEndian>(footer.entry_count)?;
    w.write_u32::<LittleEndian>(footer.directory_crc)?;
    w.write_u32::<LittleEndian>(CONTAINER_MAGIC)?;
    Ok(())
}

/// Reads the container footer from the end of `r`.
///
/// The magic is checked before any other field is interpreted. After this
/// call the cursor is at the end of the file.
pub fn read_footer<R: Read + Seek>(r: &mut R) -> IoResult<Footer> {
    let filesize = r.seek(SeekFrom::End(0))?;

    if filesize < FOOTER_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "file too small for container footer",
        ));
    }

    r.seek(SeekFrom::End(-4))?;
    let magic = r.read_u32::<LittleEndian>()?;
    if magic != CONTAINER_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unknown container magic: {:#x}", magic),
        ));
    }

    r.seek(SeekFrom::End(-(FOOTER_BYTES as i64)))?;
    let directory_offset = r.read_u64::<LittleEndian>()?;
    let entry_count = r.read_u32::<LittleEndian>()?;
    let directory_crc = r.read_u32::<LittleEndian>()?;
    let _magic = r.read_u32::<LittleEndian>()?;

    Ok(Footer {
        directory_offset,
        entry_count,
        directory_crc,
    })
}
