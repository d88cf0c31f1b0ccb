use crate::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

#[test]
fn payloads_are_aligned() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("aligned.dat");

    let mut w = ContainerWriter::create(&path)?;
    w.add_raw("one", b"x")?;
    w.add_raw("two", b"yyy")?;
    w.add_raw("three", &[0u8; 17])?;
    assert_eq!(w.len(), 3);
    w.finish()?;

    let reader = ContainerReader::open(&path)?;
    for entry in reader.entries() {
        assert_eq!(entry.offset % ENTRY_ALIGNMENT, 0, "{} is misaligned", entry.name);
    }
    assert_eq!(reader.entry("two").unwrap().offset, 8);
    assert_eq!(reader.entry("three").unwrap().offset, 16);
    Ok(())
}

#[test]
fn padding_for_rounds_to_alignment() {
    assert_eq!(padding_for(0), 0);
    assert_eq!(padding_for(1), 7);
    assert_eq!(padding_for(8), 0);
    assert_eq!(padding_for(13), 3);
}

#[test]
fn empty_container_is_valid() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("empty.dat");

    let w = ContainerWriter::create(&path)?;
    assert!(w.is_empty());
    w.finish()?;

    let reader = ContainerReader::open(&path)?;
    assert!(reader.is_empty());
    assert_eq!(fs::metadata(&path)?.len(), FOOTER_BYTES);
    Ok(())
}

#[test]
fn duplicate_names_rejected() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("dup.dat");

    let mut w = ContainerWriter::create(&path)?;
    w.add_block("a", b"1", 1)?;
    assert!(w.add_raw("a", b"2").is_err());
    assert!(w.add_raw("a.meta", b"2").is_err());
    assert!(w.add_block("a", b"3", 1).is_err());
    Ok(())
}

#[test]
fn metadata_suffix_not_allowed_for_blocks() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("meta.dat");

    let mut w = ContainerWriter::create(&path)?;
    let err = w.add_block("x.meta", b"1", 1).unwrap_err();
    assert!(err.to_string().contains("reserved"));
    Ok(())
}

#[test]
fn empty_name_rejected() -> Result<()> {
    let dir = tempdir()?;
    let mut w = ContainerWriter::create(dir.path().join("e.dat"))?;
    assert!(w.add_raw("", b"x").is_err());
    Ok(())
}

#[test]
fn finish_publishes_and_removes_tmp() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("nodes.dat");
    let tmp = dir.path().join("nodes.dat.tmp");

    let mut w = ContainerWriter::create(&path)?;
    w.add_block("coordinates", &[1u8; 64], 8)?;
    assert!(tmp.exists());
    assert!(!path.exists());
    w.finish()?;

    assert!(path.exists());
    assert!(!tmp.exists());
    Ok(())
}

#[test]
fn dropped_writer_leaves_no_files() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("abandoned.dat");

    {
        let mut w = ContainerWriter::create(&path)?;
        w.add_block("coordinates", &[1u8; 64], 8)?;
    }

    assert!(!path.exists());
    assert!(!dir.path().join("abandoned.dat.tmp").exists());
    Ok(())
}
