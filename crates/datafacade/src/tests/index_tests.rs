use crate::*;
use anyhow::Result;

/// Builds an owned region from `bytes` and `(name, count, size, offset)` blocks.
fn owned_region(bytes: &[u8], blocks: &[(&str, u64, u64, u64)]) -> Result<AllocatedRegion> {
    let mut layout = DataLayout::new();
    for (name, count, size, offset) in blocks {
        layout.set_block(*name, Block::new(*count, *size, *offset))?;
    }
    AllocatedRegion::new(RegionMemory::Owned(bytes.to_vec().into_boxed_slice()), layout)
}

fn sample_index() -> Result<SharedDataIndex> {
    let first = owned_region(b"0123456789abcdef", &[("digits", 10, 10, 0), ("hex", 6, 6, 10)])?;
    let second = owned_region(b"hello world", &[("world", 5, 5, 6)])?;
    SharedDataIndex::new(vec![first, second])
}

// -------------------- Region --------------------

#[test]
fn region_rejects_block_past_end() {
    let err = owned_region(b"short", &[("big", 1, 10, 0)]).unwrap_err();
    assert!(err.to_string().contains("exceeds region"));
}

#[test]
fn region_rejects_overflowing_offset() {
    assert!(owned_region(b"short", &[("wrap", 1, 2, u64::MAX)]).is_err());
}

#[test]
fn region_memory_kind() -> Result<()> {
    let region = owned_region(b"abc", &[])?;
    assert!(!region.memory().is_mapped());
    assert_eq!(region.len(), 3);
    assert!(!region.is_empty());
    Ok(())
}

// -------------------- Resolution --------------------

#[test]
fn resolve_returns_base_plus_offset() -> Result<()> {
    let index = sample_index()?;

    let hex = index.resolve("hex")?;
    assert_eq!(hex.as_bytes(), b"abcdef");
    assert_eq!(hex.byte_size(), 6);
    assert_eq!(hex.element_count(), 6);
    assert_eq!(hex.byte_offset(), 10);
    assert_eq!(hex.region(), 0);
    assert_eq!(hex.as_ptr(), index.regions()[0].as_ptr().wrapping_add(10));

    let world = index.resolve("world")?;
    assert_eq!(world.as_bytes(), b"world");
    assert_eq!(world.region(), 1);
    assert_eq!(world.as_ptr(), index.regions()[1].as_ptr().wrapping_add(6));
    Ok(())
}

#[test]
fn unknown_block_is_not_found() -> Result<()> {
    let index = sample_index()?;

    let err = index.resolve("missing").unwrap_err();
    assert!(err.to_string().contains("block not found: missing"));
    assert!(index.get("missing").is_none());
    assert!(index.get_block("missing").is_none());
    assert!(!index.contains("missing"));

    // A failed lookup leaves the index usable.
    assert_eq!(index.resolve("digits")?.as_bytes(), b"0123456789");
    Ok(())
}

#[test]
fn resolve_is_repeatable() -> Result<()> {
    let index = sample_index()?;
    let a = index.resolve("digits")?;
    let b = index.resolve("digits")?;
    assert_eq!(a.as_ptr(), b.as_ptr());
    assert_eq!(a.block(), b.block());
    Ok(())
}

#[test]
fn duplicate_name_across_regions_rejected() -> Result<()> {
    let first = owned_region(b"aaaa", &[("shared", 1, 4, 0)])?;
    let second = owned_region(b"bbbb", &[("shared", 1, 4, 0)])?;
    let err = SharedDataIndex::new(vec![first, second]).unwrap_err();
    assert!(err.to_string().contains("defined in both region 0 and region 1"));
    Ok(())
}

#[test]
fn counts_and_names() -> Result<()> {
    let index = sample_index()?;
    assert_eq!(index.num_regions(), 2);
    assert_eq!(index.num_blocks(), 3);
    assert_eq!(index.block_names(), vec!["digits", "hex", "world"]);
    assert_eq!(index.get_block("world"), Some(Block::new(5, 5, 6)));
    Ok(())
}

#[test]
fn empty_index_resolves_nothing() -> Result<()> {
    let index = SharedDataIndex::new(Vec::new())?;
    assert_eq!(index.num_blocks(), 0);
    assert!(index.resolve("anything").is_err());
    assert!(index.file_index_path().is_none());
    Ok(())
}

#[test]
fn zero_sized_block_resolves_to_empty_slice() -> Result<()> {
    let region = owned_region(b"abcd", &[("empty", 0, 0, 4)])?;
    let index = SharedDataIndex::new(vec![region])?;
    let view = index.resolve("empty")?;
    assert!(view.as_bytes().is_empty());
    assert_eq!(view.byte_offset(), 4);
    Ok(())
}

// -------------------- File index path --------------------

#[test]
fn file_index_path_strips_terminator() -> Result<()> {
    let region = owned_region(b"/data/x.fileIndex\0", &[(FILE_INDEX_PATH_BLOCK, 17, 18, 0)])?;
    let index = SharedDataIndex::new(vec![region])?;
    assert_eq!(index.file_index_path(), Some("/data/x.fileIndex"));
    Ok(())
}

// -------------------- Concurrency --------------------

#[test]
fn index_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SharedDataIndex>();
    assert_send_sync::<MmapMemoryAllocator>();
}

#[test]
fn concurrent_lookups_agree() -> Result<()> {
    let index = sample_index()?;
    let expected = index.resolve("hex")?.as_ptr() as usize;
    let index = &index;

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(move || {
                    (0..1_000)
                        .map(|_| index.resolve("hex").map(|v| v.as_ptr() as usize))
                        .collect::<Result<Vec<usize>>>()
                })
            })
            .collect();

        for h in handles {
            let ptrs = h.join().expect("lookup thread panicked")?;
            assert!(ptrs.iter().all(|&p| p == expected));
        }
        Ok::<(), anyhow::Error>(())
    })
}
