use config::StorageConfig;
use container::ContainerWriter;
use criterion::{criterion_group, criterion_main, Criterion};
use datafacade::MmapMemoryAllocator;
use std::hint::black_box;
use tempfile::{tempdir, TempDir};

const N_BLOCKS: usize = 1_000;
const BLOCK_SIZE: usize = 64;

/// Builds a two-file dataset with `N_BLOCKS` blocks per file.
fn build_dataset() -> (TempDir, StorageConfig) {
    let dir = tempdir().unwrap();
    let config = StorageConfig::new(dir.path().join("bench"))
        .with_static_files(&[(true, ".nodes")])
        .with_updatable_files(&[(true, ".weights")]);

    for suffix in [".nodes", ".weights"] {
        let mut w = ContainerWriter::create(config.get_path(suffix)).unwrap();
        for i in 0..N_BLOCKS {
            let name = format!("{}_{:04}", suffix.trim_start_matches('.'), i);
            w.add_block(&name, &[b'x'; BLOCK_SIZE], (BLOCK_SIZE / 8) as u64)
                .unwrap();
        }
        w.finish().unwrap();
    }
    (dir, config)
}

fn allocator_build_benchmark(c: &mut Criterion) {
    let (_dir, config) = build_dataset();
    c.bench_function("allocator_new_2k_blocks", |b| {
        b.iter(|| MmapMemoryAllocator::new(&config).unwrap());
    });
}

fn resolve_hit_benchmark(c: &mut Criterion) {
    let (_dir, config) = build_dataset();
    let allocator = MmapMemoryAllocator::new(&config).unwrap();
    let index = allocator.get_index();

    c.bench_function("index_resolve_hit", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let name = format!("weights_{:04}", i % N_BLOCKS);
            i += 1;
            black_box(index.resolve(&name).unwrap().as_ptr());
        });
    });
}

fn resolve_miss_benchmark(c: &mut Criterion) {
    let (_dir, config) = build_dataset();
    let allocator = MmapMemoryAllocator::new(&config).unwrap();
    let index = allocator.get_index();

    c.bench_function("index_get_miss", |b| {
        b.iter(|| black_box(index.get("no_such_block").is_none()));
    });
}

criterion_group!(
    benches,
    allocator_build_benchmark,
    resolve_hit_benchmark,
    resolve_miss_benchmark
);
criterion_main!(benches);
