use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{Rgb, RgbImage};
use image_dataset::{Dataset, ImageDataset, Normalization};
use std::path::PathBuf;
use tempfile::TempDir;

/// Benchmarks for per-item retrieval from an `ImageDataset`.
///
/// This measures:
/// 1. Decode + resize + tensor conversion, with and without min-max normalization
/// 2. The cost of the resize step across source sizes
///
/// To run these, use:
/// ```bash
/// cargo bench --bench image_set_bench
/// ```

/// Source image side lengths (square).
const SIDES: [u32; 3] = [64, 256, 1024];

/// Items per dataset; each retrieval re-reads one file.
const ITEMS: usize = 8;

/// Writes `ITEMS` gradient PNGs of the given side into a fresh temp dir.
fn make_files(side: u32) -> (TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let paths = (0..ITEMS)
        .map(|i| {
            let path = dir.path().join(format!("{}.png", i));
            RgbImage::from_fn(side, side, |x, y| {
                Rgb([(x % 256) as u8, (y % 256) as u8, (i * 30) as u8])
            })
            .save(&path)
            .unwrap();
            path
        })
        .collect();
    (dir, paths)
}

/// Measure one full retrieval per item
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("Retrieval");

    for &side in &SIDES {
        let (_dir, paths) = make_files(side);
        group.throughput(Throughput::Elements(ITEMS as u64));

        for (name, normalization) in [
            ("min-max", Normalization::default()),
            ("raw", Normalization::None),
        ] {
            let ds = ImageDataset::builder(paths.clone())
                .img_size(224)
                .normalize(normalization)
                .build()
                .unwrap();

            group.bench_with_input(BenchmarkId::new(name, side), &ds, |b, ds| {
                b.iter(|| {
                    for i in 0..ds.len() {
                        black_box(ds.get(i).unwrap());
                    }
                })
            });
        }
    }
    group.finish();
}

/// Measure decode without resizing, to isolate the resize cost.
fn bench_no_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("Without Resize");
    for &side in &SIDES {
        let (_dir, paths) = make_files(side);
        let ds = ImageDataset::builder(paths).build().unwrap();
        group.throughput(Throughput::Elements(ITEMS as u64));

        group.bench_with_input(BenchmarkId::new("decode", side), &ds, |b, ds| {
            b.iter(|| ds.iter().map(|item| black_box(item.unwrap())).count())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_get, bench_no_resize);
criterion_main!(benches);
