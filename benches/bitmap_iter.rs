use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ewah64::Bitmap;

fn bench_positions(c: &mut Criterion) {
    (10..=16).step_by(2).for_each(|log2_size| {
        let size = 2usize.pow(log2_size);
        let bm: Bitmap = (0..size).map(|x| x % 5 == 0).collect();
        c.bench_function(&format!("bitmap_positions_{}", size), |bench| {
            bench.iter(|| black_box(bm.positions()))
        });
    });
}

fn bench_cardinality(c: &mut Criterion) {
    (10..=16).step_by(2).for_each(|log2_size| {
        let size = 2usize.pow(log2_size);
        let bm: Bitmap = (0..size).map(|x| x % 5 == 0).collect();
        c.bench_function(&format!("bitmap_cardinality_{}", size), |bench| {
            bench.iter(|| black_box(bm.cardinality()))
        });
    });
}

criterion_group!(bench_iter_group, bench_positions, bench_cardinality);
criterion_main!(bench_iter_group);
