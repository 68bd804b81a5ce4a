use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ewah64::Bitmap;

fn bench_set_sparse(c: &mut Criterion) {
    (10..=16).step_by(2).for_each(|log2_size| {
        let size = 2usize.pow(log2_size);
        c.bench_function(&format!("bitmap_set_sparse_{}", size), |bench| {
            bench.iter(|| {
                let mut bm = Bitmap::new();
                for i in (0..size).step_by(71) {
                    bm.set(i);
                }
                black_box(bm)
            })
        });
    });
}

fn bench_collect_bools(c: &mut Criterion) {
    (10..=16).step_by(2).for_each(|log2_size| {
        let size = 2usize.pow(log2_size);
        c.bench_function(&format!("bitmap_collect_bools_{}", size), |bench| {
            bench.iter(|| {
                let bm: Bitmap = (0..size).map(|x| x & 255 < 16).collect();
                black_box(bm)
            })
        });
    });
}

criterion_group!(bench_build_group, bench_set_sparse, bench_collect_bools);
criterion_main!(bench_build_group);
