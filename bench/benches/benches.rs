use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use glam::Vec3;
use landscape::{FractalSynthesizer, HeightField, Scenery, SceneryConfig};

const RESOLUTION: usize = 129;
const SEED: u64 = 2025;

fn bench_diamond_square(c: &mut Criterion) {
    c.bench_function("FractalSynthesizer 129x129 (incl. refresh)", |b| {
        b.iter(|| {
            let mut field = HeightField::new(RESOLUTION, 500.0);
            FractalSynthesizer::new(SEED)
                .with_range(40.0)
                .with_corner_seeding(true)
                .synthesize(&mut field);
            black_box(field.min_max())
        })
    });
}

fn bench_normal_refresh(c: &mut Criterion) {
    let mut field = HeightField::new(RESOLUTION, 500.0);
    FractalSynthesizer::new(SEED).with_range(40.0).synthesize(&mut field);
    c.bench_function("HeightField edit + refresh 129x129", |b| {
        b.iter(|| {
            let mut edit = field.edit();
            edit.set(64, 64, 10.0);
            drop(edit);
            black_box(field.normals()[64 * RESOLUTION + 64])
        })
    });
}

fn bench_scenery_build(c: &mut Criterion) {
    let cfg = SceneryConfig::fractal(3, 3, SEED);
    c.bench_function("Scenery 3x3 fractal build (shared seams)", |b| {
        b.iter(|| black_box(Scenery::build(&cfg).map(|s| s.min_max())))
    });
}

fn bench_height_queries(c: &mut Criterion) {
    let cfg = SceneryConfig::fractal(3, 3, SEED);
    let Ok(scenery) = Scenery::build(&cfg) else {
        return;
    };
    let extent = 3.0 * cfg.tile_size;
    c.bench_function("Scenery height_at x1000", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for i in 0..1000 {
                let t = i as f32 / 1000.0;
                let p = Vec3::new(t * extent, 0.0, (1.0 - t) * extent * 0.999);
                sum += scenery.height_at(p).unwrap_or(0.0);
            }
            black_box(sum)
        })
    });
}

criterion_group!(
    terrain_benchmarks,
    bench_diamond_square,
    bench_normal_refresh,
    bench_scenery_build,
    bench_height_queries
);
criterion_main!(terrain_benchmarks);
