use criterion::{criterion_group, criterion_main, Criterion, black_box};

use raybench::bvh::{BlasHandle, BvhBuilder};
use raybench::core::BenchConfig;
use raybench::geometry::procedural;
use raybench::math::Aabb;
use raybench::render::build_instances;
use raybench::scene::Scene;

use glam::Vec3;

fn scattered_boxes(n: usize) -> Vec<Aabb> {
    let mut state = 0x9e37_79b9u32;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        (state as f32 / u32::MAX as f32) * 100.0 - 50.0
    };
    (0..n)
        .map(|_| {
            let center = Vec3::new(next(), next(), next());
            Aabb::from_center_half_extent(center, Vec3::splat(0.5))
        })
        .collect()
}

fn bench_build_1k(c: &mut Criterion) {
    let leaves = scattered_boxes(1_000);
    c.bench_function("bvh_build_1k", |b| {
        b.iter(|| BvhBuilder::build(black_box(&leaves)));
    });
}

fn bench_build_10k(c: &mut Criterion) {
    let leaves = scattered_boxes(10_000);
    c.bench_function("bvh_build_10k", |b| {
        b.iter(|| BvhBuilder::build(black_box(&leaves)));
    });
}

fn bench_blas_icosphere(c: &mut Criterion) {
    // 1280 triangles
    let mesh = procedural::icosphere(3, Vec3::ONE);
    c.bench_function("blas_icosphere_3", |b| {
        b.iter(|| BvhBuilder::build_mesh(black_box(&mesh)));
    });
}

fn bench_tlas_frame(c: &mut Criterion) {
    let config = BenchConfig {
        object_count: 256,
        ..BenchConfig::default()
    };
    let mut scene = Scene::benchmark(&config);
    let blas: Vec<BlasHandle> = scene
        .meshes
        .iter()
        .map(|mesh| BlasHandle { root: 0, bounds: mesh.bounds() })
        .collect();

    c.bench_function("tlas_rebuild_256_instances", |b| {
        b.iter(|| {
            scene.step(black_box(1.0 / 60.0));
            let instances = build_instances(&scene, &blas, config.max_instances).unwrap_or_default();
            let leaves: Vec<Aabb> = instances.iter().map(|i| i.world_bounds()).collect();
            BvhBuilder::build(&leaves)
        });
    });
}

criterion_group!(
    benches,
    bench_build_1k,
    bench_build_10k,
    bench_blas_icosphere,
    bench_tlas_frame,
);
criterion_main!(benches);
