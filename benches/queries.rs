use criterion::{criterion_group, criterion_main, Criterion, black_box};

use glam::Vec3;

use tribvh::bvh::Bvh;
use tribvh::math::{Ray, Triangle};
use tribvh::mesh::TriangleMesh;
use tribvh::query::{self, QueryConfig, Traversal};

/// Deterministic triangle soup spread through a ball
fn scattered_mesh(count: usize) -> TriangleMesh {
    let tris = (0..count)
        .map(|i| {
            let f = i as f32;
            let base = Vec3::new(
                (f * 0.731).sin() * 10.0,
                (f * 1.193).cos() * 10.0,
                (f * 0.437).sin() * (f * 0.911).cos() * 10.0,
            );
            Triangle::new(base, base + Vec3::X * 0.5, base + Vec3::Y * 0.5)
        })
        .collect();
    TriangleMesh::new(tris)
}

fn scattered_points(count: usize) -> Vec<Vec3> {
    (0..count)
        .map(|i| {
            let f = i as f32;
            Vec3::new(
                (f * 0.677).sin() * 12.0,
                (f * 1.131).cos() * 12.0,
                (f * 0.389).sin() * 12.0,
            )
        })
        .collect()
}

fn bench_build_4096(c: &mut Criterion) {
    let mesh = scattered_mesh(4096);
    c.bench_function("lbvh_build_4096", |b| {
        b.iter(|| Bvh::build(black_box(mesh.triangles())));
    });
}

fn bench_nearest_point_stack(c: &mut Criterion) {
    let mesh = scattered_mesh(4096);
    let points = scattered_points(1024);
    let cfg = QueryConfig::default();
    c.bench_function("nearest_point_stack_1024", |b| {
        b.iter(|| query::nearest_surface_points(black_box(&mesh), black_box(&points), &cfg));
    });
}

fn bench_nearest_point_best_first(c: &mut Criterion) {
    let mesh = scattered_mesh(4096);
    let points = scattered_points(1024);
    let cfg = QueryConfig {
        traversal: Traversal::BestFirst,
        ..Default::default()
    };
    c.bench_function("nearest_point_best_first_1024", |b| {
        b.iter(|| query::nearest_surface_points(black_box(&mesh), black_box(&points), &cfg));
    });
}

fn bench_nearest_point_sorted(c: &mut Criterion) {
    let mesh = scattered_mesh(4096);
    let points = scattered_points(1024);
    let cfg = QueryConfig {
        sort_queries: true,
        ..Default::default()
    };
    c.bench_function("nearest_point_sorted_1024", |b| {
        b.iter(|| query::nearest_surface_points(black_box(&mesh), black_box(&points), &cfg));
    });
}

fn bench_ray_intersections(c: &mut Criterion) {
    let mesh = scattered_mesh(4096);
    let rays: Vec<Ray> = scattered_points(1024)
        .into_iter()
        .map(|p| Ray::new(p, (-p).normalize()))
        .collect();
    let cfg = QueryConfig::default();
    c.bench_function("ray_intersections_1024", |b| {
        b.iter(|| query::ray_intersections(black_box(&mesh), black_box(&rays), &cfg));
    });
}

criterion_group!(
    benches,
    bench_build_4096,
    bench_nearest_point_stack,
    bench_nearest_point_best_first,
    bench_nearest_point_sorted,
    bench_ray_intersections,
);
criterion_main!(benches);
