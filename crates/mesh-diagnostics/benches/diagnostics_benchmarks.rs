//! Benchmarks for the mesh diagnostics pipeline.
//!
//! Run with: cargo bench -p mesh-diagnostics

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mesh_diagnostics::{
    Mesh, QualityParams, SpatialIndex, analyze_face_quality, detect_free_edges,
    detect_overlapping_edges, detect_pierced_faces, OverlapParams,
};

/// A z=0 grid of independent triangles, `n * n` faces with no shared
/// vertex rows (the shape STL loading produces).
fn triangle_grid(n: usize) -> Mesh {
    let mut mesh = Mesh::with_capacity(n * n * 3, n * n);
    for i in 0..n {
        for j in 0..n {
            let (x, y) = (i as f32, j as f32);
            let base = mesh.vertices.len() as u32;
            mesh.vertices.push(nalgebra::Point3::new(x, y, 0.0));
            mesh.vertices.push(nalgebra::Point3::new(x + 0.9, y, 0.0));
            mesh.vertices.push(nalgebra::Point3::new(x, y + 0.9, 0.0));
            mesh.faces.push([base, base + 1, base + 2]);
        }
    }
    mesh
}

/// The grid with a handful of vertical triangles stabbed through it.
fn pierced_grid(n: usize, piercings: usize) -> Mesh {
    let mut mesh = triangle_grid(n);
    for k in 0..piercings {
        let x = (k * n / piercings) as f32 + 0.3;
        let base = mesh.vertices.len() as u32;
        mesh.vertices.push(nalgebra::Point3::new(x, 0.3, -1.0));
        mesh.vertices.push(nalgebra::Point3::new(x + 0.3, 0.3, -1.0));
        mesh.vertices.push(nalgebra::Point3::new(x + 0.15, 0.3, 1.0));
        mesh.faces.push([base, base + 1, base + 2]);
    }
    mesh
}

fn bench_edge_detectors(c: &mut Criterion) {
    let mut group = c.benchmark_group("edges");
    for n in [10, 30] {
        let mesh = triangle_grid(n);
        group.bench_with_input(BenchmarkId::new("free_edges", n * n), &mesh, |b, mesh| {
            b.iter(|| detect_free_edges(black_box(mesh)))
        });
        group.bench_with_input(
            BenchmarkId::new("overlapping_edges", n * n),
            &mesh,
            |b, mesh| {
                b.iter(|| detect_overlapping_edges(black_box(mesh), &OverlapParams::default()))
            },
        );
    }
    group.finish();
}

fn bench_quality(c: &mut Criterion) {
    let mesh = triangle_grid(30);
    c.bench_function("face_quality_900", |b| {
        b.iter(|| analyze_face_quality(black_box(&mesh), &QualityParams::default()))
    });
}

fn bench_pierced(c: &mut Criterion) {
    let mut group = c.benchmark_group("pierced");
    group.sample_size(20);

    let mesh = pierced_grid(30, 8);
    group.bench_function("full_detection_908", |b| {
        b.iter(|| detect_pierced_faces(black_box(&mesh)).unwrap())
    });

    group.bench_function("local_detection_after_update", |b| {
        let mut index = SpatialIndex::new();
        index.initialize(&mesh).unwrap();
        let targets: Vec<u32> = (900..908).collect();
        b.iter(|| {
            let mut index = index.clone();
            index.update(&mesh, &targets).unwrap();
            index.detect_local(&mesh, &targets).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_edge_detectors, bench_quality, bench_pierced);
criterion_main!(benches);
