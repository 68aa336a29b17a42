use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Vector2;

use slicer::{
    builder::MeshBuilder, compositor::recenter, geometry::Segments1D, section::PlaneSlicer, Pos,
};

pub fn bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Mesh Intersections");

    for segments in [32, 128, 512] {
        let mut builder = MeshBuilder::new();
        builder.add_torus(Pos::zeros(), (20.0, 6.0), (segments * 2, segments));
        let mesh = builder.build();
        let index = Segments1D::from_mesh(&mesh, 100);
        let name = format!("torus-{}", mesh.face_count());

        group.bench_with_input(BenchmarkId::new("Linear", &name), &mesh, |b, i| {
            b.iter(|| i.intersect_plane(0.1))
        });

        group.bench_with_input(
            BenchmarkId::new("Segments", &name),
            &(index, mesh.clone()),
            |b, (index, mesh)| b.iter(|| index.intersect_plane(mesh, 0.1)),
        );

        let planes = PlaneSlicer::new(&mesh);
        group.bench_with_input(BenchmarkId::new("Section", &name), &planes, |b, i| {
            b.iter(|| {
                let section = i.section_at(0.1)?;
                recenter(&section.polygons, Vector2::new(50.0, 50.0))
            })
        });
    }
}

criterion_group!(benches, bench);
criterion_main!(benches);
