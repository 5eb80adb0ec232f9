use criterion::{black_box, criterion_group, criterion_main, Criterion};

use vitrine::config::{DialColor, ProductConfiguration};
use vitrine::raster::mesh::SoftMesh;
use vitrine::raster::SoftwareRenderer;

fn bench_software_frame_480(c: &mut Criterion) {
    let config = ProductConfiguration::default();
    let mut renderer = SoftwareRenderer::new(480, 480, &config);

    c.bench_function("software_frame_480", |b| {
        b.iter(|| {
            renderer.drag(black_box(3.0), 0.0);
            renderer.render().data().len()
        });
    });
}

fn bench_software_frame_960(c: &mut Criterion) {
    let config = ProductConfiguration::default();
    let mut renderer = SoftwareRenderer::new(960, 960, &config);

    c.bench_function("software_frame_960", |b| {
        b.iter(|| {
            renderer.drag(black_box(3.0), 0.0);
            renderer.render().data().len()
        });
    });
}

fn bench_mesh_rebuild(c: &mut Criterion) {
    let base = ProductConfiguration::default();
    let alt = ProductConfiguration {
        dial_color: DialColor::Blue,
        ..base.clone()
    };

    c.bench_function("software_mesh_rebuild", |b| {
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let config = if flip { &alt } else { &base };
            SoftMesh::watch(black_box(config)).vertices.len()
        });
    });
}

criterion_group!(
    benches,
    bench_software_frame_480,
    bench_software_frame_960,
    bench_mesh_rebuild
);
criterion_main!(benches);
