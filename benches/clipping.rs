/// Clipper throughput on triangles that need real clipping work.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cpu_rasterizer::rendering::clipper::{triangulate_convex, Clipper, Viewport};
use cpu_rasterizer::rendering::vertex_stage::{raster_to_ndc, TransformedMesh, VertexOut};
use glam::{Vec2, Vec4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const WIDTH: f32 = 1280.0;
const HEIGHT: f32 = 720.0;

fn random_mesh(count: usize, inside: bool) -> TransformedMesh {
    let mut rng = ChaCha8Rng::seed_from_u64(1234);
    let (lo, hi) = if inside { (0.0, 1.0) } else { (-0.5, 1.5) };
    let mut mesh = TransformedMesh::default();
    for _ in 0..count * 3 {
        let p = Vec2::new(rng.gen_range(lo..hi) * WIDTH, rng.gen_range(lo..hi) * HEIGHT);
        let ndc = raster_to_ndc(p, WIDTH, HEIGHT);
        mesh.push_vertex(
            VertexOut {
                position: Vec4::new(ndc.x, ndc.y, 0.5, 1.0),
                ..VertexOut::default()
            },
            p,
        );
    }
    mesh
}

fn bench_clip_mesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("clip_mesh");
    for (label, inside) in [("inside", true), ("straddling", false)] {
        let source = random_mesh(1000, inside);
        let triangles: Vec<[u32; 3]> = (0..1000u32).map(|t| [t * 3, t * 3 + 1, t * 3 + 2]).collect();
        let mut clipper = Clipper::new(Viewport::new(WIDTH, HEIGHT));
        let mut scratch = TransformedMesh::default();

        group.bench_function(label, |b| {
            b.iter(|| {
                scratch.vertices.clone_from(&source.vertices);
                scratch.raster.clone_from(&source.raster);
                black_box(clipper.clip_mesh(triangles.iter().copied(), &mut scratch))
            });
        });
    }
    group.finish();
}

fn bench_triangulate_convex(c: &mut Criterion) {
    c.bench_function("triangulate_heptagon", |b| {
        let points: Vec<Vec2> = (0..7)
            .map(|i| {
                let a = i as f32 / 7.0 * std::f32::consts::TAU;
                Vec2::new(a.cos(), a.sin()) * 100.0
            })
            .collect();
        let mut fan = Vec::with_capacity(5);
        b.iter(|| {
            triangulate_convex(black_box(&points), &mut fan);
            black_box(fan.len())
        });
    });
}

criterion_group!(benches, bench_clip_mesh, bench_triangulate_convex);
criterion_main!(benches);
