/// Benchmark suite for the rendering pipeline
/// Whole frames plus the per-stage hot paths.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cpu_rasterizer::rendering::framebuffer::Framebuffer;
use cpu_rasterizer::rendering::rasterizer::{barycentric, Fragment};
use cpu_rasterizer::rendering::shading::{FragmentShader, Material, PixelShader};
use cpu_rasterizer::rendering::texture::{Texture, TextureRole};
use cpu_rasterizer::rendering::vertex_stage::{transform_vertices, TransformedMesh};
use cpu_rasterizer::scene::primitives;
use cpu_rasterizer::{Camera, RenderConfig, Scene, SoftwareRenderer};
use glam::{Vec2, Vec3};

fn demo_scene() -> Scene {
    let mut scene = Scene::new();
    let diffuse = scene.textures.add(Texture::checkerboard(
        256,
        8,
        [230, 120, 40, 255],
        [240, 240, 230, 255],
        TextureRole::Diffuse,
    ));
    let specular = scene
        .textures
        .add(Texture::solid([180, 180, 180, 255], TextureRole::Specular));

    let mut cube = primitives::cube(1.5).unwrap();
    cube.bind_texture(diffuse, &scene.textures).unwrap();
    cube.bind_texture(specular, &scene.textures).unwrap();
    cube.rotate_y(0.5);
    scene.add_mesh(cube);
    scene
}

fn camera(width: usize, height: usize) -> Camera {
    let mut camera = Camera::new(Vec3::new(0.0, 1.6, -4.0), width as f32 / height as f32);
    camera.look_at(Vec3::ZERO);
    camera
}

fn bench_full_frame(c: &mut Criterion) {
    let scene = demo_scene();
    let mut group = c.benchmark_group("full_frame");

    for &(width, height) in &[(640usize, 480usize), (1280, 720)] {
        let cam = camera(width, height);
        for parallel in [true, false] {
            let config = RenderConfig {
                parallel,
                ..RenderConfig::default()
            };
            let mut renderer = SoftwareRenderer::new(width, height).unwrap();
            let label = if parallel { "parallel" } else { "sequential" };

            group.bench_with_input(
                BenchmarkId::new(label, format!("{}x{}", width, height)),
                &config,
                |b, config| {
                    b.iter(|| black_box(renderer.render(&cam, &scene, config)));
                },
            );
        }
    }
    group.finish();
}

fn bench_framebuffer_clear(c: &mut Criterion) {
    c.bench_function("framebuffer_clear", |b| {
        let mut framebuffer = Framebuffer::new(1280, 720);
        b.iter(|| framebuffer.clear(black_box(0xFF636363)));
    });
}

fn bench_vertex_stage(c: &mut Criterion) {
    c.bench_function("vertex_stage_cube", |b| {
        let cube = primitives::cube(1.5).unwrap();
        let cam = camera(1280, 720);
        let view_proj = cam.view_projection_matrix();
        let mut out = TransformedMesh::default();

        b.iter(|| {
            transform_vertices(
                black_box(cube.vertices()),
                &cube.world_matrix(),
                &view_proj,
                cam.position(),
                Vec2::new(1280.0, 720.0),
                &mut out,
            );
        });
    });
}

fn bench_barycentric(c: &mut Criterion) {
    c.bench_function("barycentric", |b| {
        let tri = [
            Vec2::new(100.0, 100.0),
            Vec2::new(700.0, 100.0),
            Vec2::new(400.0, 500.0),
        ];
        b.iter(|| black_box(barycentric(black_box(tri), black_box(Vec2::new(400.0, 300.0)))));
    });
}

fn bench_pixel_shader(c: &mut Criterion) {
    let scene = demo_scene();
    let mesh = &scene.meshes()[0];
    let config = RenderConfig::default();
    let shader = PixelShader::new(Material::resolve(mesh.material(), &scene.textures), &config, false);
    let fragment = Fragment {
        normal: Vec3::new(0.0, 0.6, -0.8),
        tangent: Vec3::X,
        view_direction: Vec3::new(0.1, -0.3, 0.95).normalize(),
        uv: Vec2::new(0.3, 0.7),
        color: Vec3::ONE,
        depth: 0.998,
        ..Fragment::default()
    };

    c.bench_function("pixel_shader_combined", |b| {
        b.iter(|| black_box(shader.shade(black_box(&fragment), 0)));
    });
}

criterion_group!(
    benches,
    bench_full_frame,
    bench_framebuffer_clear,
    bench_vertex_stage,
    bench_barycentric,
    bench_pixel_shader
);
criterion_main!(benches);
