/// Headless driver: builds a small demo scene, renders a fixed number of
/// frames and writes the last one to a PNG.
use clap::{Parser, ValueEnum};
use cpu_rasterizer::rendering::texture::{Texture, TextureRole};
use cpu_rasterizer::scene::primitives;
use cpu_rasterizer::*;
use glam::Vec3;
use mimalloc::MiMalloc;
use std::f32::consts::PI;
use std::path::PathBuf;
use std::time::Duration;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Fixed simulation step.
const FRAME_STEP: f32 = 1.0 / 60.0;
/// Cube spin in radians per second (45 degrees).
const ROTATION_SPEED: f32 = PI / 4.0;
const SLOW_FRAME_MS: f64 = 16.0;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LightingArg {
    ObservedArea,
    Diffuse,
    Specular,
    Combined,
}

impl From<LightingArg> for LightingMode {
    fn from(arg: LightingArg) -> Self {
        match arg {
            LightingArg::ObservedArea => LightingMode::ObservedArea,
            LightingArg::Diffuse => LightingMode::Diffuse,
            LightingArg::Specular => LightingMode::Specular,
            LightingArg::Combined => LightingMode::Combined,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cpu-rasterizer", about = "Software triangle rasterizer demo")]
struct Args {
    #[arg(long, default_value_t = 800)]
    width: usize,

    #[arg(long, default_value_t = 600)]
    height: usize,

    /// Number of frames to render before saving
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// RON file with render settings
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "frame.png")]
    output: PathBuf,

    /// Override the configured lighting mode
    #[arg(long, value_enum)]
    lighting: Option<LightingArg>,

    /// Rasterize on the calling thread only
    #[arg(long)]
    sequential: bool,

    /// env_logger filter, e.g. "debug" or "cpu_rasterizer=trace"
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    init_logging(LoggingConfig {
        filter: args.log_level.clone(),
        ..LoggingConfig::default()
    });

    let mut config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    if let Some(lighting) = args.lighting {
        config.lighting_mode = lighting.into();
    }
    if args.sequential {
        config.parallel = false;
    }

    log::info!("=== CPU Rasterizer ===");
    log::info!(
        "{}x{}, {} frames, {} worker threads, lighting {:?}, parallel {}",
        args.width,
        args.height,
        args.frames,
        rayon::current_num_threads(),
        config.lighting_mode,
        config.parallel
    );

    let (mut scene, cube_id) = build_demo_scene()?;

    let mut camera = Camera::new(
        Vec3::new(0.0, 1.6, -4.0),
        args.width as f32 / args.height.max(1) as f32,
    );
    camera.look_at(Vec3::ZERO);

    let mut renderer = SoftwareRenderer::new(args.width, args.height)?;

    RENDER_COUNTERS.reset();
    let mut total = Duration::ZERO;
    let mut slowest = Duration::ZERO;
    for frame in 0..args.frames {
        if let Some(cube) = scene.mesh_mut(cube_id) {
            cube.rotate_y(ROTATION_SPEED * FRAME_STEP);
        }

        let stats = renderer.render(&camera, &scene, &config);
        if stats.elapsed_ms() > SLOW_FRAME_MS {
            log::warn!("frame {} took {:.2}ms", frame, stats.elapsed_ms());
        }
        total += stats.elapsed;
        slowest = slowest.max(stats.elapsed);
    }

    if args.frames > 0 {
        let avg_ms = total.as_secs_f64() * 1000.0 / args.frames as f64;
        log::info!(
            "rendered {} frames: avg {:.2}ms ({:.1} fps), worst {:.2}ms",
            args.frames,
            avg_ms,
            1000.0 / avg_ms.max(f64::EPSILON),
            slowest.as_secs_f64() * 1000.0
        );
    }
    if cfg!(feature = "profiling") {
        RENDER_COUNTERS.snapshot().log_report();
    }

    renderer.save_buffer_to_image(&args.output)?;
    log::info!("saved {}", args.output.display());
    Ok(())
}

/// Textured, normal-mapped cube behind a transparent double-sided quad.
fn build_demo_scene() -> Result<(Scene, MeshId), Box<dyn std::error::Error>> {
    let mut scene = Scene::new();

    let diffuse = scene.textures.add(Texture::checkerboard(
        256,
        8,
        [230, 120, 40, 255],
        [240, 240, 230, 255],
        TextureRole::Diffuse,
    ));
    let normal = scene.textures.add(ridged_normal_map(128, 6)?);
    let specular = scene
        .textures
        .add(Texture::solid([180, 180, 180, 255], TextureRole::Specular));
    let glossiness = scene.textures.add(Texture::checkerboard(
        64,
        8,
        [255, 255, 255, 255],
        [60, 60, 60, 255],
        TextureRole::Glossiness,
    ));

    let mut cube = primitives::cube(1.5)?;
    for id in [diffuse, normal, specular, glossiness] {
        cube.bind_texture(id, &scene.textures)?;
    }
    let cube_id = scene.add_mesh(cube);

    let glass = scene.textures.add(Texture::checkerboard(
        64,
        4,
        [90, 160, 255, 140],
        [255, 255, 255, 0],
        TextureRole::Diffuse,
    ));
    let mut quad = primitives::quad(1.6, 1.6)?
        .with_cull_mode(CullMode::None)
        .with_transparency(true);
    quad.set_position(Vec3::new(0.7, 0.2, -1.6));
    quad.bind_texture(glass, &scene.textures)?;
    scene.add_mesh(quad);

    log::debug!(
        "demo scene: {} meshes, {} textures",
        scene.meshes().len(),
        scene.textures.len()
    );
    Ok((scene, cube_id))
}

/// Tangent-space normal map with sinusoidal ridges along u.
fn ridged_normal_map(size: u32, ridges: u32) -> Result<Texture, RenderError> {
    let texels = (0..size * size)
        .map(|i| {
            let u = (i % size) as f32 / size as f32;
            let slope = (u * ridges as f32 * 2.0 * PI).cos() * 0.4;
            let n = Vec3::new(-slope, 0.0, 1.0).normalize();
            let encoded = (n * 0.5 + Vec3::splat(0.5)) * 255.0;
            [encoded.x as u8, encoded.y as u8, encoded.z as u8, 255]
        })
        .collect();
    Texture::from_rgba8(size, size, texels, TextureRole::Normal)
}
