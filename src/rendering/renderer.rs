/// Frame orchestrator.
///
/// Owns the back buffer, depth buffer and per-frame scratch geometry, and
/// drives Vertex Stage -> Clipper -> Rasterizer/Shader once per mesh.
///
/// Opaque triangle lists are rasterized in parallel by splitting the
/// framebuffer into horizontal stripes: every worker owns a disjoint set of
/// rows and replays the triangles binned to it in index order, so the result
/// is identical to sequential rendering without any per-pixel locking.
use super::clipper::{Clipper, Viewport};
use super::framebuffer::Framebuffer;
use super::rasterizer::Rasterizer;
use super::shading::{Material, PixelShader};
use super::texture::TextureRegistry;
use super::vertex_stage::{transform_vertices, TransformedMesh};
use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::perf::FrameStats;
use crate::perf_scope;
use crate::scene::{Mesh, PrimitiveTopology, Scene};
use glam::{Mat4, Vec2, Vec3};
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;

/// Stripes per worker thread; oversubscribed for load balancing.
const STRIPES_PER_THREAD: usize = 4;

pub struct SoftwareRenderer {
    framebuffer: Framebuffer,
    clipper: Clipper,
    geometry: TransformedMesh,
    stripe_bins: Vec<Vec<u32>>,
}

impl SoftwareRenderer {
    pub fn new(width: usize, height: usize) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        Ok(Self {
            framebuffer: Framebuffer::new(width, height),
            clipper: Clipper::new(Viewport::new(width as f32, height as f32)),
            geometry: TransformedMesh::default(),
            stripe_bins: Vec::new(),
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.framebuffer.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.framebuffer.height
    }

    #[inline]
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        self.framebuffer.resize(width, height);
        self.clipper
            .set_viewport(Viewport::new(width as f32, height as f32));
        Ok(())
    }

    /// Render every visible mesh of the scene.
    pub fn render(&mut self, camera: &Camera, scene: &Scene, config: &RenderConfig) -> FrameStats {
        let meshes: Vec<&Mesh> = scene.visible_meshes().collect();
        self.render_meshes(camera, &meshes, &scene.textures, config)
    }

    /// Render `meshes` in order against textures from `textures`.
    pub fn render_meshes(
        &mut self,
        camera: &Camera,
        meshes: &[&Mesh],
        textures: &TextureRegistry,
        config: &RenderConfig,
    ) -> FrameStats {
        let frame_start = Instant::now();

        self.framebuffer.clear(config.clear_color());

        let view_proj = camera.view_projection_matrix();
        let camera_position = camera.position();

        let mut stats = FrameStats::default();
        for mesh in meshes.iter().filter(|m| m.is_visible()) {
            stats.source_triangles += mesh.triangle_count();
            stats.clipped_triangles +=
                self.render_mesh(mesh, &view_proj, camera_position, textures, config);
            stats.meshes_rendered += 1;
        }

        stats.elapsed = frame_start.elapsed();
        log::debug!(
            "frame: {} meshes, {} -> {} triangles in {:.2}ms",
            stats.meshes_rendered,
            stats.source_triangles,
            stats.clipped_triangles,
            stats.elapsed_ms()
        );
        stats
    }

    /// Returns the number of post-clip triangles submitted to the rasterizer.
    fn render_mesh(
        &mut self,
        mesh: &Mesh,
        view_proj: &Mat4,
        camera_position: Vec3,
        textures: &TextureRegistry,
        config: &RenderConfig,
    ) -> usize {
        let Self {
            framebuffer,
            clipper,
            geometry,
            stripe_bins,
        } = self;

        let viewport = Vec2::new(framebuffer.width as f32, framebuffer.height as f32);
        {
            perf_scope!("vertex stage");
            transform_vertices(
                mesh.vertices(),
                &mesh.world_matrix(),
                view_proj,
                camera_position,
                viewport,
                geometry,
            );
        }

        let triangle_count = {
            perf_scope!("clipper");
            clipper.clip_mesh(mesh.triangles(), geometry)
        };
        if triangle_count == 0 {
            return 0;
        }

        let mut rasterizer = Rasterizer::new(config.cull_mode.unwrap_or(mesh.cull_mode));
        rasterizer.write_depth = !mesh.transparent;
        rasterizer.bounding_box_only = config.show_bounding_boxes;

        let material = Material::resolve(mesh.material(), textures);
        let shader = PixelShader::new(material, config, mesh.transparent);

        perf_scope!("rasterizer");
        let parallel = config.parallel
            && !mesh.transparent
            && mesh.topology() == PrimitiveTopology::TriangleList;

        if parallel {
            rasterize_striped(framebuffer, geometry, stripe_bins, &rasterizer, &shader);
        } else {
            // Blending is order dependent: one target, index order.
            let mut target = framebuffer.as_full_slice_mut();
            for t in 0..triangle_count {
                rasterizer.rasterize_triangle(geometry.triangle(t), geometry, &mut target, &shader);
            }
        }

        triangle_count
    }

    /// Write the current color buffer to a PNG file.
    pub fn save_buffer_to_image(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        self.framebuffer.save_png(path)
    }
}

/// Bin triangles into horizontal stripes by their raster y-range, then
/// rasterize every non-empty stripe on the rayon pool.
fn rasterize_striped(
    framebuffer: &mut Framebuffer,
    geometry: &TransformedMesh,
    stripe_bins: &mut Vec<Vec<u32>>,
    rasterizer: &Rasterizer,
    shader: &PixelShader<'_>,
) {
    let stripe_count = rayon::current_num_threads() * STRIPES_PER_THREAD;
    let stripe_h = framebuffer.stripe_height(stripe_count);
    let last_row = framebuffer.height.saturating_sub(1);

    // Resize and clear bins without deallocating inner Vec capacities
    if stripe_bins.len() < stripe_count {
        stripe_bins.resize(stripe_count, Vec::new());
    }
    for bin in stripe_bins.iter_mut() {
        bin.clear();
    }

    for t in 0..geometry.triangle_count() {
        let [a, b, c] = geometry.triangle(t);
        let ys = [
            geometry.raster[a as usize].y,
            geometry.raster[b as usize].y,
            geometry.raster[c as usize].y,
        ];
        let min_y = (ys[0].min(ys[1]).min(ys[2]) - 1.0).floor().max(0.0) as usize;
        let max_y = ((ys[0].max(ys[1]).max(ys[2]) + 1.0).floor().max(0.0) as usize).min(last_row);
        if min_y > max_y {
            continue;
        }

        let start = (min_y / stripe_h).min(stripe_count - 1);
        let end = (max_y / stripe_h).min(stripe_count - 1);
        for bin in &mut stripe_bins[start..=end] {
            bin.push(t as u32);
        }
    }

    let work_items: Vec<_> = framebuffer
        .split_into_stripes(stripe_count)
        .into_iter()
        .zip(stripe_bins.iter())
        .filter(|(_, bin)| !bin.is_empty())
        .collect();

    work_items.into_par_iter().for_each(|(mut slice, bin)| {
        for &t in bin {
            rasterizer.rasterize_triangle(geometry.triangle(t as usize), geometry, &mut slice, shader);
        }
    });
}
