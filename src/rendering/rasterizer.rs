/// Triangle rasterizer using edge functions.
/// Walks the bounding box of each clipped triangle in scanline order,
/// stepping the three edge functions incrementally, and hands every covered,
/// depth-accepted pixel to a [`FragmentShader`].
use super::framebuffer::FrameSlice;
use super::shading::FragmentShader;
use super::vertex_stage::{TransformedMesh, VertexOut};
use crate::count_call;
use crate::perf::RENDER_COUNTERS;
use crate::scene::CullMode;
use glam::{Vec2, Vec3};

/// Triangles with less than this much doubled area are skipped.
pub const AREA_EPSILON: f32 = f32::EPSILON;

/// Bounding-box visualization color.
const BOUNDING_BOX_COLOR: u32 = 0xFFFFFFFF;

/// Abstraction over a render target that supports depth-tested pixel writes.
pub trait PixelTarget {
    /// Full framebuffer width (stride for indexing).
    fn width(&self) -> usize;
    /// Full framebuffer height.
    fn full_height(&self) -> usize;
    /// Rectangle covered by this target in framebuffer coordinates:
    /// (x0, y0, width, height).
    fn rect(&self) -> (usize, usize, usize, usize);
    /// Depth test at global (x, y); nearest wins and ties pass. Returns the
    /// target-local index on success, storing the depth if `write_depth`.
    fn test_depth(&mut self, x: usize, y: usize, depth: f32, write_depth: bool) -> Option<usize>;
    /// Target-local index of (x, y) without any depth test.
    fn pixel_index(&self, x: usize, y: usize) -> Option<usize>;
    fn color_at(&self, index: usize) -> u32;
    fn write_color(&mut self, index: usize, color: u32);

    /// True when global row `y` lies inside this target.
    #[inline]
    fn owns_row(&self, y: usize) -> bool {
        let (_, y0, _, height) = self.rect();
        y >= y0 && y < y0 + height
    }
}

impl<'a> PixelTarget for FrameSlice<'a> {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn full_height(&self) -> usize {
        self.full_height
    }

    #[inline]
    fn rect(&self) -> (usize, usize, usize, usize) {
        (0, self.y0, self.width, self.height)
    }

    #[inline]
    fn test_depth(&mut self, x: usize, y: usize, depth: f32, write_depth: bool) -> Option<usize> {
        FrameSlice::test_depth(self, x, y, depth, write_depth)
    }

    #[inline]
    fn pixel_index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y >= self.y0 && y < self.y0 + self.height)
            .then(|| (y - self.y0) * self.width + x)
    }

    #[inline]
    fn color_at(&self, index: usize) -> u32 {
        self.color[index]
    }

    #[inline]
    fn write_color(&mut self, index: usize, color: u32) {
        self.color[index] = color;
    }
}

/// Interpolated attributes of one covered pixel.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Fragment {
    pub x: usize,
    pub y: usize,
    /// Linear index into the full framebuffer.
    pub pixel_index: usize,
    pub depth: f32,
    pub uv: Vec2,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub view_direction: Vec3,
    pub color: Vec3,
}

/// Inclusive pixel rectangle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

/// Doubled signed area of (a, b, p). Positive when a, b, p run clockwise on
/// screen (raster y points down).
#[inline(always)]
pub fn edge_function(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}

/// Barycentric weights of `p`, or None for a degenerate triangle.
pub fn barycentric(raster: [Vec2; 3], p: Vec2) -> Option<Vec3> {
    let area = edge_function(raster[0], raster[1], raster[2]);
    if area.is_nan() || area.abs() < AREA_EPSILON {
        return None;
    }
    Some(
        Vec3::new(
            edge_function(raster[1], raster[2], p),
            edge_function(raster[2], raster[0], p),
            edge_function(raster[0], raster[1], p),
        ) / area,
    )
}

/// Screen-space weights to perspective-correct weights given each vertex's
/// clip-space w: `(b_i / w_i) / sum(b_j / w_j)`.
#[inline]
pub fn perspective_weights(barycentric: Vec3, w: [f32; 3]) -> Vec3 {
    let over_w = barycentric / Vec3::from(w);
    let inv_w = over_w.x + over_w.y + over_w.z;
    over_w / inv_w
}

/// 2D bounding box grown by one pixel on each side, clamped to the buffer.
pub fn bounding_box(raster: [Vec2; 3], width: usize, height: usize) -> Option<PixelRect> {
    if width == 0 || height == 0 {
        return None;
    }
    let min = raster[0].min(raster[1]).min(raster[2]);
    let max = raster[0].max(raster[1]).max(raster[2]);

    let min_x = (min.x - 1.0).floor().max(0.0) as usize;
    let min_y = (min.y - 1.0).floor().max(0.0) as usize;
    let max_x = ((max.x + 1.0).floor().max(0.0) as usize).min(width - 1);
    let max_y = ((max.y + 1.0).floor().max(0.0) as usize).min(height - 1);

    (min_x <= max_x && min_y <= max_y).then_some(PixelRect {
        min_x,
        min_y,
        max_x,
        max_y,
    })
}

/// First row of the padded bounding box, clamped to the buffer. Per-triangle
/// counters are recorded only by the target owning this row, so stripes
/// count every triangle once.
#[inline]
pub fn first_row(raster: [Vec2; 3], height: usize) -> usize {
    let min_y = raster[0].y.min(raster[1].y).min(raster[2].y);
    ((min_y - 1.0).floor().max(0.0) as usize).min(height.saturating_sub(1))
}

/// Per-mesh rasterization settings.
#[derive(Copy, Clone, Debug)]
pub struct Rasterizer {
    pub cull_mode: CullMode,
    /// False for transparent meshes: they test depth but never store it.
    pub write_depth: bool,
    /// Fill each triangle's bounding box with white instead of shading.
    pub bounding_box_only: bool,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(CullMode::Back)
    }
}

impl Rasterizer {
    pub fn new(cull_mode: CullMode) -> Self {
        Self {
            cull_mode,
            write_depth: true,
            bounding_box_only: false,
        }
    }

    /// Rasterize triangle `triangle` of `mesh` into `target`.
    /// Returns true if any pixel was written.
    pub fn rasterize_triangle<T, S>(
        &self,
        triangle: [u32; 3],
        mesh: &TransformedMesh,
        target: &mut T,
        shader: &S,
    ) -> bool
    where
        T: PixelTarget,
        S: FragmentShader + ?Sized,
    {
        let [i0, i1, i2] = triangle;
        let p0 = mesh.raster[i0 as usize];
        let p1 = mesh.raster[i1 as usize];
        let p2 = mesh.raster[i2 as usize];
        let counted = cfg!(feature = "profiling")
            && target.owns_row(first_row([p0, p1, p2], target.full_height()));

        if i0 == i1 || i1 == i2 || i0 == i2 {
            if counted {
                count_call!(RENDER_COUNTERS.triangles_rejected);
            }
            return false;
        }

        let v0 = &mesh.vertices[i0 as usize];
        let v1 = &mesh.vertices[i1 as usize];
        let v2 = &mesh.vertices[i2 as usize];
        if v0.is_outside_frustum() || v1.is_outside_frustum() || v2.is_outside_frustum() {
            if counted {
                count_call!(RENDER_COUNTERS.triangles_rejected);
            }
            return false;
        }

        let area = edge_function(p0, p1, p2);
        if area.is_nan() || area.abs() < AREA_EPSILON {
            if counted {
                count_call!(RENDER_COUNTERS.triangles_rejected);
            }
            return false;
        }

        let culled = match self.cull_mode {
            CullMode::Back => area < 0.0,
            CullMode::Front => area > 0.0,
            CullMode::None => false,
        };
        if culled {
            if counted {
                count_call!(RENDER_COUNTERS.triangles_culled);
            }
            return false;
        }

        let Some(bbox) = self.clip_to_target([p0, p1, p2], target) else {
            return false;
        };
        if counted {
            count_call!(RENDER_COUNTERS.triangles_rasterized);
        }

        if self.bounding_box_only {
            return Self::fill_bounding_box(bbox, target);
        }

        let inv_area = 1.0 / area;
        let front = area > 0.0;
        let z = Vec3::new(v0.position.z, v1.position.z, v2.position.z);
        let w = [v0.position.w, v1.position.w, v2.position.w];
        let verts = [v0, v1, v2];
        let stride = target.width();

        // Edge deltas per pixel step in x
        let edge0_dx = p1.y - p2.y;
        let edge1_dx = p2.y - p0.y;
        let edge2_dx = p0.y - p1.y;

        let mut any_drawn = false;

        for y in bbox.min_y..=bbox.max_y {
            // Rows restart from an exact evaluation so results do not depend
            // on which row the target begins at.
            let row_start = Vec2::new(bbox.min_x as f32 + 0.5, y as f32 + 0.5);
            let mut w0 = edge_function(p1, p2, row_start);
            let mut w1 = edge_function(p2, p0, row_start);
            let mut w2 = edge_function(p0, p1, row_start);

            for x in bbox.min_x..=bbox.max_x {
                let covered = if front {
                    w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0
                } else {
                    w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0
                };

                if covered {
                    count_call!(RENDER_COUNTERS.pixels_tested);

                    let weights = Vec3::new(w0, w1, w2) * inv_area;
                    let depth = weights.dot(z);

                    if let Some(idx) = target.test_depth(x, y, depth, self.write_depth) {
                        count_call!(RENDER_COUNTERS.depth_passed);

                        let mut fragment = interpolate(&verts, perspective_weights(weights, w));
                        fragment.x = x;
                        fragment.y = y;
                        fragment.pixel_index = y * stride + x;
                        fragment.depth = depth;

                        let background = target.color_at(idx);
                        if let Some(color) = shader.shade(&fragment, background) {
                            count_call!(RENDER_COUNTERS.pixels_shaded);
                            target.write_color(idx, color);
                            any_drawn = true;
                        } else {
                            count_call!(RENDER_COUNTERS.transparent_skipped);
                        }
                    } else {
                        count_call!(RENDER_COUNTERS.depth_failed);
                    }
                }

                w0 += edge0_dx;
                w1 += edge1_dx;
                w2 += edge2_dx;
            }
        }

        any_drawn
    }

    /// Bounding box intersected with the target's rectangle.
    fn clip_to_target<T: PixelTarget>(&self, raster: [Vec2; 3], target: &T) -> Option<PixelRect> {
        let bbox = bounding_box(raster, target.width(), target.full_height())?;
        let (tx0, ty0, tw, th) = target.rect();
        if tw == 0 || th == 0 {
            return None;
        }

        let rect = PixelRect {
            min_x: bbox.min_x.max(tx0),
            min_y: bbox.min_y.max(ty0),
            max_x: bbox.max_x.min(tx0 + tw - 1),
            max_y: bbox.max_y.min(ty0 + th - 1),
        };
        (rect.min_x <= rect.max_x && rect.min_y <= rect.max_y).then_some(rect)
    }

    fn fill_bounding_box<T: PixelTarget>(bbox: PixelRect, target: &mut T) -> bool {
        for y in bbox.min_y..=bbox.max_y {
            for x in bbox.min_x..=bbox.max_x {
                if let Some(idx) = target.pixel_index(x, y) {
                    target.write_color(idx, BOUNDING_BOX_COLOR);
                }
            }
        }
        true
    }
}

/// Blend vertex attributes with perspective-correct weights.
#[inline]
fn interpolate(v: &[&VertexOut; 3], k: Vec3) -> Fragment {
    Fragment {
        uv: v[0].uv * k.x + v[1].uv * k.y + v[2].uv * k.z,
        normal: (v[0].normal * k.x + v[1].normal * k.y + v[2].normal * k.z).normalize_or_zero(),
        tangent: (v[0].tangent * k.x + v[1].tangent * k.y + v[2].tangent * k.z).normalize_or_zero(),
        view_direction: (v[0].view_direction * k.x
            + v[1].view_direction * k.y
            + v[2].view_direction * k.z)
            .normalize_or_zero(),
        color: v[0].color * k.x + v[1].color * k.y + v[2].color * k.z,
        ..Fragment::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::vertex_stage::raster_to_ndc;
    use glam::Vec4;

    struct TestTarget {
        width: usize,
        height: usize,
        color: Vec<u32>,
        depth: Vec<f32>,
        pub pixels_written: usize,
    }

    impl TestTarget {
        fn new(width: usize, height: usize) -> Self {
            let len = width * height;
            Self {
                width,
                height,
                color: vec![0; len],
                depth: vec![f32::INFINITY; len],
                pixels_written: 0,
            }
        }
    }

    impl PixelTarget for TestTarget {
        fn width(&self) -> usize {
            self.width
        }

        fn full_height(&self) -> usize {
            self.height
        }

        fn rect(&self) -> (usize, usize, usize, usize) {
            (0, 0, self.width, self.height)
        }

        fn test_depth(&mut self, x: usize, y: usize, depth: f32, write_depth: bool) -> Option<usize> {
            let idx = self.pixel_index(x, y)?;
            if depth <= self.depth[idx] {
                if write_depth {
                    self.depth[idx] = depth;
                }
                Some(idx)
            } else {
                None
            }
        }

        fn pixel_index(&self, x: usize, y: usize) -> Option<usize> {
            (x < self.width && y < self.height).then(|| y * self.width + x)
        }

        fn color_at(&self, index: usize) -> u32 {
            self.color[index]
        }

        fn write_color(&mut self, index: usize, color: u32) {
            self.color[index] = color;
            self.pixels_written += 1;
        }
    }

    /// Writes a fixed color for every fragment.
    struct Flat(u32);

    impl FragmentShader for Flat {
        fn shade(&self, _fragment: &Fragment, _background: u32) -> Option<u32> {
            Some(self.0)
        }
    }

    fn mesh(points: &[(f32, f32)], z: f32, size: (f32, f32)) -> TransformedMesh {
        let mut mesh = TransformedMesh::default();
        for &(x, y) in points {
            let raster = Vec2::new(x, y);
            let ndc = raster_to_ndc(raster, size.0, size.1);
            mesh.push_vertex(
                VertexOut {
                    position: Vec4::new(ndc.x, ndc.y, z, 1.0),
                    ..VertexOut::default()
                },
                raster,
            );
        }
        mesh
    }

    #[test]
    fn clockwise_triangle_is_drawn_and_counter_clockwise_is_culled() {
        let m = mesh(&[(1.0, 1.0), (7.0, 1.0), (1.0, 7.0)], 0.5, (8.0, 8.0));
        let rasterizer = Rasterizer::new(CullMode::Back);

        let mut target = TestTarget::new(8, 8);
        assert!(rasterizer.rasterize_triangle([0, 1, 2], &m, &mut target, &Flat(1)));
        assert!(target.pixels_written > 0);

        let mut target = TestTarget::new(8, 8);
        assert!(!rasterizer.rasterize_triangle([0, 2, 1], &m, &mut target, &Flat(1)));
        assert_eq!(target.pixels_written, 0, "back face should be culled");
    }

    #[test]
    fn front_cull_and_no_cull_select_expected_faces() {
        let m = mesh(&[(1.0, 1.0), (7.0, 1.0), (1.0, 7.0)], 0.5, (8.0, 8.0));

        let front = Rasterizer::new(CullMode::Front);
        let mut target = TestTarget::new(8, 8);
        assert!(!front.rasterize_triangle([0, 1, 2], &m, &mut target, &Flat(1)));
        assert!(front.rasterize_triangle([0, 2, 1], &m, &mut target, &Flat(1)));

        let none = Rasterizer::new(CullMode::None);
        let mut cw = TestTarget::new(8, 8);
        let mut ccw = TestTarget::new(8, 8);
        none.rasterize_triangle([0, 1, 2], &m, &mut cw, &Flat(1));
        none.rasterize_triangle([0, 2, 1], &m, &mut ccw, &Flat(1));
        assert_eq!(cw.color, ccw.color, "both windings should cover the same pixels");
    }

    #[test]
    fn vertex_outside_depth_range_rejects_triangle() {
        let mut m = mesh(&[(1.0, 1.0), (7.0, 1.0), (1.0, 7.0)], 0.5, (8.0, 8.0));
        m.vertices[1].position.z = 1.5;
        let mut target = TestTarget::new(8, 8);
        assert!(!Rasterizer::default().rasterize_triangle([0, 1, 2], &m, &mut target, &Flat(1)));
        assert_eq!(target.pixels_written, 0);
    }

    #[test]
    fn zero_area_triangle_is_rejected() {
        let m = mesh(&[(1.0, 1.0), (4.0, 4.0), (7.0, 7.0)], 0.5, (8.0, 8.0));
        let mut target = TestTarget::new(8, 8);
        let rasterizer = Rasterizer::new(CullMode::None);
        assert!(!rasterizer.rasterize_triangle([0, 1, 2], &m, &mut target, &Flat(1)));
    }

    #[test]
    fn transparent_mode_leaves_depth_untouched() {
        let m = mesh(&[(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)], 0.25, (8.0, 8.0));
        let mut rasterizer = Rasterizer::new(CullMode::Back);
        rasterizer.write_depth = false;

        let mut target = TestTarget::new(8, 8);
        assert!(rasterizer.rasterize_triangle([0, 1, 2], &m, &mut target, &Flat(7)));
        assert!(target.depth.iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn bounding_box_mode_fills_whole_box() {
        let m = mesh(&[(2.0, 2.0), (5.0, 2.0), (2.0, 5.0)], 0.5, (8.0, 8.0));
        let mut rasterizer = Rasterizer::new(CullMode::Back);
        rasterizer.bounding_box_only = true;

        let mut target = TestTarget::new(8, 8);
        rasterizer.rasterize_triangle([0, 1, 2], &m, &mut target, &Flat(1));
        // Box [1, 6] x [1, 6]
        assert_eq!(target.pixels_written, 36);
        assert_eq!(target.color[6 * 8 + 6], BOUNDING_BOX_COLOR);
        assert_eq!(target.color[0], 0);
    }

    #[test]
    fn exactly_one_stripe_owns_a_tall_triangle() {
        use crate::rendering::framebuffer::Framebuffer;

        let raster = [Vec2::new(1.0, 2.5), Vec2::new(7.0, 9.0), Vec2::new(2.0, 14.0)];
        let mut fb = Framebuffer::new(8, 16);
        let row = first_row(raster, 16);
        assert_eq!(row, 1);
        assert!(fb.as_full_slice_mut().owns_row(row));

        let stripes = fb.split_into_stripes(4);
        let owners = stripes.iter().filter(|s| s.owns_row(row)).count();
        assert_eq!(owners, 1);

        // Above the buffer clamps to the top row, below to the last
        assert_eq!(first_row([Vec2::new(0.0, -20.0); 3], 16), 0);
        assert_eq!(first_row([Vec2::new(0.0, 40.0); 3], 16), 15);
    }

    #[test]
    fn perspective_weights_favor_nearer_vertex() {
        let b = Vec3::new(0.5, 0.5, 0.0);
        let k = perspective_weights(b, [1.0, 3.0, 1.0]);
        assert!((k.x - 0.75).abs() < 1e-6);
        assert!((k.y - 0.25).abs() < 1e-6);
        assert!((k.x + k.y + k.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn barycentric_of_vertex_is_unit_vector() {
        let tri = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)];
        let b = barycentric(tri, Vec2::new(10.0, 0.0)).unwrap();
        assert!(b.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6));
        assert!(barycentric([Vec2::ZERO; 3], Vec2::ONE).is_none());
    }
}
