/// Vertex stage: model space to clip space, plus the per-vertex inputs the
/// shader needs. Output lives in [`TransformedMesh`], a scratch buffer the
/// renderer reuses across meshes and frames.
use crate::count_add;
use crate::perf::RENDER_COUNTERS;
use crate::scene::Vertex;
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Vertices with w at or below this are behind (or on) the eye plane and
/// cannot be perspective divided.
pub const W_EPSILON: f32 = 1e-5;

/// Transformed vertex.
///
/// After the stage, `position.xyz` is in normalized device coordinates and
/// `position.w` keeps the clip-space w for perspective-correct interpolation.
/// Vertices with `w <= W_EPSILON` keep their undivided clip coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VertexOut {
    pub position: Vec4,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
    pub color: Vec3,
    pub view_direction: Vec3,
}

impl VertexOut {
    #[inline]
    pub fn is_behind_eye(&self) -> bool {
        !(self.position.w > W_EPSILON)
    }

    /// True unless x, y in [-1, 1], z in [0, 1] and w is safely positive.
    #[inline]
    pub fn is_outside_frustum(&self) -> bool {
        let p = self.position;
        self.is_behind_eye()
            || !(-1.0..=1.0).contains(&p.x)
            || !(-1.0..=1.0).contains(&p.y)
            || !(0.0..=1.0).contains(&p.z)
    }

    /// Vertex at screen-space fraction `t` along the edge to `other`.
    ///
    /// NDC xyz are affine in screen space and blend linearly. 1/w blends
    /// linearly, so w is harmonic, and the remaining attributes use the
    /// perspective-corrected fraction `t * w / w_other`. Both endpoints must
    /// be in front of the eye.
    pub fn lerp_screen(&self, other: &VertexOut, t: f32) -> VertexOut {
        let (w, k) = if self.position.w == other.position.w {
            (self.position.w, t)
        } else {
            let w = 1.0 / ((1.0 - t) / self.position.w + t / other.position.w);
            (w, (t * w / other.position.w).clamp(0.0, 1.0))
        };

        VertexOut {
            position: self.position.truncate().lerp(other.position.truncate(), t).extend(w),
            normal: self.normal.lerp(other.normal, k).normalize_or_zero(),
            tangent: self.tangent.lerp(other.tangent, k).normalize_or_zero(),
            uv: self.uv.lerp(other.uv, k),
            color: self.color.lerp(other.color, k),
            view_direction: self
                .view_direction
                .lerp(other.view_direction, k)
                .normalize_or_zero(),
        }
    }
}

/// Per-frame geometry of one mesh: transformed vertices, their raster
/// positions (1:1 by index, clip-generated vertices appended), and the
/// post-clip working index list.
#[derive(Default)]
pub struct TransformedMesh {
    pub vertices: Vec<VertexOut>,
    pub raster: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl TransformedMesh {
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.raster.clear();
        self.indices.clear();
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn triangle(&self, t: usize) -> [u32; 3] {
        let i = t * 3;
        [self.indices[i], self.indices[i + 1], self.indices[i + 2]]
    }

    /// Append a vertex and its raster position, returning its index.
    pub fn push_vertex(&mut self, vertex: VertexOut, raster: Vec2) -> u32 {
        self.vertices.push(vertex);
        self.raster.push(raster);
        (self.vertices.len() - 1) as u32
    }
}

/// NDC to raster space: origin top-left, y down.
#[inline]
pub fn ndc_to_raster(ndc: Vec4, width: f32, height: f32) -> Vec2 {
    Vec2::new((ndc.x + 1.0) * 0.5 * width, (1.0 - ndc.y) * 0.5 * height)
}

/// Inverse of [`ndc_to_raster`].
#[inline]
pub fn raster_to_ndc(raster: Vec2, width: f32, height: f32) -> Vec2 {
    Vec2::new(raster.x / width * 2.0 - 1.0, 1.0 - raster.y / height * 2.0)
}

/// Transform one vertex.
#[inline]
pub fn transform_vertex(
    vertex: &Vertex,
    world: &Mat4,
    world_view_proj: &Mat4,
    camera_position: Vec3,
) -> VertexOut {
    let mut position = *world_view_proj * vertex.position.extend(1.0);
    if position.w > W_EPSILON {
        let inv_w = 1.0 / position.w;
        position.x *= inv_w;
        position.y *= inv_w;
        position.z *= inv_w;
    }

    let world_position = world.transform_point3(vertex.position);

    VertexOut {
        position,
        normal: world.transform_vector3(vertex.normal).normalize_or_zero(),
        tangent: world.transform_vector3(vertex.tangent).normalize_or_zero(),
        uv: vertex.uv,
        color: vertex.color,
        view_direction: (world_position - camera_position).normalize_or_zero(),
    }
}

/// Transform every vertex of a mesh into `out`, replacing its previous
/// contents. Raster positions are filled alongside.
pub fn transform_vertices(
    vertices: &[Vertex],
    world: &Mat4,
    view_proj: &Mat4,
    camera_position: Vec3,
    viewport: Vec2,
    out: &mut TransformedMesh,
) {
    out.clear();
    out.vertices.reserve(vertices.len());
    out.raster.reserve(vertices.len());

    let world_view_proj = *view_proj * *world;
    for vertex in vertices {
        let v = transform_vertex(vertex, world, &world_view_proj, camera_position);
        out.raster.push(ndc_to_raster(v.position, viewport.x, viewport.y));
        out.vertices.push(v);
    }

    count_add!(RENDER_COUNTERS.vertices_transformed, vertices.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perspective_divide_keeps_w() {
        let vertex = Vertex::new(Vec3::new(1.0, 1.0, 0.0), Vec2::ZERO);
        // Scale w by 2 so the divide is observable
        let m = Mat4::from_cols(Vec4::X, Vec4::Y, Vec4::Z, Vec4::new(0.0, 0.0, 0.0, 2.0));
        let out = transform_vertex(&vertex, &Mat4::IDENTITY, &m, Vec3::new(0.0, 0.0, -1.0));

        assert_eq!(out.position, Vec4::new(0.5, 0.5, 0.0, 2.0));
        let expected_view = Vec3::new(1.0, 1.0, 1.0).normalize();
        assert!(out.view_direction.abs_diff_eq(expected_view, 1e-6));
    }

    #[test]
    fn normals_ignore_translation_and_are_normalized() {
        let vertex = Vertex::new(Vec3::ZERO, Vec2::ZERO).with_normal(Vec3::Y, Vec3::X);
        let world = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)) * Mat4::from_scale(Vec3::splat(3.0));
        let out = transform_vertex(&vertex, &world, &Mat4::IDENTITY, Vec3::ZERO);

        assert!(out.normal.abs_diff_eq(Vec3::Y, 1e-6));
        assert!(out.tangent.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn vertex_on_eye_plane_is_not_divided() {
        let vertex = Vertex::new(Vec3::new(1.0, 2.0, 3.0), Vec2::ZERO);
        let zero_w = Mat4::from_cols(Vec4::X, Vec4::Y, Vec4::Z, Vec4::ZERO);
        let out = transform_vertex(&vertex, &Mat4::IDENTITY, &zero_w, Vec3::ZERO);

        assert!(out.is_behind_eye());
        assert!(out.is_outside_frustum());
        assert!(out.position.x.is_finite());
    }

    #[test]
    fn screen_lerp_corrects_for_perspective() {
        let near = VertexOut {
            position: Vec4::new(0.0, 0.0, 0.2, 1.0),
            uv: Vec2::ZERO,
            ..VertexOut::default()
        };
        let far = VertexOut {
            position: Vec4::new(1.0, 0.0, 0.8, 3.0),
            uv: Vec2::ONE,
            ..VertexOut::default()
        };
        let mid = near.lerp_screen(&far, 0.5);

        // Screen-affine terms stay linear
        assert!((mid.position.x - 0.5).abs() < 1e-6);
        assert!((mid.position.z - 0.5).abs() < 1e-6);
        // 1/w = (1 + 1/3) / 2
        assert!((mid.position.w - 1.5).abs() < 1e-6);
        // (0.5 / 3) / (2/3) = 0.25
        assert!((mid.uv.x - 0.25).abs() < 1e-6);

        let flat_far = VertexOut {
            position: Vec4::new(1.0, 0.0, 0.8, 1.0),
            ..far
        };
        let same_w = near.lerp_screen(&flat_far, 0.5);
        assert!((same_w.uv.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn raster_mapping_round_trips() {
        let ndc = Vec4::new(-0.5, 0.25, 0.5, 1.0);
        let raster = ndc_to_raster(ndc, 800.0, 600.0);
        assert_eq!(raster, Vec2::new(200.0, 225.0));
        assert!(raster_to_ndc(raster, 800.0, 600.0).abs_diff_eq(Vec2::new(-0.5, 0.25), 1e-6));
    }
}
