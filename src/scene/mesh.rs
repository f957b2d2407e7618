/// Mesh data consumed by the rendering pipeline.
/// Vertex and index buffers are validated once at construction and never
/// touched by the renderer; per-frame geometry lives in the renderer's
/// scratch buffers.
use crate::error::MeshError;
use crate::rendering::texture::{TextureId, TextureRegistry, TextureRole};
use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Model-space vertex
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
    pub color: Vec3,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::NEG_Z,
            tangent: Vec3::X,
            uv: Vec2::ZERO,
            color: Vec3::ONE,
        }
    }
}

impl Vertex {
    pub fn new(position: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            uv,
            ..Self::default()
        }
    }

    pub fn with_normal(mut self, normal: Vec3, tangent: Vec3) -> Self {
        self.normal = normal;
        self.tangent = tangent;
        self
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    /// Triangle N uses indices [N, N+1, N+2], with the last two swapped on odd N.
    TriangleStrip,
}

/// Which facing is discarded. Front faces wind clockwise on screen.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CullMode {
    #[default]
    Back,
    Front,
    None,
}

impl CullMode {
    /// Cycle Back -> Front -> None -> Back
    pub fn next(self) -> Self {
        match self {
            CullMode::Back => CullMode::Front,
            CullMode::Front => CullMode::None,
            CullMode::None => CullMode::Back,
        }
    }
}

/// Texture slots resolved from each texture's role when it is bound.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MaterialSlots {
    pub diffuse: Option<TextureId>,
    pub normal: Option<TextureId>,
    pub specular: Option<TextureId>,
    pub glossiness: Option<TextureId>,
}

impl MaterialSlots {
    fn slot_mut(&mut self, role: TextureRole) -> &mut Option<TextureId> {
        match role {
            TextureRole::Diffuse => &mut self.diffuse,
            TextureRole::Normal => &mut self.normal,
            TextureRole::Specular => &mut self.specular,
            TextureRole::Glossiness => &mut self.glossiness,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    topology: PrimitiveTopology,
    world: Mat4,
    pub cull_mode: CullMode,
    pub transparent: bool,
    pub visible: bool,
    material: MaterialSlots,
}

impl Mesh {
    /// Validate index bounds and topology once; the renderer relies on both.
    pub fn new(
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        topology: PrimitiveTopology,
    ) -> Result<Self, MeshError> {
        match topology {
            PrimitiveTopology::TriangleList if indices.len() % 3 != 0 => {
                return Err(MeshError::IncompleteTriangleList { len: indices.len() });
            }
            PrimitiveTopology::TriangleStrip if !indices.is_empty() && indices.len() < 3 => {
                return Err(MeshError::StripTooShort { len: indices.len() });
            }
            _ => {}
        }

        if let Some(position) = indices.iter().position(|&i| i as usize >= vertices.len()) {
            return Err(MeshError::IndexOutOfBounds {
                index: indices[position],
                position,
                vertex_count: vertices.len(),
            });
        }

        Ok(Self {
            vertices,
            indices,
            topology,
            world: Mat4::IDENTITY,
            cull_mode: CullMode::default(),
            transparent: false,
            visible: true,
            material: MaterialSlots::default(),
        })
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    #[inline]
    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    pub fn set_world_matrix(&mut self, world: Mat4) {
        self.world = world;
    }

    /// Replace the translation, keeping rotation and scale.
    pub fn set_position(&mut self, position: Vec3) {
        self.world.w_axis = position.extend(1.0);
    }

    /// Rotate around the mesh's local Y axis.
    pub fn rotate_y(&mut self, angle: f32) {
        self.world *= Mat4::from_rotation_y(angle);
    }

    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn with_transparency(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub fn material(&self) -> &MaterialSlots {
        &self.material
    }

    /// Store `id` in the slot matching the texture's declared role.
    pub fn bind_texture(
        &mut self,
        id: TextureId,
        registry: &TextureRegistry,
    ) -> Result<(), MeshError> {
        let texture = registry
            .get(id)
            .ok_or(MeshError::UnknownTexture { id: id.0 })?;
        *self.material.slot_mut(texture.role()) = Some(id);
        Ok(())
    }

    pub fn triangle_count(&self) -> usize {
        match self.topology {
            PrimitiveTopology::TriangleList => self.indices.len() / 3,
            PrimitiveTopology::TriangleStrip => self.indices.len().saturating_sub(2),
        }
    }

    /// Source triangles in submission order, strips unrolled.
    pub fn triangles(&self) -> Triangles<'_> {
        Triangles {
            indices: &self.indices,
            topology: self.topology,
            next: 0,
            count: self.triangle_count(),
        }
    }
}

pub struct Triangles<'a> {
    indices: &'a [u32],
    topology: PrimitiveTopology,
    next: usize,
    count: usize,
}

impl Iterator for Triangles<'_> {
    type Item = [u32; 3];

    fn next(&mut self) -> Option<[u32; 3]> {
        if self.next >= self.count {
            return None;
        }
        let i = self.next;
        self.next += 1;

        let idx = self.indices;
        Some(match self.topology {
            PrimitiveTopology::TriangleList => [idx[i * 3], idx[i * 3 + 1], idx[i * 3 + 2]],
            PrimitiveTopology::TriangleStrip => {
                let swap = i % 2;
                [idx[i], idx[i + 1 + swap], idx[i + 2 - swap]]
            }
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Triangles<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::texture::Texture;

    fn verts(n: usize) -> Vec<Vertex> {
        (0..n)
            .map(|i| Vertex::new(Vec3::new(i as f32, 0.0, 0.0), Vec2::ZERO))
            .collect()
    }

    #[test]
    fn rejects_out_of_bounds_index() {
        let err = Mesh::new(verts(3), vec![0, 1, 3], PrimitiveTopology::TriangleList).unwrap_err();
        assert_eq!(
            err,
            MeshError::IndexOutOfBounds {
                index: 3,
                position: 2,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn rejects_partial_triangle_list_and_short_strip() {
        assert!(matches!(
            Mesh::new(verts(3), vec![0, 1], PrimitiveTopology::TriangleList),
            Err(MeshError::IncompleteTriangleList { len: 2 })
        ));
        assert!(matches!(
            Mesh::new(verts(3), vec![0, 1], PrimitiveTopology::TriangleStrip),
            Err(MeshError::StripTooShort { len: 2 })
        ));
    }

    #[test]
    fn strip_alternates_winding() {
        let mesh = Mesh::new(verts(5), vec![0, 1, 2, 3, 4], PrimitiveTopology::TriangleStrip).unwrap();
        let tris: Vec<_> = mesh.triangles().collect();
        assert_eq!(tris, vec![[0, 1, 2], [1, 3, 2], [2, 3, 4]]);
    }

    #[test]
    fn bind_texture_uses_declared_role() {
        let mut registry = TextureRegistry::new();
        let normal = registry.add(Texture::solid([128, 128, 255, 255], TextureRole::Normal));
        let mut mesh = Mesh::new(verts(3), vec![0, 1, 2], PrimitiveTopology::TriangleList).unwrap();

        mesh.bind_texture(normal, &registry).unwrap();
        assert_eq!(mesh.material().normal, Some(normal));
        assert_eq!(mesh.material().diffuse, None);

        let missing = TextureId(42);
        assert_eq!(
            mesh.bind_texture(missing, &registry),
            Err(MeshError::UnknownTexture { id: 42 })
        );
    }

    #[test]
    fn cull_mode_cycles_through_all_modes() {
        assert_eq!(CullMode::Back.next(), CullMode::Front);
        assert_eq!(CullMode::Front.next(), CullMode::None);
        assert_eq!(CullMode::None.next(), CullMode::Back);
    }
}
