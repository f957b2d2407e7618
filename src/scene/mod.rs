/// Scene ownership: meshes plus the texture registry they reference.
pub mod mesh;
pub mod primitives;

pub use mesh::{CullMode, MaterialSlots, Mesh, PrimitiveTopology, Triangles, Vertex};

use crate::rendering::texture::TextureRegistry;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(usize);

#[derive(Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
    pub textures: TextureRegistry,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id.0)
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Meshes with the visibility flag set, in insertion order.
    pub fn visible_meshes(&self) -> impl Iterator<Item = &Mesh> {
        self.meshes.iter().filter(|m| m.is_visible())
    }
}
