/// Procedural mesh generators with normals, tangents and UVs.
/// Faces wind clockwise when viewed from outside, which is front-facing for
/// the left-handed camera.
use super::mesh::{Mesh, PrimitiveTopology, Vertex};
use crate::error::MeshError;
use glam::{Vec2, Vec3};

/// Corners of a face: top-left, top-right, bottom-right, bottom-left.
fn face_vertices(center: Vec3, normal: Vec3, up: Vec3, half_w: f32, half_h: f32) -> [Vertex; 4] {
    let right = normal.cross(up);
    let corner = |sx: f32, sy: f32, uv: Vec2| {
        Vertex::new(center + right * (sx * half_w) + up * (sy * half_h), uv)
            .with_normal(normal, right)
    };
    [
        corner(-1.0, 1.0, Vec2::new(0.0, 0.0)),
        corner(1.0, 1.0, Vec2::new(1.0, 0.0)),
        corner(1.0, -1.0, Vec2::new(1.0, 1.0)),
        corner(-1.0, -1.0, Vec2::new(0.0, 1.0)),
    ]
}

/// Axis-aligned quad in the XY plane facing -Z.
pub fn quad(width: f32, height: f32) -> Result<Mesh, MeshError> {
    let vertices = face_vertices(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, width * 0.5, height * 0.5);
    Mesh::new(vertices.to_vec(), vec![0, 1, 2, 0, 2, 3], PrimitiveTopology::TriangleList)
}

/// Same quad expressed as a two-triangle strip.
pub fn quad_strip(width: f32, height: f32) -> Result<Mesh, MeshError> {
    let vertices = face_vertices(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, width * 0.5, height * 0.5);
    Mesh::new(vertices.to_vec(), vec![0, 1, 3, 2], PrimitiveTopology::TriangleStrip)
}

/// Cube centered at the origin with 4 unique vertices per face.
pub fn cube(size: f32) -> Result<Mesh, MeshError> {
    let h = size * 0.5;
    let faces = [
        (Vec3::NEG_Z, Vec3::Y),
        (Vec3::Z, Vec3::Y),
        (Vec3::X, Vec3::Y),
        (Vec3::NEG_X, Vec3::Y),
        (Vec3::Y, Vec3::Z),
        (Vec3::NEG_Y, Vec3::NEG_Z),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, up) in faces {
        let base = vertices.len() as u32;
        vertices.extend(face_vertices(normal * h, normal, up, h, h));
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh::new(vertices, indices, PrimitiveTopology::TriangleList)
}
