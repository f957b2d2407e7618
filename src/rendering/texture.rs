/// RGBA8 textures, their material role, and the registry that owns them.
/// Texture data is immutable once registered and shared read-only across
/// rasterization workers.
use crate::error::RenderError;
use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Which material slot a texture feeds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureRole {
    Diffuse,
    Normal,
    Specular,
    Glossiness,
}

#[derive(Clone, Debug)]
pub struct Texture {
    width: u32,
    height: u32,
    role: TextureRole,
    texels: Vec<[u8; 4]>,
}

impl Texture {
    /// Build from row-major RGBA8 texels.
    pub fn from_rgba8(
        width: u32,
        height: u32,
        texels: Vec<[u8; 4]>,
        role: TextureRole,
    ) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize;
        if expected == 0 || texels.len() != expected {
            return Err(RenderError::TextureSize {
                width,
                height,
                expected,
                actual: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            role,
            texels,
        })
    }

    /// Copy an already-decoded image.
    pub fn from_image(image: &image::RgbaImage, role: TextureRole) -> Result<Self, RenderError> {
        let texels = image.pixels().map(|p| p.0).collect();
        Self::from_rgba8(image.width(), image.height(), texels, role)
    }

    /// 1x1 texture of a single color.
    pub fn solid(rgba: [u8; 4], role: TextureRole) -> Self {
        Self {
            width: 1,
            height: 1,
            role,
            texels: vec![rgba],
        }
    }

    /// Two-color checkerboard with `cells` squares per side.
    pub fn checkerboard(size: u32, cells: u32, a: [u8; 4], b: [u8; 4], role: TextureRole) -> Self {
        let size = size.max(1);
        let side = size as usize;
        let cell = (side / cells.max(1) as usize).max(1);
        let texels = (0..side * side)
            .map(|i| {
                let (x, y) = (i % side, i / side);
                if ((x / cell) + (y / cell)) % 2 == 0 {
                    a
                } else {
                    b
                }
            })
            .collect();
        Self {
            width: size,
            height: size,
            role,
            texels,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn role(&self) -> TextureRole {
        self.role
    }

    /// Nearest-texel lookup; UVs tile by their fractional part.
    #[inline]
    pub fn texel(&self, uv: Vec2) -> [u8; 4] {
        let u = uv.x - uv.x.floor();
        let v = uv.y - uv.y.floor();
        let width = self.width as usize;
        let x = ((u * self.width as f32) as usize).min(width - 1);
        let y = ((v * self.height as f32) as usize).min(self.height as usize - 1);
        self.texels[y * width + x]
    }

    /// Sample as normalized RGBA in [0, 1].
    #[inline]
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let [r, g, b, a] = self.texel(uv);
        Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0
    }

    #[inline]
    pub fn sample_rgb(&self, uv: Vec2) -> Vec3 {
        self.sample(uv).truncate()
    }
}

/// Handle into a [`TextureRegistry`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) usize);

/// Owns every texture of a scene; meshes refer to entries by id.
#[derive(Default)]
pub struct TextureRegistry {
    textures: Vec<Texture>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, texture: Texture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    #[inline]
    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
