/// Per-pixel shading.
/// Kept separate from the rasterizer so lighting models can evolve
/// independently of coverage and depth handling.
use super::framebuffer::{rgb_to_u32, u32_to_rgb};
use super::rasterizer::Fragment;
use super::texture::{Texture, TextureRegistry};
use crate::config::{LightSettings, LightingMode, RenderConfig};
use crate::scene::MaterialSlots;
use glam::{Mat3, Vec3, Vec4};
use std::f32::consts::PI;

/// Alpha at or below this is treated as fully transparent.
pub const ALPHA_EPSILON: f32 = 1e-4;

/// Turns an interpolated fragment into a packed ARGB color.
/// `background` is the color currently stored at the pixel; returning None
/// leaves the pixel untouched.
pub trait FragmentShader {
    fn shade(&self, fragment: &Fragment, background: u32) -> Option<u32>;
}

/// Borrowed view of a mesh's bound textures.
#[derive(Copy, Clone, Debug, Default)]
pub struct Material<'a> {
    pub diffuse: Option<&'a Texture>,
    pub normal: Option<&'a Texture>,
    pub specular: Option<&'a Texture>,
    pub glossiness: Option<&'a Texture>,
}

impl<'a> Material<'a> {
    pub fn resolve(slots: &MaterialSlots, registry: &'a TextureRegistry) -> Self {
        Self {
            diffuse: slots.diffuse.and_then(|id| registry.get(id)),
            normal: slots.normal.and_then(|id| registry.get(id)),
            specular: slots.specular.and_then(|id| registry.get(id)),
            glossiness: slots.glossiness.and_then(|id| registry.get(id)),
        }
    }
}

/// Lambertian diffuse BRDF.
#[inline]
pub fn lambert(diffuse: Vec3) -> Vec3 {
    diffuse / PI
}

/// Phong lobe: reflect `to_light` about `normal` and compare with the
/// direction the eye looks along.
#[inline]
pub fn phong(exponent: f32, to_light: Vec3, view_direction: Vec3, normal: Vec3) -> f32 {
    let reflected = to_light - 2.0 * normal.dot(to_light) * normal;
    reflected.dot(view_direction).max(0.0).powf(exponent)
}

/// Scale down uniformly so no channel exceeds 1.
#[inline]
pub fn max_to_one(color: Vec3) -> Vec3 {
    let max = color.max_element();
    if max > 1.0 {
        color / max
    } else {
        color
    }
}

/// Map `value` from [min, max] to [0, 1], clamped.
#[inline]
pub fn remap(value: f32, min: f32, max: f32) -> f32 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// `background * (1 - alpha) + sample * alpha`
#[inline]
pub fn blend(background: Vec3, sample: Vec3, alpha: f32) -> Vec3 {
    background * (1.0 - alpha) + sample * alpha
}

/// Clamp to [0, 1] after `max_to_one` and pack as ARGB.
#[inline]
pub fn color_to_u32(color: Vec3) -> u32 {
    let c = (max_to_one(color).clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    rgb_to_u32(c.x as u8, c.y as u8, c.z as u8)
}

#[inline]
pub fn u32_to_color(argb: u32) -> Vec3 {
    let (r, g, b) = u32_to_rgb(argb);
    Vec3::new(r as f32, g as f32, b as f32) / 255.0
}

/// The renderer's pixel shader: visualization overrides, optional normal
/// mapping, the lighting-mode switch and the transparency path.
#[derive(Copy, Clone, Debug)]
pub struct PixelShader<'a> {
    pub material: Material<'a>,
    pub light: LightSettings,
    pub lighting_mode: LightingMode,
    pub normal_mapping: bool,
    pub show_depth: bool,
    pub depth_range: (f32, f32),
    pub transparent: bool,
}

impl<'a> PixelShader<'a> {
    pub fn new(material: Material<'a>, config: &RenderConfig, transparent: bool) -> Self {
        let mut light = config.light;
        light.direction = light.direction.normalize_or_zero();
        Self {
            material,
            light,
            lighting_mode: config.lighting_mode,
            normal_mapping: config.normal_mapping,
            show_depth: config.show_depth,
            depth_range: config.depth_range,
            transparent,
        }
    }

    /// Diffuse color and alpha; vertex color when no diffuse map is bound.
    #[inline]
    fn diffuse_sample(&self, fragment: &Fragment) -> Vec4 {
        match self.material.diffuse {
            Some(texture) => texture.sample(fragment.uv),
            None => fragment.color.extend(1.0),
        }
    }

    /// Geometric normal, or the normal map transformed out of tangent space.
    pub fn shading_normal(&self, fragment: &Fragment) -> Vec3 {
        let Some(normal_map) = self.material.normal.filter(|_| self.normal_mapping) else {
            return fragment.normal;
        };

        let binormal = fragment.normal.cross(fragment.tangent);
        let tangent_space = Mat3::from_cols(fragment.tangent, binormal, fragment.normal);
        let sample = normal_map.sample_rgb(fragment.uv) * 2.0 - Vec3::ONE;
        (tangent_space * sample).normalize_or_zero()
    }

    /// Phong term scaled by the specular map; zero without a specular map.
    fn specular(&self, fragment: &Fragment, normal: Vec3) -> Vec3 {
        let Some(specular_map) = self.material.specular else {
            return Vec3::ZERO;
        };
        let gloss = self
            .material
            .glossiness
            .map_or(1.0, |t| t.sample(fragment.uv).x);
        let exponent = self.light.shininess * gloss;
        specular_map.sample_rgb(fragment.uv)
            * phong(exponent, -self.light.direction, fragment.view_direction, normal)
    }

    /// Linear lighting result for the active mode, before `max_to_one`.
    pub fn lighting(&self, fragment: &Fragment) -> Vec3 {
        let normal = self.shading_normal(fragment);
        let observed_area = normal.dot(-self.light.direction).max(0.0);
        let intensity = self.light.intensity;

        match self.lighting_mode {
            LightingMode::ObservedArea => Vec3::splat(observed_area),
            LightingMode::Diffuse => {
                intensity * observed_area * lambert(self.diffuse_sample(fragment).truncate())
            }
            LightingMode::Specular => self.specular(fragment, normal),
            LightingMode::Combined => {
                let diffuse = lambert(self.diffuse_sample(fragment).truncate());
                let specular = self.specular(fragment, normal);
                (intensity * diffuse + specular) * observed_area + Vec3::splat(self.light.ambient)
            }
        }
    }

    fn shade_transparent(&self, fragment: &Fragment, background: u32) -> Option<u32> {
        let sample = self.diffuse_sample(fragment);
        if sample.w <= ALPHA_EPSILON {
            return None;
        }
        let blended = blend(u32_to_color(background), sample.truncate(), sample.w);
        Some(color_to_u32(blended))
    }
}

impl FragmentShader for PixelShader<'_> {
    fn shade(&self, fragment: &Fragment, background: u32) -> Option<u32> {
        if self.show_depth {
            let (near, far) = self.depth_range;
            return Some(color_to_u32(Vec3::splat(remap(fragment.depth, near, far))));
        }
        if self.transparent {
            return self.shade_transparent(fragment, background);
        }
        Some(color_to_u32(self.lighting(fragment)))
    }
}
