/// Per-frame render settings.
/// Passed explicitly into every render call and only changed between frames.
use crate::error::ConfigError;
use crate::scene::CullMode;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which lighting term the shader outputs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightingMode {
    ObservedArea,
    Diffuse,
    Specular,
    #[default]
    Combined,
}

impl LightingMode {
    /// Cycle ObservedArea -> Diffuse -> Specular -> Combined -> ObservedArea
    pub fn next(self) -> Self {
        match self {
            LightingMode::ObservedArea => LightingMode::Diffuse,
            LightingMode::Diffuse => LightingMode::Specular,
            LightingMode::Specular => LightingMode::Combined,
            LightingMode::Combined => LightingMode::ObservedArea,
        }
    }
}

/// Single directional light plus ambient.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    /// Direction the light travels (world space, normalized on use).
    pub direction: Vec3,
    pub intensity: f32,
    /// Phong exponent before the glossiness map is applied.
    pub shininess: f32,
    pub ambient: f32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.577, -0.577, 0.577).normalize(),
            intensity: 7.0,
            shininess: 25.0,
            ambient: 0.025,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Overrides every mesh's own cull mode when set.
    pub cull_mode: Option<CullMode>,
    pub lighting_mode: LightingMode,
    pub normal_mapping: bool,
    pub show_depth: bool,
    pub show_bounding_boxes: bool,
    /// Dark uniform clear color instead of the default gray.
    pub uniform_background: bool,
    /// Depth window remapped to [0, 1] by the depth visualization.
    pub depth_range: (f32, f32),
    pub light: LightSettings,
    /// Rasterize opaque triangle lists across worker threads.
    pub parallel: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cull_mode: None,
            lighting_mode: LightingMode::Combined,
            normal_mapping: true,
            show_depth: false,
            show_bounding_boxes: false,
            uniform_background: false,
            depth_range: (0.997, 1.0),
            light: LightSettings::default(),
            parallel: true,
        }
    }
}

const DEFAULT_BACKGROUND: f32 = 0.39;
const UNIFORM_BACKGROUND: f32 = 0.1;

impl RenderConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&source)?;
        log::debug!("loaded render config from {}", path.display());
        Ok(config)
    }

    /// ARGB clear color for the back buffer.
    pub fn clear_color(&self) -> u32 {
        let gray = if self.uniform_background {
            UNIFORM_BACKGROUND
        } else {
            DEFAULT_BACKGROUND
        };
        let c = (gray * 255.0).round() as u32;
        0xFF000000 | (c << 16) | (c << 8) | c
    }

    pub fn cycle_lighting(&mut self) {
        self.lighting_mode = self.lighting_mode.next();
        log::info!("lighting mode: {:?}", self.lighting_mode);
    }

    /// Cycle the global override, starting from back-face culling.
    pub fn cycle_cull_mode(&mut self) {
        let next = self.cull_mode.map_or(CullMode::Back, CullMode::next);
        self.cull_mode = Some(next);
        log::info!("cull mode: {:?}", next);
    }

    pub fn toggle_normal_mapping(&mut self) {
        self.normal_mapping = !self.normal_mapping;
        log::info!("normal mapping: {}", self.normal_mapping);
    }

    pub fn toggle_depth(&mut self) {
        self.show_depth = !self.show_depth;
        log::info!("depth visualization: {}", self.show_depth);
    }

    pub fn toggle_bounding_boxes(&mut self) {
        self.show_bounding_boxes = !self.show_bounding_boxes;
        log::info!("bounding box visualization: {}", self.show_bounding_boxes);
    }

    pub fn toggle_uniform_background(&mut self) {
        self.uniform_background = !self.uniform_background;
        log::info!("uniform background: {}", self.uniform_background);
    }
}
