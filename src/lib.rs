/// CPU rasterizer - software triangle pipeline with clipping, perspective
/// correct interpolation, depth testing and per-pixel lighting
pub mod camera;
pub mod config;
pub mod error;
pub mod logging;
pub mod perf;
pub mod rendering;
pub mod scene;

pub use camera::Camera;
pub use config::{LightSettings, LightingMode, RenderConfig};
pub use error::{ConfigError, MeshError, RenderError};
pub use logging::{init_logging, LoggingConfig};
pub use perf::{CounterSnapshot, FrameStats, RenderCounters, RENDER_COUNTERS};
pub use rendering::{Framebuffer, SoftwareRenderer, Texture, TextureId, TextureRegistry, TextureRole};
pub use scene::{CullMode, MaterialSlots, Mesh, MeshId, PrimitiveTopology, Scene, Vertex};
