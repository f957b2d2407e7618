/// Software rasterization pipeline
/// Vertex stage -> clipper -> rasterizer -> shader, driven per frame by
/// [`SoftwareRenderer`].
pub mod clipper;
pub mod framebuffer;
pub mod rasterizer;
pub mod renderer;
pub mod shading;
pub mod texture;
pub mod vertex_stage;

pub use clipper::{ClipResult, Clipper, Viewport};
pub use framebuffer::{FrameSlice, Framebuffer};
pub use rasterizer::{Fragment, PixelTarget, Rasterizer};
pub use renderer::SoftwareRenderer;
pub use shading::{FragmentShader, Material, PixelShader};
pub use texture::{Texture, TextureId, TextureRegistry, TextureRole};
pub use vertex_stage::{TransformedMesh, VertexOut};
