/// Render target module - attachment table, properties and framebuffer objects

pub mod attachment_table;
pub mod properties;
pub mod render_target;
pub mod default_render_target;
pub mod managed_renderer;

pub use attachment_table::*;
pub use properties::*;
pub use render_target::RenderTarget;
pub use default_render_target::*;
pub use managed_renderer::*;
