/// Graphics context module - the GPU collaborator and the surfaces it owns

pub mod graphics_context;
pub mod surface;
pub mod pixel_format;

pub use graphics_context::*;
pub use surface::*;
pub use pixel_format::*;

// Mock graphics context for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_context;
