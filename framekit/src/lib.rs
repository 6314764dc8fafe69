/*!
# Framekit

Render-target (framebuffer) management on top of a stateful graphics context.

This crate provides the platform-agnostic layer: the attachment table, derived
render-target properties, and the completeness, clear, resize and blit logic
shared by every framebuffer-like object. Backends (the software rasterizer,
a GPU driver binding, etc.) implement the `GraphicsContext` trait.

## Architecture

- **GraphicsContext**: Trait over the GPU context (bind, attach, status, clear, blit, surfaces)
- **AttachmentTable**: Enum-keyed attachment slots with a representative entry
- **RenderTargetProperties**: Pull-based size / sample / layering metadata
- **RenderTarget**: The general framebuffer object
- **DefaultRenderTarget**: The platform-provided target of the current context
- **ManagedRenderer**: A render target that creates and owns its attachments
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_context;
pub mod target;

// Main framekit namespace module
pub mod framekit {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Graphics context trait, surfaces and pixel formats
    pub mod context {
        pub use crate::graphics_context::*;
    }

    // Render targets
    pub mod target {
        pub use crate::target::*;
    }
}

// Re-export math library at crate root
pub use glam;
