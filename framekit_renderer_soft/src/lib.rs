/*!
# Framekit - Software Backend

Headless CPU implementation of the framekit `GraphicsContext` trait.

Surfaces hold real texels, so completeness, clears, resizes and blits can be
observed without a GPU. The platform target (framebuffer 0) is backed by
internal renderbuffers sized from `SoftwareContextConfig`.

# Example

```no_run
use framekit::framekit::context::{BindingTarget, BufferMask, PixelFormat, SurfaceDesc, AttachmentPoint};
use framekit::framekit::target::RenderTarget;
use framekit_renderer_soft::framekit::{SoftwareContext, SoftwareContextConfig};

let context = SoftwareContext::new_shared(SoftwareContextConfig::default());
let surface = context.lock().unwrap()
    .create_surface(&SurfaceDesc::texture_2d(PixelFormat::R8G8B8A8_UNORM, 256, 256))?;

let mut target = RenderTarget::new(context.clone(), BindingTarget::Both)?;
target.set_attachment(AttachmentPoint::Colour(0), surface, None, None, 0)?;
assert!(target.is_complete());
target.clear(BufferMask::COLOUR)?;
# Ok::<(), framekit::framekit::Error>(())
```
*/

mod soft_context;
mod soft_surface;
mod soft_framebuffer;
mod soft_blit;

/// Public API namespace
pub mod framekit {
    pub use crate::soft_context::{SoftwareContext, SoftwareContextConfig};
}
