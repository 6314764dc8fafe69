/// DefaultRenderTarget: the platform-provided target of the current context
///
/// Every query delegates to the per-context mirror cached by the `Engine`.
/// The mirror's properties are fixed: they are read from the context when the
/// mirror is first created and refreshed only by `DefaultRenderTarget::sync()`.

use glam::Vec4;
use crate::engine::{DefaultTargetMirror, Engine};
use crate::error::{Error, Result};
use crate::graphics_context::{
    AttachmentPoint, BlitFilter, BufferMask, ClearValues, CubeFace, FramebufferId,
    FramebufferStatus, Region, SurfaceKey,
};
use crate::target::render_target::lock_context;
use crate::target::{PropertySnapshot, RenderTarget};
use crate::{engine_debug, engine_err};

const SOURCE: &str = "framekit::DefaultRenderTarget";

/// Process-wide handle on the platform target of the current context
///
/// # Example
///
/// ```no_run
/// use framekit::framekit::target::DefaultRenderTarget;
/// use framekit::framekit::context::BufferMask;
///
/// DefaultRenderTarget::set_clear_colour(framekit::glam::Vec4::new(0.0, 0.0, 0.0, 1.0))?;
/// DefaultRenderTarget::clear(BufferMask::COLOUR | BufferMask::DEPTH)?;
/// # Ok::<(), framekit::framekit::Error>(())
/// ```
pub struct DefaultRenderTarget;

impl DefaultRenderTarget {
    /// Reserved framebuffer id of the platform target
    pub const ID: FramebufferId = FramebufferId::DEFAULT;

    fn mirror() -> Result<DefaultTargetMirror> {
        let context = Engine::current_context()?;
        Engine::default_target(&context)
    }

    fn with_mirror<T>(f: impl FnOnce(&mut RenderTarget) -> Result<T>) -> Result<T> {
        let mirror = Self::mirror()?;
        let mut target = mirror.lock()
            .map_err(|_| engine_err!(SOURCE, "Default render target lock poisoned"))?;
        f(&mut *target)
    }

    fn not_supported(operation: &str) -> Error {
        let message = format!("{} on the default render target", operation);
        crate::engine_error!(SOURCE, "{}", message);
        Error::NotSupported(message)
    }

    pub fn id() -> FramebufferId {
        Self::ID
    }

    // ===== PROPERTIES =====

    pub fn snapshot() -> Result<PropertySnapshot> {
        Self::with_mirror(|target| target.snapshot())
    }

    pub fn width() -> Result<u32> {
        Ok(Self::snapshot()?.width)
    }

    pub fn height() -> Result<u32> {
        Ok(Self::snapshot()?.height)
    }

    pub fn sample_count() -> Result<u32> {
        Ok(Self::snapshot()?.sample_count)
    }

    pub fn double_buffered() -> Result<bool> {
        Ok(Self::snapshot()?.double_buffered)
    }

    pub fn stereo() -> Result<bool> {
        Ok(Self::snapshot()?.stereo)
    }

    /// Re-read the platform target metadata into the cached mirror
    pub fn sync() -> Result<()> {
        let context = Engine::current_context()?;
        let info = {
            let ctx = lock_context(&context)?;
            ctx.default_framebuffer()
        };
        let mirror = Engine::default_target(&context)?;
        let mut target = mirror.lock()
            .map_err(|_| engine_err!(SOURCE, "Default render target lock poisoned"))?;
        target.set_fixed_properties(PropertySnapshot {
            width: info.width,
            height: info.height,
            sample_count: info.samples.max(1),
            double_buffered: info.double_buffered,
            stereo: info.stereo,
        });
        engine_debug!(SOURCE, "Synced to {}x{} ({} sample(s))", info.width, info.height, info.samples);
        Ok(())
    }

    // ===== UNSUPPORTED =====

    pub fn set_attachment(
        _point: AttachmentPoint,
        _surface: SurfaceKey,
        _face: Option<CubeFace>,
        _layer: Option<u32>,
        _level: u32,
    ) -> Result<()> {
        Err(Self::not_supported("attach"))
    }

    pub fn set_attachment_3d(_point: AttachmentPoint, _surface: SurfaceKey, _layer: u32, _level: u32) -> Result<()> {
        Err(Self::not_supported("attach"))
    }

    pub fn remove_attachment(_point: AttachmentPoint) -> Result<()> {
        Err(Self::not_supported("detach"))
    }

    pub fn resize(_width: u32, _height: u32, _level: u32) -> Result<()> {
        Err(Self::not_supported("resize"))
    }

    // ===== STATUS / CLEAR / BLIT =====

    /// Completeness of the platform target; `Undefined` without a current context
    pub fn status() -> FramebufferStatus {
        if !Engine::has_current_context() {
            return FramebufferStatus::Undefined;
        }
        Self::with_mirror(|target| Ok(target.status())).unwrap_or(FramebufferStatus::Undefined)
    }

    pub fn clear(mask: BufferMask) -> Result<()> {
        Self::with_mirror(|target| target.clear(mask))
    }

    pub fn clear_values() -> Result<ClearValues> {
        Self::with_mirror(|target| Ok(target.clear_values()))
    }

    pub fn set_clear_values(values: ClearValues) -> Result<()> {
        Self::with_mirror(|target| {
            target.set_clear_values(values);
            Ok(())
        })
    }

    pub fn clear_colour() -> Result<Vec4> {
        Ok(Self::clear_values()?.colour)
    }

    pub fn set_clear_colour(colour: Vec4) -> Result<()> {
        Self::with_mirror(|target| {
            target.set_clear_colour(colour);
            Ok(())
        })
    }

    pub fn clear_depth() -> Result<f32> {
        Ok(Self::clear_values()?.depth)
    }

    pub fn set_clear_depth(depth: f32) -> Result<()> {
        Self::with_mirror(|target| {
            target.set_clear_depth(depth);
            Ok(())
        })
    }

    pub fn clear_stencil() -> Result<i32> {
        Ok(Self::clear_values()?.stencil)
    }

    pub fn set_clear_stencil(stencil: i32) -> Result<()> {
        Self::with_mirror(|target| {
            target.set_clear_stencil(stencil);
            Ok(())
        })
    }

    /// Copy a region of the platform target into `destination` (`None` copies within it)
    pub fn copy_to(
        destination: Option<&RenderTarget>,
        source_region: Region,
        destination_region: Region,
        mask: BufferMask,
        filter: BlitFilter,
    ) -> Result<()> {
        Self::with_mirror(|target| {
            target.copy_to(destination, source_region, destination_region, mask, filter)
        })
    }

    /// No-op: the platform target is never released by this layer
    pub fn dispose() {}
}

#[cfg(test)]
#[path = "default_render_target_tests.rs"]
mod tests;
