/// ManagedRenderer: a render target that creates and owns its attachments
///
/// Colour attachments and the single depth/stencil attachment are created on
/// demand as 2D textures (or renderbuffers for a non-sampled depth buffer).
/// The multisample variant creates multisample surfaces using its sample count
/// and fixed-sample-locations flag. Disposing the renderer destroys every
/// surface it created.

use glam::Vec4;
use crate::error::Result;
use crate::graphics_context::{
    AttachmentPoint, BindingTarget, BlitFilter, BufferMask, FramebufferStatus, PixelFormat,
    Region, SharedContext, SurfaceDesc, SurfaceKey,
};
use crate::target::render_target::{lock_context, reallocate_surface};
use crate::target::RenderTarget;
use crate::{config_bail, engine_debug, engine_warn};

const SOURCE: &str = "framekit::ManagedRenderer";

/// Sampling mode of every attachment a managed renderer creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    Single,
    Multi {
        samples: u32,
        fixed_sample_locations: bool,
    },
}

/// Colour surface created by a managed renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedColour {
    pub surface: SurfaceKey,
    pub format: PixelFormat,
}

/// Depth and/or stencil surface created by a managed renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedDepth {
    pub surface: SurfaceKey,
    pub format: PixelFormat,
    /// Texture (sampleable) rather than renderbuffer
    pub as_texture: bool,
}

impl OwnedDepth {
    fn point(&self) -> AttachmentPoint {
        depth_point(self.format)
    }
}

/// Point a depth/stencil format is requested at
fn depth_point(format: PixelFormat) -> AttachmentPoint {
    if format.has_depth() {
        AttachmentPoint::Depth
    } else {
        AttachmentPoint::Stencil
    }
}

/// Render target owning a fixed set of colour + depth/stencil attachments
pub struct ManagedRenderer {
    target: RenderTarget,
    colour: Vec<Option<OwnedColour>>,
    depth: Option<OwnedDepth>,
    width: u32,
    height: u32,
    sampling: Sampling,
    disposed: bool,
}

impl ManagedRenderer {
    /// Single-sample renderer of `width` x `height`, with no attachments yet
    pub fn new(context: SharedContext, width: u32, height: u32) -> Result<Self> {
        Self::with_sampling(context, width, height, Sampling::Single)
    }

    /// Multisample renderer; `samples` must be within the device limit
    pub fn new_multisample(
        context: SharedContext,
        width: u32,
        height: u32,
        samples: u32,
        fixed_sample_locations: bool,
    ) -> Result<Self> {
        Self::with_sampling(context, width, height, Sampling::Multi { samples, fixed_sample_locations })
    }

    fn with_sampling(context: SharedContext, width: u32, height: u32, sampling: Sampling) -> Result<Self> {
        let max_samples = lock_context(&context)?.limits().max_samples;
        let target = RenderTarget::new(context, BindingTarget::Both)?;
        if width == 0 || height == 0 {
            config_bail!(SOURCE, target.id(), "Size {}x{} rejected, width and height must be positive", width, height);
        }
        if let Sampling::Multi { samples, .. } = sampling {
            Self::check_samples(&target, samples, max_samples)?;
        }

        let capacity = target.attachments().colour_capacity() as usize;
        engine_debug!(SOURCE, "Managed renderer {} created ({}x{}, {:?})", target.id(), width, height, sampling);
        Ok(Self {
            target,
            colour: vec![None; capacity],
            depth: None,
            width,
            height,
            sampling,
            disposed: false,
        })
    }

    fn check_samples(target: &RenderTarget, samples: u32, max_samples: u32) -> Result<()> {
        if samples == 0 || samples > max_samples {
            config_bail!(SOURCE, target.id(), "Sample count {} outside 1..={} supported by the device", samples, max_samples);
        }
        Ok(())
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            config_bail!(SOURCE, self.target.id(), "Managed renderer has been disposed");
        }
        Ok(())
    }

    // ===== ACCESSORS =====

    /// Wrapped render target (read-only: attachments are managed here)
    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn sampling(&self) -> Sampling {
        self.sampling
    }

    pub fn is_multisample(&self) -> bool {
        matches!(self.sampling, Sampling::Multi { .. })
    }

    /// 1 for the single-sample variant
    pub fn sample_count(&self) -> u32 {
        match self.sampling {
            Sampling::Single => 1,
            Sampling::Multi { samples, .. } => samples,
        }
    }

    pub fn fixed_sample_locations(&self) -> bool {
        match self.sampling {
            Sampling::Single => true,
            Sampling::Multi { fixed_sample_locations, .. } => fixed_sample_locations,
        }
    }

    pub fn colour_attachment(&self, index: u32) -> Option<OwnedColour> {
        self.colour.get(index as usize).copied().flatten()
    }

    pub fn depth_attachment(&self) -> Option<OwnedDepth> {
        self.depth
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ===== SURFACE DESCRIPTIONS =====

    fn colour_desc(&self, format: PixelFormat) -> SurfaceDesc {
        match self.sampling {
            Sampling::Single => SurfaceDesc::texture_2d(format, self.width, self.height),
            Sampling::Multi { samples, fixed_sample_locations } => SurfaceDesc::texture_2d_multisample(
                format, self.width, self.height, samples, fixed_sample_locations,
            ),
        }
    }

    fn depth_desc(&self, format: PixelFormat, as_texture: bool) -> SurfaceDesc {
        match (self.sampling, as_texture) {
            (Sampling::Single, true) => SurfaceDesc::texture_2d(format, self.width, self.height),
            (Sampling::Single, false) => SurfaceDesc::renderbuffer(format, self.width, self.height),
            (Sampling::Multi { samples, fixed_sample_locations }, true) => SurfaceDesc::texture_2d_multisample(
                format, self.width, self.height, samples, fixed_sample_locations,
            ),
            (Sampling::Multi { samples, fixed_sample_locations }, false) => SurfaceDesc {
                samples,
                fixed_sample_locations,
                ..SurfaceDesc::renderbuffer(format, self.width, self.height)
            },
        }
    }

    /// Create a surface and attach it; the surface is destroyed again if the attach fails
    fn create_and_attach(&mut self, point: AttachmentPoint, desc: SurfaceDesc) -> Result<SurfaceKey> {
        let surface = lock_context(self.target.context())?.create_surface(&desc)?;
        if let Err(error) = self.target.set_attachment(point, surface, None, None, 0) {
            if let Err(cleanup) = self.destroy_surface(surface) {
                engine_warn!(SOURCE, "[{}] Surface release failed: {}", self.target.id(), cleanup);
            }
            return Err(error);
        }
        Ok(surface)
    }

    fn destroy_surface(&self, surface: SurfaceKey) -> Result<()> {
        lock_context(self.target.context())?.destroy_surface(surface)
    }

    // ===== ATTACHMENTS =====

    /// Create (or replace) the colour attachment at `index`
    pub fn set_colour_attachment(&mut self, index: u32, format: PixelFormat) -> Result<SurfaceKey> {
        self.ensure_live()?;
        if index as usize >= self.colour.len() {
            config_bail!(
                SOURCE, self.target.id(),
                "Colour index {} exceeds the {} colour attachment(s) supported by the device",
                index, self.colour.len()
            );
        }
        if !format.is_colour() {
            config_bail!(SOURCE, self.target.id(), "Colour attachment given a {:?} format", format);
        }

        self.remove_colour_attachment(index)?;
        let surface = self.create_and_attach(AttachmentPoint::Colour(index), self.colour_desc(format))?;
        self.colour[index as usize] = Some(OwnedColour { surface, format });
        Ok(surface)
    }

    /// Create (or replace) the depth/stencil attachment
    ///
    /// Depth-bearing formats land at `Depth` (or `DepthStencil` for combined
    /// formats), stencil-only formats at `Stencil`. `as_texture` picks a
    /// sampleable texture over a renderbuffer.
    pub fn set_depth_attachment(&mut self, format: PixelFormat, as_texture: bool) -> Result<SurfaceKey> {
        self.ensure_live()?;
        if format.is_colour() {
            config_bail!(SOURCE, self.target.id(), "Depth attachment given a {:?} format", format);
        }

        self.remove_depth_attachment()?;
        let surface = self.create_and_attach(depth_point(format), self.depth_desc(format, as_texture))?;
        self.depth = Some(OwnedDepth { surface, format, as_texture });
        Ok(surface)
    }

    /// Detach and destroy the colour attachment at `index`; no-op if none was created
    pub fn remove_colour_attachment(&mut self, index: u32) -> Result<()> {
        self.ensure_live()?;
        let Some(owned) = self.colour.get_mut(index as usize).and_then(Option::take) else {
            return Ok(());
        };
        self.target.remove_attachment(AttachmentPoint::Colour(index))?;
        self.destroy_surface(owned.surface)
    }

    /// Detach and destroy the depth/stencil attachment; no-op if none was created
    pub fn remove_depth_attachment(&mut self) -> Result<()> {
        self.ensure_live()?;
        let Some(owned) = self.depth.take() else {
            return Ok(());
        };
        self.target.remove_attachment(owned.point())?;
        self.destroy_surface(owned.surface)
    }

    /// Remove whatever owned attachment is visible at `point`
    ///
    /// Any of `Depth`, `Stencil` and `DepthStencil` that shows the owned
    /// depth/stencil surface removes that surface entirely.
    pub fn remove_attachment(&mut self, point: AttachmentPoint) -> Result<()> {
        match point {
            AttachmentPoint::Colour(index) => self.remove_colour_attachment(index),
            _ => {
                let visible = self.target.get_attachment(point).map(|entry| entry.surface);
                match self.depth {
                    Some(owned) if visible == Some(owned.surface) => self.remove_depth_attachment(),
                    _ => Ok(()),
                }
            }
        }
    }

    // ===== SIZE AND SAMPLING =====

    /// Resize every created attachment at level 0, colour first then depth/stencil
    ///
    /// Contents are discarded.
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<()> {
        self.ensure_live()?;
        if width == 0 || height == 0 {
            config_bail!(SOURCE, self.target.id(), "Size {}x{} rejected, width and height must be positive", width, height);
        }

        let surfaces: Vec<SurfaceKey> = self.colour
            .iter()
            .flatten()
            .map(|owned| owned.surface)
            .chain(self.depth.map(|owned| owned.surface))
            .collect();

        {
            let mut ctx = lock_context(self.target.context())?;
            let max_size = ctx.limits().max_size;
            if width > max_size || height > max_size {
                config_bail!(SOURCE, self.target.id(), "Size {}x{} exceeds the device maximum of {}", width, height, max_size);
            }
            for surface in surfaces {
                reallocate_surface(&mut *ctx, surface, width, height, 0)?;
            }
        }

        self.width = width;
        self.height = height;
        engine_debug!(SOURCE, "[{}] Resized to {}x{}", self.target.id(), width, height);
        Ok(())
    }

    /// Change the sample count and recreate every attachment (multisample variant only)
    pub fn set_sample_count(&mut self, samples: u32) -> Result<()> {
        self.ensure_live()?;
        let Sampling::Multi { fixed_sample_locations, .. } = self.sampling else {
            config_bail!(SOURCE, self.target.id(), "Sample count is fixed to 1 on a single-sample renderer");
        };
        let max_samples = lock_context(self.target.context())?.limits().max_samples;
        Self::check_samples(&self.target, samples, max_samples)?;

        self.change_sampling(Sampling::Multi { samples, fixed_sample_locations })
    }

    /// Change the fixed-sample-locations flag and recreate every attachment (multisample variant only)
    pub fn set_fixed_sample_locations(&mut self, fixed_sample_locations: bool) -> Result<()> {
        self.ensure_live()?;
        let Sampling::Multi { samples, .. } = self.sampling else {
            config_bail!(SOURCE, self.target.id(), "Sample locations are fixed on a single-sample renderer");
        };

        self.change_sampling(Sampling::Multi { samples, fixed_sample_locations })
    }

    /// Switch to `sampling` and recreate every attachment
    ///
    /// On failure the previous sampling is restored and the attachments are
    /// recreated with it again, so every surface keeps one sample count.
    fn change_sampling(&mut self, sampling: Sampling) -> Result<()> {
        let colours: Vec<(u32, PixelFormat)> = self.colour
            .iter()
            .enumerate()
            .filter_map(|(index, owned)| owned.map(|owned| (index as u32, owned.format)))
            .collect();
        let depth = self.depth;

        let previous = std::mem::replace(&mut self.sampling, sampling);
        let Err(error) = self.recreate_attachments(&colours, depth) else {
            return Ok(());
        };

        self.sampling = previous;
        engine_warn!(SOURCE, "[{}] Sampling change failed, restoring {:?}: {}", self.target.id(), previous, error);
        if let Err(restore) = self.recreate_attachments(&colours, depth) {
            engine_warn!(SOURCE, "[{}] Attachments could not be restored: {}", self.target.id(), restore);
        }
        Err(error)
    }

    fn recreate_attachments(&mut self, colours: &[(u32, PixelFormat)], depth: Option<OwnedDepth>) -> Result<()> {
        for &(index, format) in colours {
            self.set_colour_attachment(index, format)?;
        }
        if let Some(owned) = depth {
            self.set_depth_attachment(owned.format, owned.as_texture)?;
        }
        Ok(())
    }

    // ===== FORWARDERS =====

    pub fn status(&self) -> FramebufferStatus {
        self.target.status()
    }

    pub fn is_complete(&self) -> bool {
        self.target.is_complete()
    }

    pub fn clear(&self, mask: BufferMask) -> Result<()> {
        self.target.clear(mask)
    }

    pub fn set_clear_colour(&mut self, colour: Vec4) {
        self.target.set_clear_colour(colour);
    }

    pub fn set_clear_depth(&mut self, depth: f32) {
        self.target.set_clear_depth(depth);
    }

    pub fn set_clear_stencil(&mut self, stencil: i32) {
        self.target.set_clear_stencil(stencil);
    }

    pub fn copy_to(
        &self,
        destination: Option<&RenderTarget>,
        source_region: Region,
        destination_region: Region,
        mask: BufferMask,
        filter: BlitFilter,
    ) -> Result<()> {
        self.target.copy_to(destination, source_region, destination_region, mask, filter)
    }

    // ===== DISPOSE =====

    /// Release the framebuffer and destroy every created surface; idempotent
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.target.dispose();

        let owned: Vec<SurfaceKey> = self.colour
            .iter_mut()
            .filter_map(Option::take)
            .map(|owned| owned.surface)
            .chain(self.depth.take().map(|owned| owned.surface))
            .collect();

        match self.target.context().lock() {
            Ok(mut ctx) => {
                for surface in owned {
                    if let Err(error) = ctx.destroy_surface(surface) {
                        engine_warn!(SOURCE, "[{}] Surface release failed: {}", self.target.id(), error);
                    }
                }
            }
            Err(_) => {
                engine_warn!(SOURCE, "[{}] Graphics context lock poisoned, surfaces leaked", self.target.id());
            }
        }
        engine_debug!(SOURCE, "Managed renderer {} disposed", self.target.id());
    }
}

impl Drop for ManagedRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[path = "managed_renderer_tests.rs"]
mod tests;
