/// RenderTarget: the general framebuffer object
///
/// Owns a framebuffer id in its context, an attachment table and the derived
/// properties. Attached surfaces are referenced, never owned: disposing a
/// render target releases its framebuffer id only.

use std::sync::{Arc, MutexGuard};
use glam::Vec4;
use crate::error::{Error, Result};
use crate::graphics_context::{
    AttachmentPoint, BindingTarget, BlitFilter, BlitRequest, BufferMask, ClearValues, CubeFace,
    FormatRole, FramebufferId, FramebufferStatus, GraphicsContext, Region, SharedContext,
    Storage, SurfaceInfo, SurfaceKey, SurfaceKind,
};
use crate::target::{
    AttachmentEntry, AttachmentMetadata, AttachmentTable, PropertySnapshot, RenderTargetProperties,
};
use crate::{config_bail, engine_debug, engine_err, engine_trace, engine_warn};

const SOURCE: &str = "framekit::RenderTarget";

/// Lock a shared context, mapping poisoning to a backend error
pub(crate) fn lock_context<'a>(
    context: &'a SharedContext,
) -> Result<MutexGuard<'a, dyn GraphicsContext + 'static>> {
    context.lock().map_err(|_| engine_err!(SOURCE, "Graphics context lock poisoned"))
}

/// Scale a level extent back to its level-0 extent
fn base_extent(extent: u32, level: u32) -> Option<u32> {
    1u32.checked_shl(level).and_then(|scale| extent.checked_mul(scale))
}

/// Extent handed to the allocator when `level` of a surface becomes `width` x `height`
///
/// Fixed storage is allocated from its base level, so the extent is scaled back
/// to level 0. `None` when that scaling overflows.
pub(crate) fn allocation_extent(info: &SurfaceInfo, width: u32, height: u32, level: u32) -> Option<(u32, u32)> {
    match info.storage {
        Storage::Fixed { .. } if info.kind.is_1d() => Some((base_extent(width, level)?, 1)),
        Storage::Fixed { .. } => Some((base_extent(width, level)?, base_extent(height, level)?)),
        Storage::Growable if info.kind.is_1d() => Some((width, 1)),
        Storage::Growable => Some((width, height)),
    }
}

/// Reallocate the storage of `surface` so that `level` is `width` x `height`
///
/// Growable storage reallocates that single level. Fixed storage reallocates its
/// whole chain from the matching base size and keeps its level count; a level
/// beyond that count is a typed `Error::FixedStorage`. Contents are discarded.
pub(crate) fn reallocate_surface(
    context: &mut dyn GraphicsContext,
    surface: SurfaceKey,
    width: u32,
    height: u32,
    level: u32,
) -> Result<()> {
    let info = context.surface_info(surface)
        .ok_or_else(|| Error::InvalidResource(format!("Surface {:?} not found", surface)))?;

    if let Storage::Fixed { level_count } = info.storage {
        if level >= level_count {
            crate::engine_error!(
                SOURCE,
                "Level {} requested on immutable storage of {} level(s)",
                level, level_count
            );
            return Err(Error::FixedStorage { surface, level, level_count });
        }
    }
    let Some((alloc_width, alloc_height)) = allocation_extent(&info, width, height, level) else {
        return Err(Error::InvalidResource(format!(
            "Base size of level {} overflows for {}x{}",
            level, width, height
        )));
    };
    match info.storage {
        Storage::Fixed { level_count } => {
            context.allocate_fixed_storage(surface, level_count, alloc_width, alloc_height)
        }
        Storage::Growable => context.allocate_storage(surface, level, alloc_width, alloc_height),
    }
}

/// General framebuffer object
pub struct RenderTarget {
    id: FramebufferId,
    binding: BindingTarget,
    context: SharedContext,
    attachments: AttachmentTable,
    properties: RenderTargetProperties,
    clear_values: ClearValues,
    disposed: bool,
}

impl RenderTarget {
    /// Create an empty render target whose properties follow its attachments
    ///
    /// `context` must not be locked by the caller.
    pub fn new(context: SharedContext, binding: BindingTarget) -> Result<Self> {
        let (id, limits) = {
            let mut ctx = lock_context(&context)?;
            (ctx.create_framebuffer()?, ctx.limits())
        };
        engine_debug!(SOURCE, "Render target {} created ({:?})", id, binding);
        Ok(Self {
            id,
            binding,
            context,
            attachments: AttachmentTable::new(limits.max_colour_attachments),
            properties: RenderTargetProperties::from_attachments(),
            clear_values: ClearValues::default(),
            disposed: false,
        })
    }

    /// Create a size-only render target whose properties never consult its attachments
    pub fn with_fixed_size(context: SharedContext, width: u32, height: u32, sample_count: u32) -> Result<Self> {
        let mut target = Self::new(context, BindingTarget::Both)?;
        if width == 0 || height == 0 {
            config_bail!(SOURCE, target.id, "Fixed size {}x{} rejected, width and height must be positive", width, height);
        }
        target.properties = RenderTargetProperties::fixed(PropertySnapshot::sized(width, height, sample_count.max(1)));
        Ok(target)
    }

    /// Mirror of the platform-provided target of `context`
    pub(crate) fn for_default(context: SharedContext) -> Result<Self> {
        let (info, limits) = {
            let ctx = lock_context(&context)?;
            (ctx.default_framebuffer(), ctx.limits())
        };
        Ok(Self {
            id: FramebufferId::DEFAULT,
            binding: BindingTarget::Both,
            context,
            attachments: AttachmentTable::new(limits.max_colour_attachments),
            properties: RenderTargetProperties::fixed(PropertySnapshot {
                width: info.width,
                height: info.height,
                sample_count: info.samples.max(1),
                double_buffered: info.double_buffered,
                stereo: info.stereo,
            }),
            clear_values: ClearValues::default(),
            disposed: false,
        })
    }

    // ===== ACCESSORS =====

    pub fn id(&self) -> FramebufferId {
        self.id
    }

    pub fn binding(&self) -> BindingTarget {
        self.binding
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn attachments(&self) -> &AttachmentTable {
        &self.attachments
    }

    pub fn properties(&self) -> &RenderTargetProperties {
        &self.properties
    }

    pub fn is_default(&self) -> bool {
        self.id.is_default()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn set_fixed_properties(&mut self, snapshot: PropertySnapshot) {
        self.properties.set_fixed(snapshot);
    }

    // ===== PROPERTIES =====

    /// Whole-target properties, pulled from the representative attachment or the fixed size
    pub fn snapshot(&self) -> Result<PropertySnapshot> {
        let ctx = lock_context(&self.context)?;
        Ok(self.properties.snapshot(&self.attachments, &*ctx))
    }

    pub fn width(&self) -> Result<u32> {
        Ok(self.snapshot()?.width)
    }

    pub fn height(&self) -> Result<u32> {
        Ok(self.snapshot()?.height)
    }

    pub fn sample_count(&self) -> Result<u32> {
        Ok(self.snapshot()?.sample_count)
    }

    pub fn double_buffered(&self) -> Result<bool> {
        Ok(self.snapshot()?.double_buffered)
    }

    pub fn stereo(&self) -> Result<bool> {
        Ok(self.snapshot()?.stereo)
    }

    pub fn is_layered(&self) -> Result<bool> {
        let ctx = lock_context(&self.context)?;
        Ok(self.properties.is_layered(&self.attachments, &*ctx))
    }

    /// Entry visible at `point`, `None` for an unused point
    pub fn get_attachment(&self, point: AttachmentPoint) -> Option<AttachmentEntry> {
        self.attachments.get(point).copied()
    }

    pub fn attachment_metadata(&self, point: AttachmentPoint) -> Result<Option<AttachmentMetadata>> {
        let ctx = lock_context(&self.context)?;
        Ok(RenderTargetProperties::metadata(&self.attachments, point, &*ctx))
    }

    pub fn representative_metadata(&self) -> Result<Option<AttachmentMetadata>> {
        let ctx = lock_context(&self.context)?;
        Ok(RenderTargetProperties::representative_metadata(&self.attachments, &*ctx))
    }

    // ===== ATTACH / DETACH =====

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            config_bail!(SOURCE, self.id, "Render target has been disposed");
        }
        Ok(())
    }

    fn ensure_attachable(&self, operation: &str) -> Result<()> {
        if self.is_default() {
            let message = format!("{} on the default render target", operation);
            crate::engine_error!(SOURCE, "{}", message);
            return Err(Error::NotSupported(message));
        }
        self.ensure_live()
    }

    fn lookup_surface(&self, ctx: &dyn GraphicsContext, surface: SurfaceKey) -> Result<SurfaceInfo> {
        ctx.surface_info(surface).ok_or_else(|| {
            let message = format!("Surface {:?} not found in context", surface);
            crate::engine_error!(SOURCE, "[{}] {}", self.id, message);
            Error::InvalidResource(message)
        })
    }

    /// Check the format role against `point`; depth formats pick Depth or DepthStencil
    fn resolve_point(&self, point: AttachmentPoint, info: &SurfaceInfo) -> Result<AttachmentPoint> {
        let role = info.format.role();
        let resolved = match point {
            AttachmentPoint::Colour(_) => (role == FormatRole::Colour).then_some(point),
            AttachmentPoint::Depth | AttachmentPoint::DepthStencil => match role {
                FormatRole::Depth => Some(AttachmentPoint::Depth),
                FormatRole::DepthStencil => Some(AttachmentPoint::DepthStencil),
                _ => None,
            },
            AttachmentPoint::Stencil => info.format.has_stencil().then_some(point),
        };
        let Some(resolved) = resolved else {
            config_bail!(SOURCE, self.id, "{} point given a {:?} surface ({:?} role)", point, info.format, role);
        };
        if !self.attachments.contains_point(resolved) {
            config_bail!(
                SOURCE, self.id,
                "{} exceeds the {} colour attachment(s) supported by the device",
                resolved, self.attachments.colour_capacity()
            );
        }
        Ok(resolved)
    }

    fn check_level(&self, info: &SurfaceInfo, level: u32) -> Result<()> {
        if level >= info.level_count() {
            config_bail!(SOURCE, self.id, "Level {} out of range, surface has {} level(s)", level, info.level_count());
        }
        Ok(())
    }

    fn check_layer(&self, info: &SurfaceInfo, layer: u32, layer_count: u32) -> Result<()> {
        if layer >= layer_count {
            config_bail!(SOURCE, self.id, "Layer {} out of range, {:?} surface has {} layer(s)", layer, info.kind, layer_count);
        }
        Ok(())
    }

    /// A depth-only attach over a combined depth + stencil entry also drops its stencil view
    fn release_combined_stencil(&self, ctx: &mut dyn GraphicsContext, point: AttachmentPoint) -> Result<()> {
        if point != AttachmentPoint::Depth || !self.attachments.is_combined_depth_stencil() {
            return Ok(());
        }
        let Some(entry) = self.attachments.get(AttachmentPoint::Stencil).copied() else {
            return Ok(());
        };
        let kind = ctx.surface_info(entry.surface)
            .map(|info| info.kind)
            .unwrap_or(SurfaceKind::Texture2D);
        ctx.detach(self.id, AttachmentPoint::Stencil, kind)?;
        engine_trace!(SOURCE, "[{}] Stencil view of the replaced depth + stencil surface detached", self.id);
        Ok(())
    }
    /// Attach `surface` at `point`
    ///
    /// The attach primitive is chosen from the surface kind:
    ///
    /// | kind                    | face / layer       | primitive                 |
    /// |-------------------------|--------------------|---------------------------|
    /// | 1D                      | none               | `attach_texture_1d`       |
    /// | 2D, 2D multisample      | none               | `attach_texture_2d`       |
    /// | renderbuffer            | none, level 0      | `attach_renderbuffer`     |
    /// | array kinds             | layer              | `attach_texture_layer`    |
    /// | array kinds, cube       | none               | `attach_texture_layered`  |
    /// | cube                    | face               | `attach_texture_cube_face`|
    /// | cube array              | face (+ element)   | `attach_texture_layer`    |
    ///
    /// 3D surfaces are rejected; use `set_attachment_3d`. A depth-bearing format
    /// attached at `Depth` or `DepthStencil` lands at whichever of the two its
    /// format selects.
    /// A depth-only format replacing a combined depth + stencil attachment leaves
    /// `Stencil` empty.
    pub fn set_attachment(
        &mut self,
        point: AttachmentPoint,
        surface: SurfaceKey,
        face: Option<CubeFace>,
        layer: Option<u32>,
        level: u32,
    ) -> Result<()> {
        self.ensure_attachable("attach")?;
        let context = self.context.clone();
        let mut ctx = lock_context(&context)?;

        let info = self.lookup_surface(&*ctx, surface)?;
        let point = self.resolve_point(point, &info)?;
        self.check_level(&info, level)?;

        match (info.kind, face, layer) {
            (SurfaceKind::Texture3D, _, _) => {
                config_bail!(SOURCE, self.id, "3D surfaces need the offset-based form, use set_attachment_3d");
            }
            (SurfaceKind::Texture1D, None, None) => {
                ctx.attach_texture_1d(self.id, point, surface, level)?;
            }
            (SurfaceKind::Texture2D | SurfaceKind::Texture2DMultisample, None, None) => {
                ctx.attach_texture_2d(self.id, point, surface, level)?;
            }
            (SurfaceKind::Renderbuffer, None, None) => {
                ctx.attach_renderbuffer(self.id, point, surface)?;
            }
            (
                SurfaceKind::Texture1DArray | SurfaceKind::Texture2DArray | SurfaceKind::Texture2DMultisampleArray,
                None,
                Some(layer),
            ) => {
                self.check_layer(&info, layer, info.layer_count())?;
                ctx.attach_texture_layer(self.id, point, surface, layer, level)?;
            }
            (
                SurfaceKind::Texture1DArray
                | SurfaceKind::Texture2DArray
                | SurfaceKind::Texture2DMultisampleArray
                | SurfaceKind::TextureCube
                | SurfaceKind::TextureCubeArray,
                None,
                None,
            ) => {
                ctx.attach_texture_layered(self.id, point, surface, level)?;
            }
            (SurfaceKind::TextureCube, Some(face), None) => {
                ctx.attach_texture_cube_face(self.id, point, surface, face, level)?;
            }
            (SurfaceKind::TextureCubeArray, Some(face), element) => {
                let element = element.unwrap_or(0);
                self.check_layer(&info, element, info.layer_count() / 6)?;
                ctx.attach_texture_layer(self.id, point, surface, element * 6 + face.index(), level)?;
            }
            (kind, face, layer) => {
                config_bail!(
                    SOURCE, self.id,
                    "{:?} surface cannot be attached with face {:?} and layer {:?}",
                    kind, face, layer
                );
            }
        }
        self.release_combined_stencil(&mut *ctx, point)?;
        drop(ctx);

        self.attachments.add(point, AttachmentEntry { surface, face, layer, level })?;
        engine_trace!(SOURCE, "[{}] {:?} attached at {} (level {})", self.id, info.kind, point, level);
        Ok(())
    }

    /// Attach one slice of a 3D surface at `point`
    pub fn set_attachment_3d(
        &mut self,
        point: AttachmentPoint,
        surface: SurfaceKey,
        layer: u32,
        level: u32,
    ) -> Result<()> {
        self.ensure_attachable("attach")?;
        let context = self.context.clone();
        let mut ctx = lock_context(&context)?;

        let info = self.lookup_surface(&*ctx, surface)?;
        if info.kind != SurfaceKind::Texture3D {
            config_bail!(SOURCE, self.id, "set_attachment_3d needs a 3D surface, got {:?}", info.kind);
        }
        let point = self.resolve_point(point, &info)?;
        self.check_level(&info, level)?;
        self.check_layer(&info, layer, info.depth_or_layers)?;

        ctx.attach_texture_3d(self.id, point, surface, layer, level)?;
        self.release_combined_stencil(&mut *ctx, point)?;
        drop(ctx);

        self.attachments.add(point, AttachmentEntry { surface, face: None, layer: Some(layer), level })?;
        engine_trace!(SOURCE, "[{}] 3D slice {} attached at {} (level {})", self.id, layer, point, level);
        Ok(())
    }

    /// Detach whatever is visible at `point`; an empty point is a no-op
    ///
    /// Removing `Depth` from a combined depth + stencil attachment detaches both
    /// aspects; removing `Stencil` from it keeps the depth view.
    pub fn remove_attachment(&mut self, point: AttachmentPoint) -> Result<()> {
        self.ensure_attachable("detach")?;
        let Some(entry) = self.attachments.get(point).copied() else {
            return Ok(());
        };

        let detach_point = if point == AttachmentPoint::Depth && self.attachments.is_combined_depth_stencil() {
            AttachmentPoint::DepthStencil
        } else {
            point
        };

        {
            let mut ctx = lock_context(&self.context)?;
            // A destroyed surface still needs its point cleared
            let kind = ctx.surface_info(entry.surface)
                .map(|info| info.kind)
                .unwrap_or(SurfaceKind::Texture2D);
            ctx.detach(self.id, detach_point, kind)?;
        }

        self.attachments.remove(point);
        engine_trace!(SOURCE, "[{}] {} detached", self.id, detach_point);
        Ok(())
    }

    // ===== COMPLETENESS =====

    /// Live completeness query; never cached, never fails
    pub fn status(&self) -> FramebufferStatus {
        if self.disposed {
            return FramebufferStatus::Undefined;
        }
        match self.context.lock() {
            Ok(mut ctx) => ctx.check_status(self.id, self.binding),
            Err(_) => {
                engine_warn!(SOURCE, "[{}] Graphics context lock poisoned, status undefined", self.id);
                FramebufferStatus::Undefined
            }
        }
    }

    /// Same as `status()`
    pub fn validate(&self) -> FramebufferStatus {
        self.status()
    }

    pub fn is_complete(&self) -> bool {
        self.status().is_complete()
    }

    // ===== RESIZE =====

    /// Reallocate every attached surface at `level` to `width` x `height`
    ///
    /// Pixel contents are discarded. Every surface is checked before any is
    /// reallocated, so a fault leaves all storage untouched.
    pub fn resize(&mut self, width: u32, height: u32, level: u32) -> Result<()> {
        self.ensure_attachable("resize")?;
        if width == 0 || height == 0 {
            config_bail!(SOURCE, self.id, "Resize to {}x{} rejected, width and height must be positive", width, height);
        }

        let surfaces = self.attachments.surfaces();
        let mut ctx = lock_context(&self.context)?;
        let max_size = ctx.limits().max_size;

        for surface in &surfaces {
            let info = self.lookup_surface(&*ctx, *surface)?;
            match info.storage {
                Storage::Fixed { level_count } if level >= level_count => {
                    crate::engine_error!(
                        SOURCE,
                        "[{}] Level {} requested on immutable storage of {} level(s)",
                        self.id, level, level_count
                    );
                    return Err(Error::FixedStorage { surface: *surface, level, level_count });
                }
                _ => {}
            }
            if info.kind == SurfaceKind::Renderbuffer && level > 0 {
                config_bail!(SOURCE, self.id, "Renderbuffers have a single level, level {} requested", level);
            }
            if info.kind.is_cube() && width != height {
                config_bail!(SOURCE, self.id, "Cube surfaces must stay square, {}x{} requested", width, height);
            }
            match allocation_extent(&info, width, height, level) {
                Some((alloc_width, alloc_height)) if alloc_width <= max_size && alloc_height <= max_size => {}
                Some((alloc_width, alloc_height)) => {
                    config_bail!(
                        SOURCE, self.id,
                        "{:?} surface needs {}x{} storage for level {} at {}x{}, device maximum is {}",
                        info.kind, alloc_width, alloc_height, level, width, height, max_size
                    );
                }
                None => {
                    config_bail!(SOURCE, self.id, "Base size of level {} overflows for {}x{}", level, width, height);
                }
            }
        }

        for surface in surfaces {
            reallocate_surface(&mut *ctx, surface, width, height, level)?;
        }

        engine_debug!(SOURCE, "[{}] Resized to {}x{} at level {}", self.id, width, height, level);
        Ok(())
    }

    // ===== CLEAR =====

    /// Clear the buffers named in `mask` with this target's clear values
    pub fn clear(&self, mask: BufferMask) -> Result<()> {
        self.ensure_live()?;
        if mask.is_empty() {
            return Ok(());
        }
        let mut ctx = lock_context(&self.context)?;
        ctx.bind_framebuffer(BindingTarget::Draw, self.id)?;
        ctx.clear(self.id, mask, &self.clear_values)
    }

    pub fn clear_values(&self) -> ClearValues {
        self.clear_values
    }

    pub fn set_clear_values(&mut self, values: ClearValues) {
        self.clear_values = values;
    }

    pub fn clear_colour(&self) -> Vec4 {
        self.clear_values.colour
    }

    pub fn set_clear_colour(&mut self, colour: Vec4) {
        self.clear_values.colour = colour;
    }

    pub fn clear_depth(&self) -> f32 {
        self.clear_values.depth
    }

    pub fn set_clear_depth(&mut self, depth: f32) {
        self.clear_values.depth = depth;
    }

    pub fn clear_stencil(&self) -> i32 {
        self.clear_values.stencil
    }

    pub fn set_clear_stencil(&mut self, stencil: i32) {
        self.clear_values.stencil = stencil;
    }

    // ===== BLIT =====

    /// Copy a region of this target into `destination` (`None` is the platform target)
    ///
    /// Regions use a bottom-left origin. Depth and stencil copies require
    /// `BlitFilter::Nearest`.
    pub fn copy_to(
        &self,
        destination: Option<&RenderTarget>,
        source_region: Region,
        destination_region: Region,
        mask: BufferMask,
        filter: BlitFilter,
    ) -> Result<()> {
        self.ensure_live()?;
        if mask.is_empty() {
            return Ok(());
        }
        if filter == BlitFilter::Linear && mask.intersects(BufferMask::DEPTH | BufferMask::STENCIL) {
            config_bail!(SOURCE, self.id, "Depth and stencil blits require nearest filtering");
        }
        if source_region.is_empty() || destination_region.is_empty() {
            config_bail!(
                SOURCE, self.id,
                "Empty blit region ({:?} -> {:?})",
                source_region, destination_region
            );
        }

        let destination_id = match destination {
            Some(target) => {
                if target.disposed {
                    config_bail!(SOURCE, self.id, "Blit destination {} has been disposed", target.id);
                }
                if !Arc::ptr_eq(&self.context, &target.context) {
                    config_bail!(SOURCE, self.id, "Blit destination {} belongs to another context", target.id);
                }
                target.id
            }
            None => FramebufferId::DEFAULT,
        };

        let mut ctx = lock_context(&self.context)?;
        ctx.bind_framebuffer(BindingTarget::Read, self.id)?;
        ctx.bind_framebuffer(BindingTarget::Draw, destination_id)?;
        ctx.blit(&BlitRequest {
            source: self.id,
            destination: destination_id,
            source_region,
            destination_region,
            mask,
            filter,
        })?;

        engine_trace!(SOURCE, "[{}] Blit to {} ({:?}, {:?})", self.id, destination_id, mask, filter);
        Ok(())
    }

    // ===== DISPOSE =====

    /// Release the framebuffer id; idempotent, attached surfaces are left alone
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if self.id.is_default() {
            return;
        }

        match self.context.lock() {
            Ok(mut ctx) => {
                if let Err(error) = ctx.destroy_framebuffer(self.id) {
                    engine_warn!(SOURCE, "[{}] Framebuffer release failed: {}", self.id, error);
                }
            }
            Err(_) => {
                engine_warn!(SOURCE, "[{}] Graphics context lock poisoned, framebuffer leaked", self.id);
            }
        }
        engine_debug!(SOURCE, "Render target {} disposed", self.id);
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[path = "render_target_tests.rs"]
mod tests;
