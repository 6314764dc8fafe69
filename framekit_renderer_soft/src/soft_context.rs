/// SoftwareContext - CPU implementation of the GraphicsContext trait
///
/// Headless reference backend: surfaces hold real texels, completeness is
/// computed from the attachments, and clears and blits write pixels that can
/// be read back. Framebuffer 0 is the platform target, backed by internal
/// renderbuffers sized from `SoftwareContextConfig`.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use glam::Vec4;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use framekit::framekit::{Error, Result};
use framekit::framekit::context::{
    AttachmentPoint, BindingTarget, BlitFilter, BlitRequest, BufferMask, ClearValues, ContextId,
    CubeFace, DefaultFramebufferInfo, DeviceLimits, FramebufferId, FramebufferStatus,
    GraphicsContext, PixelFormat, Region, SharedContext, Storage, SurfaceDesc, SurfaceInfo,
    SurfaceKey, SurfaceKind,
};
use framekit::{engine_bail, engine_debug, engine_err, engine_info, engine_trace};
use crate::soft_blit::{resample, SourcePlane};
use crate::soft_framebuffer::{Attachment, Framebuffer, View};
use crate::soft_surface::{encode, Surface};

const SOURCE: &str = "framekit::soft";

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

// ===== CONFIGURATION =====

/// Configuration of a software context and its platform target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftwareContextConfig {
    /// Platform target width in pixels
    pub width: u32,
    /// Platform target height in pixels
    pub height: u32,
    pub samples: u32,
    pub double_buffered: bool,
    pub stereo: bool,
    pub colour_format: PixelFormat,
    /// Depth/stencil format of the platform target, if it has one
    pub depth_format: Option<PixelFormat>,
    pub limits: DeviceLimits,
}

impl Default for SoftwareContextConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            samples: 1,
            double_buffered: true,
            stereo: false,
            colour_format: PixelFormat::R8G8B8A8_UNORM,
            depth_format: Some(PixelFormat::D24_UNORM_S8_UINT),
            limits: DeviceLimits::default(),
        }
    }
}

/// Accepted surface kinds per attach primitive
const KINDS_1D: &[SurfaceKind] = &[SurfaceKind::Texture1D];
const KINDS_2D: &[SurfaceKind] = &[SurfaceKind::Texture2D, SurfaceKind::Texture2DMultisample];
const KINDS_3D: &[SurfaceKind] = &[SurfaceKind::Texture3D];
const KINDS_LAYER: &[SurfaceKind] = &[
    SurfaceKind::Texture1DArray,
    SurfaceKind::Texture2DArray,
    SurfaceKind::Texture2DMultisampleArray,
    SurfaceKind::TextureCubeArray,
    SurfaceKind::Texture3D,
];
const KINDS_LAYERED: &[SurfaceKind] = &[
    SurfaceKind::Texture1DArray,
    SurfaceKind::Texture2DArray,
    SurfaceKind::Texture2DMultisampleArray,
    SurfaceKind::TextureCube,
    SurfaceKind::TextureCubeArray,
    SurfaceKind::Texture3D,
];
const KINDS_CUBE: &[SurfaceKind] = &[SurfaceKind::TextureCube];
const KINDS_RENDERBUFFER: &[SurfaceKind] = &[SurfaceKind::Renderbuffer];

// ===== CONTEXT =====

/// Software graphics context
pub struct SoftwareContext {
    id: ContextId,
    config: SoftwareContextConfig,
    surfaces: SlotMap<SurfaceKey, Surface>,
    framebuffers: FxHashMap<FramebufferId, Framebuffer>,
    next_framebuffer: u32,
    read_binding: FramebufferId,
    draw_binding: FramebufferId,
}

impl SoftwareContext {
    /// Create a context with its platform target
    pub fn new(config: SoftwareContextConfig) -> Self {
        let mut context = Self {
            id: ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)),
            config,
            surfaces: SlotMap::with_key(),
            framebuffers: FxHashMap::default(),
            next_framebuffer: 1,
            read_binding: FramebufferId::DEFAULT,
            draw_binding: FramebufferId::DEFAULT,
        };
        context.build_platform_target();
        engine_info!(
            SOURCE,
            "Software context {} created ({}x{}, {} sample(s))",
            context.id.0, config.width, config.height, config.samples
        );
        context
    }

    /// Create a context already wrapped for render targets
    pub fn new_shared(config: SoftwareContextConfig) -> SharedContext {
        Arc::new(Mutex::new(Self::new(config)))
    }

    /// Create a context keeping its concrete type (pixel readback in tests and tools)
    ///
    /// Clone the handle into a `SharedContext` to hand it to render targets.
    pub fn new_handle(config: SoftwareContextConfig) -> Arc<Mutex<SoftwareContext>> {
        Arc::new(Mutex::new(Self::new(config)))
    }

    pub fn config(&self) -> &SoftwareContextConfig {
        &self.config
    }

    /// Framebuffers bound for (read, draw)
    pub fn bound_framebuffers(&self) -> (FramebufferId, FramebufferId) {
        (self.read_binding, self.draw_binding)
    }

    /// Live framebuffer objects, the platform target excluded
    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.keys().filter(|id| !id.is_default()).count()
    }

    /// Live caller-created surfaces
    pub fn surface_count(&self) -> usize {
        self.surfaces.values().filter(|surface| !surface.internal).count()
    }

    fn build_platform_target(&mut self) {
        let config = self.config;
        let mut framebuffer = Framebuffer::default();

        let colour_desc = SurfaceDesc {
            samples: config.samples.max(1),
            ..SurfaceDesc::renderbuffer(config.colour_format, config.width, config.height)
        };
        let mut colour = Surface::new(&colour_desc);
        colour.internal = true;
        let colour = self.surfaces.insert(colour);
        framebuffer.attach(AttachmentPoint::Colour(0), Attachment { surface: colour, level: 0, view: View::Layer(0) });

        if let Some(format) = config.depth_format {
            let depth_desc = SurfaceDesc { format, ..colour_desc };
            let mut depth = Surface::new(&depth_desc);
            depth.internal = true;
            let depth = self.surfaces.insert(depth);
            let point = match (format.has_depth(), format.has_stencil()) {
                (true, true) => AttachmentPoint::DepthStencil,
                (true, false) => AttachmentPoint::Depth,
                _ => AttachmentPoint::Stencil,
            };
            framebuffer.attach(point, Attachment { surface: depth, level: 0, view: View::Layer(0) });
        }

        self.framebuffers.insert(FramebufferId::DEFAULT, framebuffer);
    }

    /// Simulate a window resize: the platform target is reallocated, contents discarded
    pub fn resize_platform(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            engine_bail!(SOURCE, "Platform target size {}x{} rejected", width, height);
        }
        let internal: Vec<SurfaceKey> = self.surfaces
            .iter()
            .filter(|(_, surface)| surface.internal)
            .map(|(key, _)| key)
            .collect();
        for key in internal {
            if let Some(surface) = self.surfaces.get_mut(key) {
                surface.allocate_level(0, width, height);
            }
        }
        self.config.width = width;
        self.config.height = height;
        engine_debug!(SOURCE, "Platform target of context {} resized to {}x{}", self.id.0, width, height);
        Ok(())
    }

    // ===== PIXEL ACCESS =====

    fn user_surface(&self, surface: SurfaceKey) -> Result<&Surface> {
        match self.surfaces.get(surface) {
            Some(found) if !found.internal => Ok(found),
            _ => Err(Error::InvalidResource(format!("Surface {:?} not found", surface))),
        }
    }

    fn user_surface_mut(&mut self, surface: SurfaceKey) -> Result<&mut Surface> {
        match self.surfaces.get_mut(surface) {
            Some(found) if !found.internal => Ok(found),
            _ => Err(Error::InvalidResource(format!("Surface {:?} not found", surface))),
        }
    }

    /// Read a region of one level/layer of a surface, rows bottom-up
    pub fn read_pixels(&self, surface: SurfaceKey, level: u32, layer: u32, region: Region) -> Result<Vec<Vec4>> {
        self.user_surface(surface)?
            .read_region(level, layer, region)
            .ok_or_else(|| engine_err!(SOURCE, "Region {:?} outside level {} layer {}", region, level, layer))
    }

    /// Same as `read_pixels`, as raw little-endian `f32` RGBA bytes
    pub fn read_pixels_bytes(&self, surface: SurfaceKey, level: u32, layer: u32, region: Region) -> Result<Vec<u8>> {
        let texels = self.read_pixels(surface, level, layer, region)?;
        Ok(bytemuck::cast_slice(&texels).to_vec())
    }

    /// Write a region of one level/layer; values are rounded to the surface format
    pub fn write_pixels(
        &mut self,
        surface: SurfaceKey,
        level: u32,
        layer: u32,
        region: Region,
        texels: &[Vec4],
    ) -> Result<()> {
        if !self.user_surface_mut(surface)?.write_region(level, layer, region, texels) {
            engine_bail!(
                SOURCE,
                "Cannot write {} texel(s) to region {:?} of level {} layer {}",
                texels.len(), region, level, layer
            );
        }
        Ok(())
    }

    /// Read a region of whatever is attached at `point` (works on framebuffer 0)
    pub fn read_framebuffer(&self, framebuffer: FramebufferId, point: AttachmentPoint, region: Region) -> Result<Vec<Vec4>> {
        let attachment = self.framebuffer(framebuffer)?
            .get(point)
            .ok_or_else(|| engine_err!(SOURCE, "Nothing attached at {} of framebuffer {}", point, framebuffer))?;
        self.surfaces
            .get(attachment.surface)
            .and_then(|surface| surface.read_region(attachment.level, attachment.read_layer(), region))
            .ok_or_else(|| engine_err!(SOURCE, "Region {:?} outside {} of framebuffer {}", region, point, framebuffer))
    }

    // ===== INTERNAL HELPERS =====

    fn framebuffer(&self, framebuffer: FramebufferId) -> Result<&Framebuffer> {
        self.framebuffers
            .get(&framebuffer)
            .ok_or_else(|| Error::InvalidResource(format!("Framebuffer {} not found", framebuffer)))
    }

    fn attach(
        &mut self,
        framebuffer: FramebufferId,
        point: AttachmentPoint,
        surface: SurfaceKey,
        level: u32,
        view: View,
        accepted: &[SurfaceKind],
    ) -> Result<()> {
        if framebuffer.is_default() {
            engine_bail!(SOURCE, "The platform framebuffer has fixed attachments");
        }
        let kind = self.user_surface(surface)?.info.kind;
        if !accepted.contains(&kind) {
            engine_bail!(SOURCE, "{:?} surface cannot be attached with this primitive", kind);
        }
        let Some(target) = self.framebuffers.get_mut(&framebuffer) else {
            return Err(Error::InvalidResource(format!("Framebuffer {} not found", framebuffer)));
        };
        target.attach(point, Attachment { surface, level, view });
        engine_trace!(SOURCE, "{} <- {:?} {:?} level {} ({:?})", framebuffer, point, kind, level, view);
        Ok(())
    }

    /// Completeness of one attachment in isolation
    fn attachment_complete(&self, point: AttachmentPoint, attachment: &Attachment) -> bool {
        let Some(surface) = self.surfaces.get(attachment.surface) else {
            return false;
        };
        let info = &surface.info;
        let sized = matches!(info.level_size(attachment.level), Some((w, h)) if w > 0 && h > 0);
        let in_range = match attachment.view {
            View::Layer(layer) => layer < info.layer_count().max(1),
            View::Layered => info.kind.is_layered_kind(),
        };
        let role = match point {
            AttachmentPoint::Colour(_) => info.format.is_colour(),
            AttachmentPoint::Depth => info.format.has_depth(),
            AttachmentPoint::Stencil => info.format.has_stencil(),
            AttachmentPoint::DepthStencil => info.format.has_depth() && info.format.has_stencil(),
        };
        sized && in_range && role
    }

    fn evaluate(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        if framebuffer.is_default() {
            return FramebufferStatus::Complete;
        }
        let Some(target) = self.framebuffers.get(&framebuffer) else {
            return FramebufferStatus::Undefined;
        };
        if target.is_empty() {
            return FramebufferStatus::MissingAttachment;
        }

        let attachments: Vec<(AttachmentPoint, Attachment)> = target.iter().collect();
        if attachments.iter().any(|(point, attachment)| !self.attachment_complete(*point, attachment)) {
            return FramebufferStatus::IncompleteAttachment;
        }

        let infos: Vec<&SurfaceInfo> = attachments
            .iter()
            .filter_map(|(_, attachment)| self.surfaces.get(attachment.surface).map(|surface| &surface.info))
            .collect();
        let samples = infos[0].samples.max(1);
        if infos.iter().any(|info| info.samples.max(1) != samples) {
            return FramebufferStatus::IncompleteSamples;
        }
        if samples > 1 {
            let fixed = infos[0].fixed_sample_locations;
            if infos.iter().any(|info| info.fixed_sample_locations != fixed) {
                return FramebufferStatus::IncompleteSamples;
            }
        }

        let layered = attachments.iter().filter(|(_, attachment)| attachment.view == View::Layered).count();
        if layered != 0 && layered != attachments.len() {
            return FramebufferStatus::IncompleteLayers;
        }

        FramebufferStatus::Complete
    }

    fn require_complete(&self, framebuffer: FramebufferId, operation: &str) -> Result<()> {
        let status = self.evaluate(framebuffer);
        if !status.is_complete() {
            engine_bail!(SOURCE, "{} on framebuffer {} rejected: {}", operation, framebuffer, status);
        }
        Ok(())
    }

    /// Overwrite every texel of an attachment's view with `f`
    fn fill(&mut self, attachment: Attachment, mut f: impl FnMut(&mut Vec4)) {
        let Some(surface) = self.surfaces.get_mut(attachment.surface) else {
            return;
        };
        match attachment.view {
            View::Layer(layer) => surface.for_each_texel(attachment.level, layer, &mut f),
            View::Layered => {
                for layer in 0..surface.info.layer_count().max(1) {
                    surface.for_each_texel(attachment.level, layer, &mut f);
                }
            }
        }
    }

    /// Resample one source attachment into one destination attachment, writing the channels `merge` picks
    fn blit_attachment(
        &mut self,
        source: Attachment,
        destination: Attachment,
        request: &BlitRequest,
        merge: fn(Vec4, Vec4) -> Vec4,
    ) {
        let Some(destination_size) = self.surfaces
            .get(destination.surface)
            .and_then(|surface| surface.info.level_size(destination.level))
        else {
            return;
        };
        let samples = {
            let Some(surface) = self.surfaces.get(source.surface) else {
                return;
            };
            let plane = SourcePlane { surface, level: source.level, layer: source.read_layer() };
            resample(plane, request.source_region, request.destination_region, destination_size, request.filter)
        };

        let Some(surface) = self.surfaces.get_mut(destination.surface) else {
            return;
        };
        let format = surface.info.format;
        let layer = destination.read_layer();
        for ((x, y), sample) in samples {
            let Some(value) = sample else {
                continue;
            };
            let Some(current) = surface.texel(destination.level, layer, x, y) else {
                continue;
            };
            surface.set_texel(destination.level, layer, x, y, merge(current, encode(format, value)));
        }
    }
}

impl GraphicsContext for SoftwareContext {
    fn context_id(&self) -> ContextId {
        self.id
    }

    fn limits(&self) -> DeviceLimits {
        self.config.limits
    }

    fn default_framebuffer(&self) -> DefaultFramebufferInfo {
        DefaultFramebufferInfo {
            width: self.config.width,
            height: self.config.height,
            samples: self.config.samples.max(1),
            double_buffered: self.config.double_buffered,
            stereo: self.config.stereo,
            colour_format: self.config.colour_format,
            depth_format: self.config.depth_format,
        }
    }

    // ===== FRAMEBUFFER OBJECTS =====

    fn create_framebuffer(&mut self) -> Result<FramebufferId> {
        let id = FramebufferId(self.next_framebuffer);
        self.next_framebuffer = self.next_framebuffer
            .checked_add(1)
            .ok_or(Error::OutOfMemory)?;
        self.framebuffers.insert(id, Framebuffer::default());
        engine_trace!(SOURCE, "Framebuffer {} created", id);
        Ok(id)
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId) -> Result<()> {
        if framebuffer.is_default() {
            engine_bail!(SOURCE, "The platform framebuffer cannot be destroyed");
        }
        if self.framebuffers.remove(&framebuffer).is_none() {
            return Err(Error::InvalidResource(format!("Framebuffer {} not found", framebuffer)));
        }
        // Deleting a bound framebuffer rebinds the platform target
        if self.read_binding == framebuffer {
            self.read_binding = FramebufferId::DEFAULT;
        }
        if self.draw_binding == framebuffer {
            self.draw_binding = FramebufferId::DEFAULT;
        }
        engine_trace!(SOURCE, "Framebuffer {} destroyed", framebuffer);
        Ok(())
    }

    fn bind_framebuffer(&mut self, binding: BindingTarget, framebuffer: FramebufferId) -> Result<()> {
        self.framebuffer(framebuffer)?;
        match binding {
            BindingTarget::Read => self.read_binding = framebuffer,
            BindingTarget::Draw => self.draw_binding = framebuffer,
            BindingTarget::Both => {
                self.read_binding = framebuffer;
                self.draw_binding = framebuffer;
            }
        }
        Ok(())
    }

    // ===== ATTACH PRIMITIVES =====

    fn attach_texture_1d(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, surface: SurfaceKey, level: u32) -> Result<()> {
        self.attach(framebuffer, point, surface, level, View::Layer(0), KINDS_1D)
    }

    fn attach_texture_2d(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, surface: SurfaceKey, level: u32) -> Result<()> {
        self.attach(framebuffer, point, surface, level, View::Layer(0), KINDS_2D)
    }

    fn attach_texture_3d(
        &mut self,
        framebuffer: FramebufferId,
        point: AttachmentPoint,
        surface: SurfaceKey,
        layer: u32,
        level: u32,
    ) -> Result<()> {
        self.attach(framebuffer, point, surface, level, View::Layer(layer), KINDS_3D)
    }

    fn attach_texture_layer(
        &mut self,
        framebuffer: FramebufferId,
        point: AttachmentPoint,
        surface: SurfaceKey,
        layer: u32,
        level: u32,
    ) -> Result<()> {
        self.attach(framebuffer, point, surface, level, View::Layer(layer), KINDS_LAYER)
    }

    fn attach_texture_layered(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, surface: SurfaceKey, level: u32) -> Result<()> {
        self.attach(framebuffer, point, surface, level, View::Layered, KINDS_LAYERED)
    }

    fn attach_texture_cube_face(
        &mut self,
        framebuffer: FramebufferId,
        point: AttachmentPoint,
        surface: SurfaceKey,
        face: CubeFace,
        level: u32,
    ) -> Result<()> {
        self.attach(framebuffer, point, surface, level, View::Layer(face.index()), KINDS_CUBE)
    }

    fn attach_renderbuffer(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, surface: SurfaceKey) -> Result<()> {
        self.attach(framebuffer, point, surface, 0, View::Layer(0), KINDS_RENDERBUFFER)
    }

    fn detach(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, kind: SurfaceKind) -> Result<()> {
        if framebuffer.is_default() {
            engine_bail!(SOURCE, "The platform framebuffer has fixed attachments");
        }
        let Some(target) = self.framebuffers.get_mut(&framebuffer) else {
            return Err(Error::InvalidResource(format!("Framebuffer {} not found", framebuffer)));
        };
        target.detach(point);
        engine_trace!(SOURCE, "{} -x {:?} ({:?})", framebuffer, point, kind);
        Ok(())
    }

    // ===== QUERIES AND COMMANDS =====

    fn check_status(&mut self, framebuffer: FramebufferId, binding: BindingTarget) -> FramebufferStatus {
        let status = self.evaluate(framebuffer);
        engine_trace!(SOURCE, "Status of {} ({:?}): {}", framebuffer, binding, status);
        status
    }

    fn clear(&mut self, framebuffer: FramebufferId, mask: BufferMask, values: &ClearValues) -> Result<()> {
        self.require_complete(framebuffer, "Clear")?;
        let target = self.framebuffer(framebuffer)?;
        let colours = target.colour_attachments();
        let depth = target.get(AttachmentPoint::Depth);
        let stencil = target.get(AttachmentPoint::Stencil);

        if mask.contains(BufferMask::COLOUR) {
            for attachment in colours {
                let Some(format) = self.surfaces.get(attachment.surface).map(|s| s.info.format) else {
                    continue;
                };
                let value = encode(format, values.colour);
                self.fill(attachment, |texel| *texel = value);
            }
        }
        if let (true, Some(attachment)) = (mask.contains(BufferMask::DEPTH), depth) {
            if let Some(format) = self.surfaces.get(attachment.surface).map(|s| s.info.format) {
                let depth = encode(format, Vec4::new(values.depth, 0.0, 0.0, 0.0)).x;
                self.fill(attachment, |texel| texel.x = depth);
            }
        }
        if let (true, Some(attachment)) = (mask.contains(BufferMask::STENCIL), stencil) {
            if let Some(format) = self.surfaces.get(attachment.surface).map(|s| s.info.format) {
                // Stencil clear values are masked to the stencil bits
                let bits = format.channel_bits().stencil.min(31);
                let masked = (values.stencil as u32 & ((1u32 << bits) - 1)) as f32;
                let stencil = encode(format, Vec4::new(0.0, masked, 0.0, 0.0)).y;
                self.fill(attachment, |texel| texel.y = stencil);
            }
        }

        engine_trace!(SOURCE, "Cleared {} ({:?})", framebuffer, mask);
        Ok(())
    }

    fn blit(&mut self, request: &BlitRequest) -> Result<()> {
        if request.filter == BlitFilter::Linear && request.mask.intersects(BufferMask::DEPTH | BufferMask::STENCIL) {
            engine_bail!(SOURCE, "Depth and stencil blits require nearest filtering");
        }
        if request.source_region.is_empty() || request.destination_region.is_empty() {
            return Ok(());
        }
        self.require_complete(request.source, "Blit read")?;
        self.require_complete(request.destination, "Blit draw")?;

        let source = self.framebuffer(request.source)?;
        let read_colour = source.get(AttachmentPoint::Colour(0));
        let read_depth = source.get(AttachmentPoint::Depth);
        let read_stencil = source.get(AttachmentPoint::Stencil);
        let destination = self.framebuffer(request.destination)?;
        let draw_colours = destination.colour_attachments();
        let draw_depth = destination.get(AttachmentPoint::Depth);
        let draw_stencil = destination.get(AttachmentPoint::Stencil);

        if request.mask.contains(BufferMask::COLOUR) {
            if let Some(read) = read_colour {
                for draw in draw_colours {
                    self.blit_attachment(read, draw, request, |_, value| value);
                }
            }
        }
        if let (true, Some(read), Some(draw)) = (request.mask.contains(BufferMask::DEPTH), read_depth, draw_depth) {
            self.blit_attachment(read, draw, request, |current, value| Vec4::new(value.x, current.y, 0.0, 0.0));
        }
        if let (true, Some(read), Some(draw)) = (request.mask.contains(BufferMask::STENCIL), read_stencil, draw_stencil) {
            self.blit_attachment(read, draw, request, |current, value| Vec4::new(current.x, value.y, 0.0, 0.0));
        }

        engine_trace!(
            SOURCE,
            "Blit {} {:?} -> {} {:?} ({:?}, {:?})",
            request.source, request.source_region, request.destination, request.destination_region,
            request.mask, request.filter
        );
        Ok(())
    }

    // ===== SURFACE ARENA =====

    fn create_surface(&mut self, desc: &SurfaceDesc) -> Result<SurfaceKey> {
        let limits = self.config.limits;
        if desc.width == 0 || desc.height == 0 {
            engine_bail!(SOURCE, "Surface size {}x{} rejected", desc.width, desc.height);
        }
        if desc.width > limits.max_size || desc.height > limits.max_size {
            engine_bail!(SOURCE, "Surface size {}x{} exceeds {}", desc.width, desc.height, limits.max_size);
        }
        if desc.samples > limits.max_samples {
            engine_bail!(SOURCE, "{} samples exceed the limit of {}", desc.samples, limits.max_samples);
        }
        if desc.samples > 1 && !(desc.kind.is_multisample() || desc.kind == SurfaceKind::Renderbuffer) {
            engine_bail!(SOURCE, "{:?} surfaces cannot be multisampled", desc.kind);
        }
        if desc.kind.is_cube() && (desc.width != desc.height || desc.depth_or_layers % 6 != 0) {
            engine_bail!(SOURCE, "Cube surfaces must be square with a multiple of 6 layers");
        }
        if let Storage::Fixed { level_count: 0 } = desc.storage {
            engine_bail!(SOURCE, "Immutable storage needs at least one level");
        }

        let key = self.surfaces.insert(Surface::new(desc));
        engine_trace!(SOURCE, "Surface {:?} created ({:?}, {:?}, {}x{})", key, desc.kind, desc.format, desc.width, desc.height);
        Ok(key)
    }

    fn destroy_surface(&mut self, surface: SurfaceKey) -> Result<()> {
        self.user_surface(surface)?;
        self.surfaces.remove(surface);
        engine_trace!(SOURCE, "Surface {:?} destroyed", surface);
        Ok(())
    }

    fn surface_info(&self, surface: SurfaceKey) -> Option<SurfaceInfo> {
        self.surfaces.get(surface).map(|found| found.info.clone())
    }

    fn allocate_storage(&mut self, surface: SurfaceKey, level: u32, width: u32, height: u32) -> Result<()> {
        let max_size = self.config.limits.max_size;
        let target = self.user_surface_mut(surface)?;
        if let Storage::Fixed { level_count } = target.info.storage {
            engine_bail!(SOURCE, "Surface {:?} has immutable storage of {} level(s)", surface, level_count);
        }
        if width == 0 || height == 0 || width > max_size || height > max_size {
            engine_bail!(SOURCE, "Storage size {}x{} rejected", width, height);
        }
        if target.info.kind == SurfaceKind::Renderbuffer && level > 0 {
            engine_bail!(SOURCE, "Renderbuffers have a single level");
        }
        target.allocate_level(level, width, height);
        engine_trace!(SOURCE, "Surface {:?} level {} reallocated to {}x{}", surface, level, width, height);
        Ok(())
    }

    fn allocate_fixed_storage(
        &mut self,
        surface: SurfaceKey,
        level_count: u32,
        base_width: u32,
        base_height: u32,
    ) -> Result<()> {
        let max_size = self.config.limits.max_size;
        let target = self.user_surface_mut(surface)?;
        if level_count == 0 || base_width == 0 || base_height == 0 {
            engine_bail!(SOURCE, "Immutable storage of {} level(s) at {}x{} rejected", level_count, base_width, base_height);
        }
        if base_width > max_size || base_height > max_size {
            engine_bail!(SOURCE, "Storage size {}x{} exceeds {}", base_width, base_height, max_size);
        }
        target.allocate_chain(level_count, base_width, base_height);
        engine_trace!(SOURCE, "Surface {:?} reallocated as {} level(s) from {}x{}", surface, level_count, base_width, base_height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "soft_context_tests.rs"]
mod tests;
