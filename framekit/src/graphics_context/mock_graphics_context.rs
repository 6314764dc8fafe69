/// Mock GraphicsContext for unit tests (no GPU required)
///
/// Records every primitive call by name, keeps a small surface arena and the
/// per-framebuffer attachment map, and reports a configurable completeness status.

#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(test)]
use slotmap::SlotMap;
#[cfg(test)]
use rustc_hash::FxHashMap;
#[cfg(test)]
use crate::graphics_context::{
    GraphicsContext, ContextId, FramebufferId, BindingTarget, AttachmentPoint,
    FramebufferStatus, BufferMask, ClearValues, BlitRequest, DeviceLimits,
    DefaultFramebufferInfo, CubeFace, PixelFormat, SurfaceKey, SurfaceKind,
    SurfaceDesc, SurfaceInfo, Storage, SharedContext, mip_chain,
};
#[cfg(test)]
use crate::error::Result;
#[cfg(test)]
use crate::engine_bail;

#[cfg(test)]
static NEXT_MOCK_CONTEXT: AtomicU64 = AtomicU64::new(1_000);

/// Mock context that tracks calls without a GPU
#[cfg(test)]
pub struct MockGraphicsContext {
    pub id: ContextId,
    pub limits: DeviceLimits,
    /// Platform target metadata; shared so tests can simulate a window resize
    pub default_info: Arc<Mutex<DefaultFramebufferInfo>>,
    /// Every primitive call, in issue order
    pub calls: Arc<Mutex<Vec<String>>>,
    /// Status returned for framebuffers that have at least one attachment
    pub status: Arc<Mutex<FramebufferStatus>>,
    /// Successful `create_surface` calls left before a single injected failure
    pub surface_creation_failure: Arc<Mutex<Option<usize>>>,
    /// When set, every attach primitive is refused
    pub attach_failure: Arc<Mutex<bool>>,
    pub surfaces: SlotMap<SurfaceKey, SurfaceInfo>,
    pub framebuffers: FxHashMap<FramebufferId, FxHashMap<AttachmentPoint, SurfaceKey>>,
    next_framebuffer: u32,
}

#[cfg(test)]
impl MockGraphicsContext {
    /// Create a new mock context with default limits and an 800x600 platform target
    pub fn new() -> Self {
        Self {
            id: ContextId(NEXT_MOCK_CONTEXT.fetch_add(1, Ordering::Relaxed)),
            limits: DeviceLimits::default(),
            default_info: Arc::new(Mutex::new(DefaultFramebufferInfo {
                width: 800,
                height: 600,
                samples: 1,
                double_buffered: true,
                stereo: false,
                colour_format: PixelFormat::R8G8B8A8_UNORM,
                depth_format: Some(PixelFormat::D24_UNORM_S8_UINT),
            })),
            calls: Arc::new(Mutex::new(Vec::new())),
            status: Arc::new(Mutex::new(FramebufferStatus::Complete)),
            surface_creation_failure: Arc::new(Mutex::new(None)),
            attach_failure: Arc::new(Mutex::new(false)),
            surfaces: SlotMap::with_key(),
            framebuffers: FxHashMap::default(),
            next_framebuffer: 1,
        }
    }

    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Wrap into a shared context, keeping handles on the call log and status
    pub fn into_shared(self) -> (SharedContext, Arc<Mutex<Vec<String>>>, Arc<Mutex<FramebufferStatus>>) {
        let calls = self.calls.clone();
        let status = self.status.clone();
        (Arc::new(Mutex::new(self)), calls, status)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn attach(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, surface: SurfaceKey) -> Result<()> {
        if *self.attach_failure.lock().unwrap() {
            engine_bail!("framekit::mock", "Injected failure attaching at {}", point);
        }
        let Some(points) = self.framebuffers.get_mut(&framebuffer) else {
            engine_bail!("framekit::mock", "Framebuffer {} not found", framebuffer);
        };
        if point == AttachmentPoint::DepthStencil {
            points.insert(AttachmentPoint::Depth, surface);
            points.insert(AttachmentPoint::Stencil, surface);
        } else {
            points.insert(point, surface);
        }
        Ok(())
    }
}

#[cfg(test)]
impl GraphicsContext for MockGraphicsContext {
    fn context_id(&self) -> ContextId {
        self.id
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn default_framebuffer(&self) -> DefaultFramebufferInfo {
        *self.default_info.lock().unwrap()
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferId> {
        let id = FramebufferId(self.next_framebuffer);
        self.next_framebuffer += 1;
        self.framebuffers.insert(id, FxHashMap::default());
        self.record(format!("create_framebuffer({})", id));
        Ok(id)
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId) -> Result<()> {
        self.framebuffers.remove(&framebuffer);
        self.record(format!("destroy_framebuffer({})", framebuffer));
        Ok(())
    }

    fn bind_framebuffer(&mut self, binding: BindingTarget, framebuffer: FramebufferId) -> Result<()> {
        self.record(format!("bind_framebuffer({:?}, {})", binding, framebuffer));
        Ok(())
    }

    fn attach_texture_1d(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, surface: SurfaceKey, level: u32) -> Result<()> {
        self.record(format!("attach_texture_1d({}, {}, level {})", framebuffer, point, level));
        self.attach(framebuffer, point, surface)
    }

    fn attach_texture_2d(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, surface: SurfaceKey, level: u32) -> Result<()> {
        self.record(format!("attach_texture_2d({}, {}, level {})", framebuffer, point, level));
        self.attach(framebuffer, point, surface)
    }

    fn attach_texture_3d(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, surface: SurfaceKey, layer: u32, level: u32) -> Result<()> {
        self.record(format!("attach_texture_3d({}, {}, layer {}, level {})", framebuffer, point, layer, level));
        self.attach(framebuffer, point, surface)
    }

    fn attach_texture_layer(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, surface: SurfaceKey, layer: u32, level: u32) -> Result<()> {
        self.record(format!("attach_texture_layer({}, {}, layer {}, level {})", framebuffer, point, layer, level));
        self.attach(framebuffer, point, surface)
    }

    fn attach_texture_layered(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, surface: SurfaceKey, level: u32) -> Result<()> {
        self.record(format!("attach_texture_layered({}, {}, level {})", framebuffer, point, level));
        self.attach(framebuffer, point, surface)
    }

    fn attach_texture_cube_face(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, surface: SurfaceKey, face: CubeFace, level: u32) -> Result<()> {
        self.record(format!("attach_texture_cube_face({}, {}, {:?}, level {})", framebuffer, point, face, level));
        self.attach(framebuffer, point, surface)
    }

    fn attach_renderbuffer(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, surface: SurfaceKey) -> Result<()> {
        self.record(format!("attach_renderbuffer({}, {})", framebuffer, point));
        self.attach(framebuffer, point, surface)
    }

    fn detach(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, kind: SurfaceKind) -> Result<()> {
        self.record(format!("detach({}, {}, {:?})", framebuffer, point, kind));
        if let Some(points) = self.framebuffers.get_mut(&framebuffer) {
            if point == AttachmentPoint::DepthStencil {
                points.remove(&AttachmentPoint::Depth);
                points.remove(&AttachmentPoint::Stencil);
            } else {
                points.remove(&point);
            }
        }
        Ok(())
    }

    fn check_status(&mut self, framebuffer: FramebufferId, binding: BindingTarget) -> FramebufferStatus {
        self.record(format!("check_status({}, {:?})", framebuffer, binding));
        if framebuffer.is_default() {
            return FramebufferStatus::Complete;
        }
        match self.framebuffers.get(&framebuffer) {
            None => FramebufferStatus::Undefined,
            Some(points) if points.is_empty() => FramebufferStatus::MissingAttachment,
            Some(_) => *self.status.lock().unwrap(),
        }
    }

    fn clear(&mut self, framebuffer: FramebufferId, mask: BufferMask, _values: &ClearValues) -> Result<()> {
        self.record(format!("clear({}, {:?})", framebuffer, mask));
        Ok(())
    }

    fn blit(&mut self, request: &BlitRequest) -> Result<()> {
        self.record(format!(
            "blit({} -> {}, {:?}, {:?})",
            request.source, request.destination, request.mask, request.filter
        ));
        Ok(())
    }

    fn create_surface(&mut self, desc: &SurfaceDesc) -> Result<SurfaceKey> {
        {
            let mut failure = self.surface_creation_failure.lock().unwrap();
            match *failure {
                Some(0) => {
                    *failure = None;
                    engine_bail!("framekit::mock", "Injected failure creating {:?} surface", desc.kind);
                }
                Some(remaining) => *failure = Some(remaining - 1),
                None => {}
            }
        }
        let level_count = match desc.storage {
            Storage::Fixed { level_count } => level_count,
            Storage::Growable => desc.levels,
        };
        let height = if desc.kind.is_1d() { 1 } else { desc.height };
        let key = self.surfaces.insert(SurfaceInfo {
            kind: desc.kind,
            format: desc.format,
            depth_or_layers: desc.depth_or_layers,
            samples: desc.samples,
            fixed_sample_locations: desc.fixed_sample_locations,
            storage: desc.storage,
            levels: mip_chain(desc.width, height, level_count.max(1)),
        });
        self.record(format!("create_surface({:?}, {:?})", desc.kind, desc.format));
        Ok(key)
    }

    fn destroy_surface(&mut self, surface: SurfaceKey) -> Result<()> {
        self.surfaces.remove(surface);
        self.record("destroy_surface".to_string());
        Ok(())
    }

    fn surface_info(&self, surface: SurfaceKey) -> Option<SurfaceInfo> {
        self.surfaces.get(surface).cloned()
    }

    fn allocate_storage(&mut self, surface: SurfaceKey, level: u32, width: u32, height: u32) -> Result<()> {
        self.record(format!("allocate_storage(level {}, {}x{})", level, width, height));
        let Some(info) = self.surfaces.get_mut(surface) else {
            engine_bail!("framekit::mock", "Surface {:?} not found", surface);
        };
        if let Storage::Fixed { .. } = info.storage {
            engine_bail!("framekit::mock", "Surface {:?} has immutable storage", surface);
        }
        while info.levels.len() <= level as usize {
            info.levels.push((1, 1));
        }
        info.levels[level as usize] = (width, height);
        Ok(())
    }

    fn allocate_fixed_storage(&mut self, surface: SurfaceKey, level_count: u32, base_width: u32, base_height: u32) -> Result<()> {
        self.record(format!(
            "allocate_fixed_storage({} levels, {}x{})",
            level_count, base_width, base_height
        ));
        let Some(info) = self.surfaces.get_mut(surface) else {
            engine_bail!("framekit::mock", "Surface {:?} not found", surface);
        };
        info.storage = Storage::Fixed { level_count };
        info.levels = mip_chain(base_width, base_height, level_count);
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_context_tests.rs"]
mod tests;
