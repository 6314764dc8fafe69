/// GraphicsContext trait and the value types exchanged with it
///
/// The context is the stateful GPU collaborator every render target talks to:
/// framebuffer objects, attach primitives, completeness queries, clear/blit
/// and the surface arena.

use std::fmt;
use std::sync::{Arc, Mutex};
use bitflags::bitflags;
use glam::Vec4;
use crate::error::Result;
use crate::graphics_context::{
    CubeFace, PixelFormat, SurfaceDesc, SurfaceInfo, SurfaceKey, SurfaceKind,
};

// ===== IDENTIFIERS =====

/// Unique identifier of a graphics context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

/// Framebuffer object name inside a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub u32);

impl FramebufferId {
    /// Reserved id of the platform-provided target
    pub const DEFAULT: FramebufferId = FramebufferId(0);

    pub fn is_default(self) -> bool {
        self == Self::DEFAULT
    }
}

impl fmt::Display for FramebufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ===== ATTACHMENT POINTS =====

/// Binding target a framebuffer is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingTarget {
    Read,
    Draw,
    Both,
}

/// Named slot a surface can occupy in a framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentPoint {
    Depth,
    Stencil,
    /// Combined point, one underlying slot shared with `Depth`
    DepthStencil,
    Colour(u32),
}

impl AttachmentPoint {
    pub fn is_colour(self) -> bool {
        matches!(self, AttachmentPoint::Colour(_))
    }
}

impl fmt::Display for AttachmentPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentPoint::Depth => write!(f, "Depth"),
            AttachmentPoint::Stencil => write!(f, "Stencil"),
            AttachmentPoint::DepthStencil => write!(f, "DepthStencil"),
            AttachmentPoint::Colour(index) => write!(f, "Colour{}", index),
        }
    }
}

/// Completeness classification reported by the context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    /// The target does not exist (disposed, or no default target)
    Undefined,
    IncompleteAttachment,
    MissingAttachment,
    IncompleteDraw,
    IncompleteRead,
    Unsupported,
    IncompleteSamples,
    IncompleteLayers,
}

impl FramebufferStatus {
    pub fn is_complete(self) -> bool {
        self == FramebufferStatus::Complete
    }
}

impl fmt::Display for FramebufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            FramebufferStatus::Complete => "complete",
            FramebufferStatus::Undefined => "undefined",
            FramebufferStatus::IncompleteAttachment => "incomplete attachment",
            FramebufferStatus::MissingAttachment => "missing attachment",
            FramebufferStatus::IncompleteDraw => "incomplete draw buffer",
            FramebufferStatus::IncompleteRead => "incomplete read buffer",
            FramebufferStatus::Unsupported => "unsupported attachment combination",
            FramebufferStatus::IncompleteSamples => "inconsistent sample counts",
            FramebufferStatus::IncompleteLayers => "inconsistent layering",
        };
        f.write_str(reason)
    }
}

// ===== CLEAR / BLIT =====

bitflags! {
    /// Buffer categories touched by a clear or a blit
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferMask: u32 {
        const COLOUR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Values written by a clear
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    pub colour: Vec4,
    pub depth: f32,
    pub stencil: i32,
}

impl Default for ClearValues {
    fn default() -> Self {
        Self {
            colour: Vec4::ZERO,
            depth: 1.0,
            stencil: 0,
        }
    }
}

/// Pixel rectangle, origin at the bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Region covering a whole `width` x `height` target
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Filter used when a blit rescales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlitFilter {
    Nearest,
    Linear,
}

/// One blit primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlitRequest {
    pub source: FramebufferId,
    pub destination: FramebufferId,
    pub source_region: Region,
    pub destination_region: Region,
    pub mask: BufferMask,
    pub filter: BlitFilter,
}

// ===== DEVICE INFORMATION =====

/// Capability limits reported by the context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_colour_attachments: u32,
    pub max_samples: u32,
    /// Largest width or height of a surface
    pub max_size: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_colour_attachments: 8,
            max_samples: 8,
            max_size: 16384,
        }
    }
}

/// Metadata of the platform-provided target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultFramebufferInfo {
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub double_buffered: bool,
    pub stereo: bool,
    pub colour_format: PixelFormat,
    pub depth_format: Option<PixelFormat>,
}

// ===== GRAPHICS CONTEXT TRAIT =====

/// Stateful GPU context
///
/// Implemented by backends (e.g. the software rasterizer). Every primitive is a
/// synchronous request; errors are backend failures, never completeness results.
pub trait GraphicsContext: Send {
    /// Identity of this context
    fn context_id(&self) -> ContextId;

    /// Capability limits
    fn limits(&self) -> DeviceLimits;

    /// Live metadata of the platform target
    fn default_framebuffer(&self) -> DefaultFramebufferInfo;

    // ===== FRAMEBUFFER OBJECTS =====

    /// Create an empty framebuffer object
    fn create_framebuffer(&mut self) -> Result<FramebufferId>;

    /// Release a framebuffer object; attached surfaces are left alone
    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId) -> Result<()>;

    /// Bind a framebuffer for reading, drawing or both
    fn bind_framebuffer(&mut self, binding: BindingTarget, framebuffer: FramebufferId) -> Result<()>;

    // ===== ATTACH PRIMITIVES =====

    fn attach_texture_1d(
        &mut self,
        framebuffer: FramebufferId,
        point: AttachmentPoint,
        surface: SurfaceKey,
        level: u32,
    ) -> Result<()>;

    /// 2D textures, single-sample or multisample
    fn attach_texture_2d(
        &mut self,
        framebuffer: FramebufferId,
        point: AttachmentPoint,
        surface: SurfaceKey,
        level: u32,
    ) -> Result<()>;

    /// One depth slice of a 3D texture
    fn attach_texture_3d(
        &mut self,
        framebuffer: FramebufferId,
        point: AttachmentPoint,
        surface: SurfaceKey,
        layer: u32,
        level: u32,
    ) -> Result<()>;

    /// One layer of an array texture (cube arrays address `element * 6 + face`)
    fn attach_texture_layer(
        &mut self,
        framebuffer: FramebufferId,
        point: AttachmentPoint,
        surface: SurfaceKey,
        layer: u32,
        level: u32,
    ) -> Result<()>;

    /// Every layer of an array, cube or 3D texture at once
    fn attach_texture_layered(
        &mut self,
        framebuffer: FramebufferId,
        point: AttachmentPoint,
        surface: SurfaceKey,
        level: u32,
    ) -> Result<()>;

    fn attach_texture_cube_face(
        &mut self,
        framebuffer: FramebufferId,
        point: AttachmentPoint,
        surface: SurfaceKey,
        face: CubeFace,
        level: u32,
    ) -> Result<()>;

    fn attach_renderbuffer(
        &mut self,
        framebuffer: FramebufferId,
        point: AttachmentPoint,
        surface: SurfaceKey,
    ) -> Result<()>;

    /// Attach-null at `point`, using the primitive matching `kind`
    fn detach(&mut self, framebuffer: FramebufferId, point: AttachmentPoint, kind: SurfaceKind) -> Result<()>;

    // ===== QUERIES AND COMMANDS =====

    /// Live completeness query
    fn check_status(&mut self, framebuffer: FramebufferId, binding: BindingTarget) -> FramebufferStatus;

    /// Clear the buffers named in `mask` of the currently bound draw framebuffer
    fn clear(&mut self, framebuffer: FramebufferId, mask: BufferMask, values: &ClearValues) -> Result<()>;

    /// Region copy between two framebuffers
    fn blit(&mut self, request: &BlitRequest) -> Result<()>;

    // ===== SURFACE ARENA =====

    fn create_surface(&mut self, desc: &SurfaceDesc) -> Result<SurfaceKey>;

    fn destroy_surface(&mut self, surface: SurfaceKey) -> Result<()>;

    /// `None` for unknown or destroyed surfaces
    fn surface_info(&self, surface: SurfaceKey) -> Option<SurfaceInfo>;

    /// Reallocate one level of mutable storage; contents are discarded
    fn allocate_storage(&mut self, surface: SurfaceKey, level: u32, width: u32, height: u32) -> Result<()>;

    /// Allocate the whole chain of immutable storage from a base size; contents are discarded
    fn allocate_fixed_storage(
        &mut self,
        surface: SurfaceKey,
        level_count: u32,
        base_width: u32,
        base_height: u32,
    ) -> Result<()>;
}

/// Context shared between render targets, the engine and the application
pub type SharedContext = Arc<Mutex<dyn GraphicsContext>>;
