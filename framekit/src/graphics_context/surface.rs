/// Surfaces: the textures and renderbuffers a render target can attach
///
/// Surfaces live in the context's arena and are referenced by `SurfaceKey`.
/// A render target never owns the surfaces it references.

use slotmap::new_key_type;
use crate::graphics_context::PixelFormat;

new_key_type! {
    /// Non-owning handle to a surface in a context's arena
    pub struct SurfaceKey;
}

/// Dimensionality of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Texture1D,
    Texture1DArray,
    Texture2D,
    Texture2DArray,
    Texture2DMultisample,
    Texture2DMultisampleArray,
    Texture3D,
    TextureCube,
    TextureCubeArray,
    /// Render-only pixel store, never sampled
    Renderbuffer,
}

impl SurfaceKind {
    /// True for kinds with more than one addressable layer
    pub fn is_layered_kind(self) -> bool {
        matches!(
            self,
            SurfaceKind::Texture1DArray
                | SurfaceKind::Texture2DArray
                | SurfaceKind::Texture2DMultisampleArray
                | SurfaceKind::Texture3D
                | SurfaceKind::TextureCube
                | SurfaceKind::TextureCubeArray
        )
    }

    pub fn is_multisample(self) -> bool {
        matches!(self, SurfaceKind::Texture2DMultisample | SurfaceKind::Texture2DMultisampleArray)
    }

    pub fn is_cube(self) -> bool {
        matches!(self, SurfaceKind::TextureCube | SurfaceKind::TextureCubeArray)
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            SurfaceKind::Texture1DArray
                | SurfaceKind::Texture2DArray
                | SurfaceKind::Texture2DMultisampleArray
                | SurfaceKind::TextureCubeArray
        )
    }

    /// One-dimensional kinds always have a height of 1
    pub fn is_1d(self) -> bool {
        matches!(self, SurfaceKind::Texture1D | SurfaceKind::Texture1DArray)
    }
}

/// Cubemap face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Layer offset of this face inside a cube (or cube array element)
    pub fn index(self) -> u32 {
        match self {
            CubeFace::PositiveX => 0,
            CubeFace::NegativeX => 1,
            CubeFace::PositiveY => 2,
            CubeFace::NegativeY => 3,
            CubeFace::PositiveZ => 4,
            CubeFace::NegativeZ => 5,
        }
    }
}

/// Storage allocation model of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    /// Immutable storage: the whole level chain is allocated at once and its level count is final
    Fixed { level_count: u32 },
    /// Mutable storage: any level may be reallocated at any time
    Growable,
}

/// Descriptor for creating a surface
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDesc {
    pub kind: SurfaceKind,
    pub format: PixelFormat,
    /// Width of level 0 in pixels
    pub width: u32,
    /// Height of level 0 in pixels (1 for 1D kinds)
    pub height: u32,
    /// Depth for 3D surfaces, layer count for arrays, 6 x elements for cube arrays, 6 for cubes, 1 otherwise
    pub depth_or_layers: u32,
    /// Mip levels to allocate up front (Growable) or the final chain length (Fixed)
    pub levels: u32,
    /// Sample count (1 unless multisample)
    pub samples: u32,
    pub fixed_sample_locations: bool,
    pub storage: Storage,
}

impl SurfaceDesc {
    /// Single-level growable 2D texture
    pub fn texture_2d(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            kind: SurfaceKind::Texture2D,
            format,
            width,
            height,
            depth_or_layers: 1,
            levels: 1,
            samples: 1,
            fixed_sample_locations: true,
            storage: Storage::Growable,
        }
    }

    pub fn texture_1d(format: PixelFormat, width: u32) -> Self {
        Self {
            kind: SurfaceKind::Texture1D,
            height: 1,
            ..Self::texture_2d(format, width, 1)
        }
    }

    pub fn renderbuffer(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            kind: SurfaceKind::Renderbuffer,
            ..Self::texture_2d(format, width, height)
        }
    }

    pub fn texture_2d_multisample(
        format: PixelFormat,
        width: u32,
        height: u32,
        samples: u32,
        fixed_sample_locations: bool,
    ) -> Self {
        Self {
            kind: SurfaceKind::Texture2DMultisample,
            samples,
            fixed_sample_locations,
            ..Self::texture_2d(format, width, height)
        }
    }

    pub fn texture_2d_array(format: PixelFormat, width: u32, height: u32, layers: u32) -> Self {
        Self {
            kind: SurfaceKind::Texture2DArray,
            depth_or_layers: layers,
            ..Self::texture_2d(format, width, height)
        }
    }

    pub fn texture_3d(format: PixelFormat, width: u32, height: u32, depth: u32) -> Self {
        Self {
            kind: SurfaceKind::Texture3D,
            depth_or_layers: depth,
            ..Self::texture_2d(format, width, height)
        }
    }

    pub fn texture_cube(format: PixelFormat, size: u32) -> Self {
        Self {
            kind: SurfaceKind::TextureCube,
            depth_or_layers: 6,
            ..Self::texture_2d(format, size, size)
        }
    }

    /// Mip levels to allocate
    pub fn with_levels(mut self, levels: u32) -> Self {
        self.levels = levels;
        self
    }

    /// Switch to immutable storage holding exactly `levels` levels
    pub fn with_fixed_storage(mut self) -> Self {
        self.storage = Storage::Fixed { level_count: self.levels };
        self
    }
}

/// Read-only properties of a created surface
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceInfo {
    pub kind: SurfaceKind,
    pub format: PixelFormat,
    pub depth_or_layers: u32,
    pub samples: u32,
    pub fixed_sample_locations: bool,
    pub storage: Storage,
    /// (width, height) of every allocated level; index is the mip level
    pub levels: Vec<(u32, u32)>,
}

impl SurfaceInfo {
    /// Size of `level`, `None` if that level was never allocated
    pub fn level_size(&self, level: u32) -> Option<(u32, u32)> {
        self.levels.get(level as usize).copied()
    }

    pub fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn width(&self) -> u32 {
        self.levels.first().map(|(w, _)| *w).unwrap_or(0)
    }

    pub fn height(&self) -> u32 {
        self.levels.first().map(|(_, h)| *h).unwrap_or(0)
    }

    /// Number of attachable layers (faces count as layers for cubes)
    pub fn layer_count(&self) -> u32 {
        match self.kind {
            SurfaceKind::Texture1D
            | SurfaceKind::Texture2D
            | SurfaceKind::Texture2DMultisample
            | SurfaceKind::Renderbuffer => 1,
            _ => self.depth_or_layers,
        }
    }
}

/// Full level chain for a base size: each level halves, clamped to 1
pub fn mip_chain(base_width: u32, base_height: u32, level_count: u32) -> Vec<(u32, u32)> {
    (0..level_count)
        .map(|level| ((base_width >> level).max(1), (base_height >> level).max(1)))
        .collect()
}
