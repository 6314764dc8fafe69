/// Pixel formats usable as render-target attachments, and their per-channel metadata

/// Attachment pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum PixelFormat {
    // Colour formats
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    A2B10G10R10_UNORM,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32G32B32A32_SFLOAT,
    R32_UINT,

    // Depth formats
    D16_UNORM,
    D24_UNORM,
    D32_FLOAT,

    // Combined depth + stencil formats
    D24_UNORM_S8_UINT,
    D32_FLOAT_S8_UINT,

    // Stencil-only
    S8_UINT,
}

/// Which kind of attachment point a format may occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatRole {
    Colour,
    Depth,
    Stencil,
    DepthStencil,
}

/// Colour encoding of the stored values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColourEncoding {
    Linear,
    Srgb,
}

/// Numeric interpretation of the stored components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// Unsigned normalized integer
    UnsignedNormalized,
    /// Floating point
    Float,
    /// Unsigned integer
    UnsignedInteger,
}

/// Bit size of every channel (0 when the channel is absent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelBits {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
    pub depth: u8,
    pub stencil: u8,
}

impl ChannelBits {
    const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self { red, green, blue, alpha, depth: 0, stencil: 0 }
    }

    const fn depth_stencil(depth: u8, stencil: u8) -> Self {
        Self { red: 0, green: 0, blue: 0, alpha: 0, depth, stencil }
    }
}

impl PixelFormat {
    /// Attachment role this format can fill
    pub fn role(self) -> FormatRole {
        match self {
            PixelFormat::D16_UNORM | PixelFormat::D24_UNORM | PixelFormat::D32_FLOAT => FormatRole::Depth,
            PixelFormat::D24_UNORM_S8_UINT | PixelFormat::D32_FLOAT_S8_UINT => FormatRole::DepthStencil,
            PixelFormat::S8_UINT => FormatRole::Stencil,
            _ => FormatRole::Colour,
        }
    }

    pub fn has_depth(self) -> bool {
        matches!(self.role(), FormatRole::Depth | FormatRole::DepthStencil)
    }

    pub fn has_stencil(self) -> bool {
        matches!(self.role(), FormatRole::Stencil | FormatRole::DepthStencil)
    }

    pub fn is_colour(self) -> bool {
        self.role() == FormatRole::Colour
    }

    /// Per-channel bit sizes
    pub fn channel_bits(self) -> ChannelBits {
        match self {
            PixelFormat::R8_UNORM => ChannelBits::rgba(8, 0, 0, 0),
            PixelFormat::R8G8_UNORM => ChannelBits::rgba(8, 8, 0, 0),
            PixelFormat::R8G8B8A8_UNORM
            | PixelFormat::R8G8B8A8_SRGB
            | PixelFormat::B8G8R8A8_UNORM => ChannelBits::rgba(8, 8, 8, 8),
            PixelFormat::A2B10G10R10_UNORM => ChannelBits::rgba(10, 10, 10, 2),
            PixelFormat::R16G16B16A16_SFLOAT => ChannelBits::rgba(16, 16, 16, 16),
            PixelFormat::R32_SFLOAT | PixelFormat::R32_UINT => ChannelBits::rgba(32, 0, 0, 0),
            PixelFormat::R32G32B32A32_SFLOAT => ChannelBits::rgba(32, 32, 32, 32),
            PixelFormat::D16_UNORM => ChannelBits::depth_stencil(16, 0),
            PixelFormat::D24_UNORM => ChannelBits::depth_stencil(24, 0),
            PixelFormat::D32_FLOAT => ChannelBits::depth_stencil(32, 0),
            PixelFormat::D24_UNORM_S8_UINT => ChannelBits::depth_stencil(24, 8),
            PixelFormat::D32_FLOAT_S8_UINT => ChannelBits::depth_stencil(32, 8),
            PixelFormat::S8_UINT => ChannelBits::depth_stencil(0, 8),
        }
    }

    pub fn encoding(self) -> ColourEncoding {
        match self {
            PixelFormat::R8G8B8A8_SRGB => ColourEncoding::Srgb,
            _ => ColourEncoding::Linear,
        }
    }

    /// Component type of the colour or depth channels (stencil is always unsigned integer)
    pub fn component_type(self) -> ComponentType {
        match self {
            PixelFormat::R16G16B16A16_SFLOAT
            | PixelFormat::R32_SFLOAT
            | PixelFormat::R32G32B32A32_SFLOAT
            | PixelFormat::D32_FLOAT
            | PixelFormat::D32_FLOAT_S8_UINT => ComponentType::Float,
            PixelFormat::R32_UINT | PixelFormat::S8_UINT => ComponentType::UnsignedInteger,
            _ => ComponentType::UnsignedNormalized,
        }
    }

    /// Packed size of one texel in bytes
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::R8_UNORM | PixelFormat::S8_UINT => 1,
            PixelFormat::R8G8_UNORM | PixelFormat::D16_UNORM => 2,
            PixelFormat::R8G8B8A8_UNORM
            | PixelFormat::R8G8B8A8_SRGB
            | PixelFormat::B8G8R8A8_UNORM
            | PixelFormat::A2B10G10R10_UNORM
            | PixelFormat::R32_SFLOAT
            | PixelFormat::R32_UINT
            | PixelFormat::D24_UNORM
            | PixelFormat::D32_FLOAT
            | PixelFormat::D24_UNORM_S8_UINT => 4,
            PixelFormat::R16G16B16A16_SFLOAT | PixelFormat::D32_FLOAT_S8_UINT => 8,
            PixelFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

#[cfg(test)]
#[path = "pixel_format_tests.rs"]
mod tests;
