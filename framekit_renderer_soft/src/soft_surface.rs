/// Surface - software implementation of a texture or renderbuffer
///
/// Texels are stored as `Vec4`, one plane per level and layer, rows bottom-up.
/// Colour texels hold RGBA; depth/stencil texels hold depth in `x` and the
/// stencil value in `y`. Multisample surfaces keep one value per pixel.

use glam::Vec4;
use framekit::framekit::context::{
    mip_chain, ComponentType, PixelFormat, Region, Storage, SurfaceDesc, SurfaceInfo,
};

/// Software surface
pub(crate) struct Surface {
    /// Read-only properties shared with the render-target layer
    pub(crate) info: SurfaceInfo,
    /// Texels of every level, `layer_count` planes back to back
    levels: Vec<Vec<Vec4>>,
    /// Internal surfaces back the platform target and are hidden from callers
    pub(crate) internal: bool,
}

impl Surface {
    pub(crate) fn new(desc: &SurfaceDesc) -> Self {
        let height = if desc.kind.is_1d() { 1 } else { desc.height };
        let level_count = match desc.storage {
            Storage::Fixed { level_count } => level_count,
            Storage::Growable => desc.levels,
        }
        .max(1);

        let info = SurfaceInfo {
            kind: desc.kind,
            format: desc.format,
            depth_or_layers: desc.depth_or_layers.max(1),
            samples: desc.samples.max(1),
            fixed_sample_locations: desc.fixed_sample_locations,
            storage: desc.storage,
            levels: mip_chain(desc.width, height, level_count),
        };
        let mut surface = Self { info, levels: Vec::new(), internal: false };
        surface.levels = surface.info.levels.iter().map(|&(w, h)| surface.blank_plane(w, h)).collect();
        surface
    }

    fn layer_count(&self) -> u32 {
        self.info.layer_count().max(1)
    }

    fn blank_plane(&self, width: u32, height: u32) -> Vec<Vec4> {
        let texels = width as usize * height as usize * self.layer_count() as usize;
        vec![Vec4::ZERO; texels]
    }

    /// Reallocate one level; missing lower levels are created at 1x1
    pub(crate) fn allocate_level(&mut self, level: u32, width: u32, height: u32) {
        let height = if self.info.kind.is_1d() { 1 } else { height };
        while self.info.levels.len() <= level as usize {
            self.info.levels.push((1, 1));
            let plane = self.blank_plane(1, 1);
            self.levels.push(plane);
        }
        self.info.levels[level as usize] = (width, height);
        self.levels[level as usize] = self.blank_plane(width, height);
    }

    /// Reallocate the whole chain as immutable storage
    pub(crate) fn allocate_chain(&mut self, level_count: u32, base_width: u32, base_height: u32) {
        let base_height = if self.info.kind.is_1d() { 1 } else { base_height };
        self.info.storage = Storage::Fixed { level_count };
        self.info.levels = mip_chain(base_width, base_height, level_count);
        self.levels = self.info.levels.iter().map(|&(w, h)| self.blank_plane(w, h)).collect();
    }

    fn index(&self, level: u32, layer: u32, x: u32, y: u32) -> Option<usize> {
        let (width, height) = self.info.level_size(level)?;
        if layer >= self.layer_count() || x >= width || y >= height {
            return None;
        }
        let plane = width as usize * height as usize;
        Some(layer as usize * plane + y as usize * width as usize + x as usize)
    }

    pub(crate) fn texel(&self, level: u32, layer: u32, x: u32, y: u32) -> Option<Vec4> {
        let index = self.index(level, layer, x, y)?;
        self.levels.get(level as usize)?.get(index).copied()
    }

    /// Store `value` as-is (the caller has already encoded it)
    pub(crate) fn set_texel(&mut self, level: u32, layer: u32, x: u32, y: u32, value: Vec4) -> bool {
        let Some(index) = self.index(level, layer, x, y) else {
            return false;
        };
        match self.levels.get_mut(level as usize).and_then(|plane| plane.get_mut(index)) {
            Some(texel) => {
                *texel = value;
                true
            }
            None => false,
        }
    }

    /// Apply `f` to every texel of a level/layer
    pub(crate) fn for_each_texel(&mut self, level: u32, layer: u32, mut f: impl FnMut(&mut Vec4)) {
        let Some((width, height)) = self.info.level_size(level) else {
            return;
        };
        if layer >= self.layer_count() {
            return;
        }
        let plane = width as usize * height as usize;
        let start = layer as usize * plane;
        if let Some(texels) = self.levels.get_mut(level as usize).and_then(|p| p.get_mut(start..start + plane)) {
            texels.iter_mut().for_each(&mut f);
        }
    }

    /// Copy out a region of a level/layer, rows bottom-up; `None` if it leaves the level
    pub(crate) fn read_region(&self, level: u32, layer: u32, region: Region) -> Option<Vec<Vec4>> {
        if region.is_empty() {
            return Some(Vec::new());
        }
        let (x0, y0) = self.region_origin(level, layer, region)?;
        let mut out = Vec::with_capacity(region.width as usize * region.height as usize);
        for row in 0..region.height {
            for column in 0..region.width {
                out.push(self.texel(level, layer, x0 + column, y0 + row)?);
            }
        }
        Some(out)
    }

    /// Encode and store `texels` into a region; `false` if it leaves the level
    pub(crate) fn write_region(&mut self, level: u32, layer: u32, region: Region, texels: &[Vec4]) -> bool {
        if texels.len() != region.width as usize * region.height as usize {
            return false;
        }
        if region.is_empty() {
            return true;
        }
        let Some((x0, y0)) = self.region_origin(level, layer, region) else {
            return false;
        };
        let format = self.info.format;
        for (i, value) in texels.iter().enumerate() {
            let x = x0 + (i as u32 % region.width);
            let y = y0 + (i as u32 / region.width);
            self.set_texel(level, layer, x, y, encode(format, *value));
        }
        true
    }

    /// Origin of a non-empty `region` that lies wholly inside the level
    fn region_origin(&self, level: u32, layer: u32, region: Region) -> Option<(u32, u32)> {
        let x0 = u32::try_from(region.x).ok()?;
        let y0 = u32::try_from(region.y).ok()?;
        let x1 = x0.checked_add(region.width - 1)?;
        let y1 = y0.checked_add(region.height - 1)?;
        self.index(level, layer, x1, y1)?;
        Some((x0, y0))
    }
}

// ===== TEXEL ENCODING =====

fn quantize_unorm(value: f32, bits: u8) -> f32 {
    let max = ((1u64 << bits) - 1) as f64;
    ((value.clamp(0.0, 1.0) as f64 * max).round() / max) as f32
}

fn encode_channel(value: f32, bits: u8, component: ComponentType) -> f32 {
    match component {
        ComponentType::UnsignedNormalized => quantize_unorm(value, bits),
        ComponentType::UnsignedInteger => {
            let max = ((1u64 << bits.min(32)) - 1) as f32;
            value.round().clamp(0.0, max)
        }
        ComponentType::Float => value,
    }
}

/// Round a value to what `format` can represent
///
/// Absent colour channels read back as 0 (alpha as 1). Depth is clamped to
/// [0, 1] and stencil is an 8-bit unsigned integer.
pub(crate) fn encode(format: PixelFormat, value: Vec4) -> Vec4 {
    let bits = format.channel_bits();
    let component = format.component_type();

    if format.is_colour() {
        let channel = |v: f32, b: u8, absent: f32| if b == 0 { absent } else { encode_channel(v, b, component) };
        return Vec4::new(
            channel(value.x, bits.red, 0.0),
            channel(value.y, bits.green, 0.0),
            channel(value.z, bits.blue, 0.0),
            channel(value.w, bits.alpha, 1.0),
        );
    }

    let depth = match (bits.depth, component) {
        (0, _) => 0.0,
        (_, ComponentType::Float) => value.x.clamp(0.0, 1.0),
        (depth_bits, _) => quantize_unorm(value.x, depth_bits),
    };
    let stencil = if bits.stencil == 0 {
        0.0
    } else {
        encode_channel(value.y, bits.stencil, ComponentType::UnsignedInteger)
    };
    Vec4::new(depth, stencil, 0.0, 0.0)
}

#[cfg(test)]
#[path = "soft_surface_tests.rs"]
mod tests;
