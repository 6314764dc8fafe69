/// Render-target properties: size, sample count and buffering flags
///
/// Attachment-derived properties are pull-based: every query re-reads the
/// representative entry of the table and the live surface info from the
/// context. Fixed properties (size-only targets, the platform target mirror)
/// never consult the table.

use crate::graphics_context::{
    AttachmentPoint, ChannelBits, ColourEncoding, ComponentType, CubeFace, GraphicsContext,
    PixelFormat, SurfaceInfo, SurfaceKey, SurfaceKind,
};
use crate::target::{AttachmentEntry, AttachmentTable};

/// Whole-target properties at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySnapshot {
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub double_buffered: bool,
    pub stereo: bool,
}

impl PropertySnapshot {
    /// Snapshot of a target with no representative
    pub const EMPTY: PropertySnapshot = PropertySnapshot {
        width: 0,
        height: 0,
        sample_count: 1,
        double_buffered: false,
        stereo: false,
    };

    pub fn sized(width: u32, height: u32, sample_count: u32) -> Self {
        Self { width, height, sample_count, ..Self::EMPTY }
    }
}

/// Where the properties come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertySource {
    /// The representative attachment, re-read on every query
    Attachments,
    /// Values set at construction (or by an explicit sync)
    Fixed(PropertySnapshot),
}

/// Per-attachment metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentMetadata {
    pub point: AttachmentPoint,
    pub surface: SurfaceKey,
    pub kind: SurfaceKind,
    pub format: PixelFormat,
    pub bits: ChannelBits,
    pub encoding: ColourEncoding,
    pub component_type: ComponentType,
    pub face: Option<CubeFace>,
    pub layer: Option<u32>,
    pub level: u32,
    /// Every layer of the surface is attached at once
    pub layered: bool,
    /// Size of the attached level
    pub width: u32,
    pub height: u32,
    pub samples: u32,
}

/// Derived metadata of one render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetProperties {
    source: PropertySource,
}

impl RenderTargetProperties {
    pub fn from_attachments() -> Self {
        Self { source: PropertySource::Attachments }
    }

    pub fn fixed(snapshot: PropertySnapshot) -> Self {
        Self { source: PropertySource::Fixed(snapshot) }
    }

    pub fn source(&self) -> PropertySource {
        self.source
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.source, PropertySource::Fixed(_))
    }

    /// Replace fixed values; attachment-derived properties are left untouched
    pub(crate) fn set_fixed(&mut self, snapshot: PropertySnapshot) {
        if let PropertySource::Fixed(current) = &mut self.source {
            *current = snapshot;
        }
    }

    fn representative(
        table: &AttachmentTable,
        context: &dyn GraphicsContext,
    ) -> Option<(AttachmentEntry, SurfaceInfo)> {
        let entry = *table.representative()?;
        let info = context.surface_info(entry.surface)?;
        Some((entry, info))
    }

    pub fn width(&self, table: &AttachmentTable, context: &dyn GraphicsContext) -> u32 {
        self.snapshot(table, context).width
    }

    pub fn height(&self, table: &AttachmentTable, context: &dyn GraphicsContext) -> u32 {
        self.snapshot(table, context).height
    }

    pub fn sample_count(&self, table: &AttachmentTable, context: &dyn GraphicsContext) -> u32 {
        self.snapshot(table, context).sample_count
    }

    pub fn double_buffered(&self, table: &AttachmentTable, context: &dyn GraphicsContext) -> bool {
        self.snapshot(table, context).double_buffered
    }

    pub fn stereo(&self, table: &AttachmentTable, context: &dyn GraphicsContext) -> bool {
        self.snapshot(table, context).stereo
    }

    /// True when the representative attachment binds every layer of its surface
    pub fn is_layered(&self, table: &AttachmentTable, context: &dyn GraphicsContext) -> bool {
        match self.source {
            PropertySource::Fixed(_) => false,
            PropertySource::Attachments => Self::representative(table, context)
                .map(|(entry, info)| is_layered_view(&entry, &info))
                .unwrap_or(false),
        }
    }

    /// All whole-target properties in one query
    pub fn snapshot(&self, table: &AttachmentTable, context: &dyn GraphicsContext) -> PropertySnapshot {
        match self.source {
            PropertySource::Fixed(snapshot) => snapshot,
            PropertySource::Attachments => match Self::representative(table, context) {
                Some((entry, info)) => {
                    let (width, height) = info.level_size(entry.level).unwrap_or((0, 0));
                    PropertySnapshot::sized(width, height, info.samples.max(1))
                }
                None => PropertySnapshot::EMPTY,
            },
        }
    }

    /// Metadata of the entry visible at `point`
    pub fn metadata(
        table: &AttachmentTable,
        point: AttachmentPoint,
        context: &dyn GraphicsContext,
    ) -> Option<AttachmentMetadata> {
        let entry = *table.get(point)?;
        let info = context.surface_info(entry.surface)?;
        let (width, height) = info.level_size(entry.level).unwrap_or((0, 0));
        Some(AttachmentMetadata {
            point,
            surface: entry.surface,
            kind: info.kind,
            format: info.format,
            bits: info.format.channel_bits(),
            encoding: info.format.encoding(),
            component_type: info.format.component_type(),
            face: entry.face,
            layer: entry.layer,
            level: entry.level,
            layered: is_layered_view(&entry, &info),
            width,
            height,
            samples: info.samples.max(1),
        })
    }

    /// Metadata of the representative entry
    pub fn representative_metadata(
        table: &AttachmentTable,
        context: &dyn GraphicsContext,
    ) -> Option<AttachmentMetadata> {
        let point = table.representative_point()?;
        Self::metadata(table, point, context)
    }
}

fn is_layered_view(entry: &AttachmentEntry, info: &SurfaceInfo) -> bool {
    info.kind.is_layered_kind() && entry.layer.is_none() && entry.face.is_none()
}

#[cfg(test)]
#[path = "properties_tests.rs"]
mod tests;
