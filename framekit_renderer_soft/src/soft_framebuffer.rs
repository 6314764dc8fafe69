/// Framebuffer - software framebuffer object
///
/// Maps attachment points to surface views. A combined depth + stencil attach
/// fills both the `Depth` and `Stencil` slots with the same view.

use rustc_hash::FxHashMap;
use framekit::framekit::context::{AttachmentPoint, SurfaceKey};

/// Which part of a surface an attachment renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum View {
    /// A single layer (array layer, 3D slice or cube face index)
    Layer(u32),
    /// Every layer at once
    Layered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attachment {
    pub(crate) surface: SurfaceKey,
    pub(crate) level: u32,
    pub(crate) view: View,
}

impl Attachment {
    /// Layer read by blits (layered attachments read layer 0)
    pub(crate) fn read_layer(&self) -> u32 {
        match self.view {
            View::Layer(layer) => layer,
            View::Layered => 0,
        }
    }
}

#[derive(Default)]
pub(crate) struct Framebuffer {
    attachments: FxHashMap<AttachmentPoint, Attachment>,
}

impl Framebuffer {
    pub(crate) fn attach(&mut self, point: AttachmentPoint, attachment: Attachment) {
        match point {
            AttachmentPoint::DepthStencil => {
                self.attachments.insert(AttachmentPoint::Depth, attachment);
                self.attachments.insert(AttachmentPoint::Stencil, attachment);
            }
            _ => {
                self.attachments.insert(point, attachment);
            }
        }
    }

    pub(crate) fn detach(&mut self, point: AttachmentPoint) {
        match point {
            AttachmentPoint::DepthStencil => {
                self.attachments.remove(&AttachmentPoint::Depth);
                self.attachments.remove(&AttachmentPoint::Stencil);
            }
            _ => {
                self.attachments.remove(&point);
            }
        }
    }

    pub(crate) fn get(&self, point: AttachmentPoint) -> Option<Attachment> {
        self.attachments.get(&point).copied()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    /// Every (point, attachment) pair, colour points in ascending order
    pub(crate) fn iter(&self) -> impl Iterator<Item = (AttachmentPoint, Attachment)> + '_ {
        let mut points: Vec<AttachmentPoint> = self.attachments.keys().copied().collect();
        points.sort_by_key(|point| match point {
            AttachmentPoint::Depth => 0,
            AttachmentPoint::Stencil => 1,
            AttachmentPoint::DepthStencil => 2,
            AttachmentPoint::Colour(index) => 3 + *index as u64,
        });
        points.into_iter().filter_map(move |point| self.get(point).map(|attachment| (point, attachment)))
    }

    /// Colour attachments in ascending index order
    pub(crate) fn colour_attachments(&self) -> Vec<Attachment> {
        self.iter()
            .filter(|(point, _)| point.is_colour())
            .map(|(_, attachment)| attachment)
            .collect()
    }
}
