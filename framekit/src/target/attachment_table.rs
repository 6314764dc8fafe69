/// Attachment table: the enum-keyed slots of one render target
///
/// Slots are addressed through an explicit point-to-index lookup:
///
/// | slot  | holds                                      |
/// |-------|--------------------------------------------|
/// | 0     | `Depth` or the combined `DepthStencil`     |
/// | 1     | `Stencil` (separate stencil-only surface)  |
/// | 2 + i | `Colour(i)`                                |
///
/// `Depth` and `DepthStencil` share slot 0, so writing one replaces the other.
/// The table also tracks the representative entry used for whole-target
/// queries, and rescans for a new one in `REPRESENTATIVE_SCAN_ORDER` when the
/// representative is removed.

use crate::error::{Error, Result};
use crate::graphics_context::{AttachmentPoint, CubeFace, SurfaceKey};

const DEPTH_SLOT: usize = 0;
const STENCIL_SLOT: usize = 1;
const FIRST_COLOUR_SLOT: usize = 2;

/// One attached surface view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentEntry {
    /// Referenced surface (not owned)
    pub surface: SurfaceKey,
    /// Cube face, for cube and cube-array surfaces attached one face at a time
    pub face: Option<CubeFace>,
    /// Array layer or 3D slice; `None` when the surface is attached whole
    pub layer: Option<u32>,
    /// Mip level
    pub level: u32,
}

impl AttachmentEntry {
    /// Whole surface at `level`
    pub fn new(surface: SurfaceKey, level: u32) -> Self {
        Self { surface, face: None, layer: None, level }
    }
}

/// Group of slots visited by a representative rescan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanGroup {
    /// Slot 0 (`Depth` or `DepthStencil`)
    Depth,
    /// Slot 1 (`Stencil`)
    Stencil,
    /// `Colour(0)`, `Colour(1)`, ... ascending
    ColourAscending,
}

/// Priority order used to pick a new representative after the current one is removed
pub const REPRESENTATIVE_SCAN_ORDER: [ScanGroup; 3] = [
    ScanGroup::Depth,
    ScanGroup::Stencil,
    ScanGroup::ColourAscending,
];

/// Fixed-capacity attachment slots of one render target
#[derive(Debug, Clone)]
pub struct AttachmentTable {
    slots: Vec<Option<AttachmentEntry>>,
    /// Slot 0 holds a combined depth + stencil view
    combined_depth_stencil: bool,
    representative: Option<usize>,
}

impl AttachmentTable {
    /// Empty table with room for `colour_capacity` colour points
    pub fn new(colour_capacity: u32) -> Self {
        Self {
            slots: vec![None; FIRST_COLOUR_SLOT + colour_capacity as usize],
            combined_depth_stencil: false,
            representative: None,
        }
    }

    /// Number of colour points this table can hold
    pub fn colour_capacity(&self) -> u32 {
        (self.slots.len() - FIRST_COLOUR_SLOT) as u32
    }

    fn slot_of(&self, point: AttachmentPoint) -> Option<usize> {
        let slot = match point {
            AttachmentPoint::Depth | AttachmentPoint::DepthStencil => DEPTH_SLOT,
            AttachmentPoint::Stencil => STENCIL_SLOT,
            AttachmentPoint::Colour(index) => FIRST_COLOUR_SLOT + index as usize,
        };
        (slot < self.slots.len()).then_some(slot)
    }

    fn point_of(&self, slot: usize) -> AttachmentPoint {
        match slot {
            DEPTH_SLOT if self.combined_depth_stencil => AttachmentPoint::DepthStencil,
            DEPTH_SLOT => AttachmentPoint::Depth,
            STENCIL_SLOT => AttachmentPoint::Stencil,
            _ => AttachmentPoint::Colour((slot - FIRST_COLOUR_SLOT) as u32),
        }
    }

    /// True if `point` can be stored in this table
    pub fn contains_point(&self, point: AttachmentPoint) -> bool {
        self.slot_of(point).is_some()
    }

    /// Store `entry` at `point`
    ///
    /// No format validation happens here. `DepthStencil` replaces both a
    /// depth-only entry and a separate stencil entry; `Stencil` splits a
    /// combined entry so slot 0 keeps only its depth view.
    pub fn add(&mut self, point: AttachmentPoint, entry: AttachmentEntry) -> Result<()> {
        let slot = self.slot_of(point).ok_or_else(|| Error::InvalidResource(format!(
            "Attachment point {} exceeds the {} colour point(s) of this table",
            point,
            self.colour_capacity()
        )))?;

        match point {
            AttachmentPoint::Depth => {
                self.combined_depth_stencil = false;
            }
            AttachmentPoint::DepthStencil => {
                self.combined_depth_stencil = true;
                self.slots[STENCIL_SLOT] = None;
                if self.representative == Some(STENCIL_SLOT) {
                    self.representative = None;
                }
            }
            AttachmentPoint::Stencil => {
                self.combined_depth_stencil = false;
            }
            AttachmentPoint::Colour(_) => {}
        }

        self.slots[slot] = Some(entry);
        if self.representative.is_none() || self.representative == Some(slot) {
            self.representative = Some(slot);
        }
        Ok(())
    }

    /// Clear `point` and return what was stored there
    ///
    /// Removing `Depth` or `DepthStencil` clears the whole depth/stencil pair.
    /// Removing `Stencil` from a combined entry keeps its depth view.
    pub fn remove(&mut self, point: AttachmentPoint) -> Option<AttachmentEntry> {
        let slot = self.slot_of(point)?;

        let removed = match point {
            AttachmentPoint::Depth => {
                self.combined_depth_stencil = false;
                self.slots[DEPTH_SLOT].take()
            }
            AttachmentPoint::DepthStencil => {
                self.combined_depth_stencil = false;
                let depth = self.slots[DEPTH_SLOT].take();
                let stencil = self.slots[STENCIL_SLOT].take();
                depth.or(stencil)
            }
            AttachmentPoint::Stencil => {
                if self.slots[STENCIL_SLOT].is_some() {
                    self.slots[STENCIL_SLOT].take()
                } else if self.combined_depth_stencil {
                    self.combined_depth_stencil = false;
                    self.slots[DEPTH_SLOT]
                } else {
                    None
                }
            }
            AttachmentPoint::Colour(_) => self.slots[slot].take(),
        };

        if let Some(representative) = self.representative {
            if self.slots[representative].is_none() {
                self.representative = self.rescan();
            }
        }
        removed
    }

    /// Entry visible at `point`, `None` for an unused point
    pub fn get(&self, point: AttachmentPoint) -> Option<&AttachmentEntry> {
        match point {
            AttachmentPoint::Depth => self.slots[DEPTH_SLOT].as_ref(),
            AttachmentPoint::DepthStencil => {
                if self.combined_depth_stencil {
                    self.slots[DEPTH_SLOT].as_ref()
                } else {
                    None
                }
            }
            AttachmentPoint::Stencil => {
                if self.combined_depth_stencil {
                    self.slots[DEPTH_SLOT].as_ref()
                } else {
                    self.slots[STENCIL_SLOT].as_ref()
                }
            }
            AttachmentPoint::Colour(_) => self.slot_of(point).and_then(|slot| self.slots[slot].as_ref()),
        }
    }

    /// True when slot 0 holds a combined depth + stencil entry
    pub fn is_combined_depth_stencil(&self) -> bool {
        self.combined_depth_stencil
    }

    /// Point whose entry describes the whole target
    pub fn representative_point(&self) -> Option<AttachmentPoint> {
        self.representative.map(|slot| self.point_of(slot))
    }

    pub fn representative(&self) -> Option<&AttachmentEntry> {
        self.representative.and_then(|slot| self.slots[slot].as_ref())
    }

    fn rescan(&self) -> Option<usize> {
        REPRESENTATIVE_SCAN_ORDER.iter().find_map(|group| match group {
            ScanGroup::Depth => self.slots[DEPTH_SLOT].is_some().then_some(DEPTH_SLOT),
            ScanGroup::Stencil => self.slots[STENCIL_SLOT].is_some().then_some(STENCIL_SLOT),
            ScanGroup::ColourAscending => (FIRST_COLOUR_SLOT..self.slots.len())
                .find(|slot| self.slots[*slot].is_some()),
        })
    }

    /// Occupied points in scan order
    pub fn iter(&self) -> impl Iterator<Item = (AttachmentPoint, &AttachmentEntry)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|entry| (self.point_of(slot), entry)))
    }

    /// Distinct referenced surfaces in scan order
    pub fn surfaces(&self) -> Vec<SurfaceKey> {
        let mut surfaces: Vec<SurfaceKey> = Vec::new();
        for (_, entry) in self.iter() {
            if !surfaces.contains(&entry.surface) {
                surfaces.push(entry.surface);
            }
        }
        surfaces
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|entry| entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|entry| entry.is_none())
    }
}

#[cfg(test)]
#[path = "attachment_table_tests.rs"]
mod tests;
