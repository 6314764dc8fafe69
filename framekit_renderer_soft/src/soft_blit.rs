/// Blit resampling
///
/// Maps every destination pixel centre back into the source region and
/// samples it with nearest or bilinear filtering. Coordinates use a
/// bottom-left origin on both sides.

use std::ops::Range;
use glam::Vec4;
use framekit::framekit::context::{BlitFilter, Region};
use crate::soft_surface::Surface;

/// Level and layer of a surface being read
#[derive(Clone, Copy)]
pub(crate) struct SourcePlane<'a> {
    pub(crate) surface: &'a Surface,
    pub(crate) level: u32,
    pub(crate) layer: u32,
}

impl SourcePlane<'_> {
    fn size(&self) -> (u32, u32) {
        self.surface.info.level_size(self.level).unwrap_or((0, 0))
    }

    fn fetch(&self, x: i64, y: i64) -> Option<Vec4> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        self.surface.texel(self.level, self.layer, x, y)
    }
}

/// Source-space coordinate of the centre of destination pixel `offset`
fn source_coordinate(offset: u32, destination_len: u32, source_origin: i32, source_len: u32) -> f64 {
    source_origin as f64 + (offset as f64 + 0.5) * source_len as f64 / destination_len as f64
}

fn sample_nearest(plane: &SourcePlane, u: f64, v: f64) -> Option<Vec4> {
    plane.fetch(u.floor() as i64, v.floor() as i64)
}

fn sample_linear(plane: &SourcePlane, u: f64, v: f64) -> Option<Vec4> {
    let (width, height) = plane.size();
    if width == 0 || height == 0 || u < 0.0 || v < 0.0 || u >= width as f64 || v >= height as f64 {
        return None;
    }

    let x = u - 0.5;
    let y = v - 0.5;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = (x - x0) as f32;
    let fy = (y - y0) as f32;

    // Edge texels are clamped
    let clamp_x = |value: f64| (value as i64).clamp(0, width as i64 - 1);
    let clamp_y = |value: f64| (value as i64).clamp(0, height as i64 - 1);
    let (left, right) = (clamp_x(x0), clamp_x(x0 + 1.0));
    let (bottom, top) = (clamp_y(y0), clamp_y(y0 + 1.0));

    let lower = plane.fetch(left, bottom)?.lerp(plane.fetch(right, bottom)?, fx);
    let upper = plane.fetch(left, top)?.lerp(plane.fetch(right, top)?, fx);
    Some(lower.lerp(upper, fy))
}

/// Offsets along one axis of a region at `origin` that land inside `0..extent`
fn visible_span(origin: i32, len: u32, extent: u32) -> Range<u32> {
    let origin = i64::from(origin);
    let start = (-origin).clamp(0, i64::from(len));
    let end = (i64::from(extent) - origin).clamp(start, i64::from(len));
    start as u32..end as u32
}

/// Resample `source_region` of `plane` onto `destination_region`
///
/// The destination region is clipped to a `destination_size` level first; only
/// visible pixels are sampled. Each entry pairs the destination pixel with its
/// sample, rows bottom-up; the sample is `None` where the mapped position falls
/// outside the source level.
pub(crate) fn resample(
    plane: SourcePlane,
    source_region: Region,
    destination_region: Region,
    destination_size: (u32, u32),
    filter: BlitFilter,
) -> Vec<((u32, u32), Option<Vec4>)> {
    let columns = visible_span(destination_region.x, destination_region.width, destination_size.0);
    let rows = visible_span(destination_region.y, destination_region.height, destination_size.1);

    let mut out = Vec::with_capacity(columns.len() * rows.len());
    for row in rows {
        let v = source_coordinate(row, destination_region.height, source_region.y, source_region.height);
        let y = (i64::from(destination_region.y) + i64::from(row)) as u32;
        for column in columns.clone() {
            let u = source_coordinate(column, destination_region.width, source_region.x, source_region.width);
            let x = (i64::from(destination_region.x) + i64::from(column)) as u32;
            let sample = match filter {
                BlitFilter::Nearest => sample_nearest(&plane, u, v),
                BlitFilter::Linear => sample_linear(&plane, u, v),
            };
            out.push(((x, y), sample));
        }
    }
    out
}

#[cfg(test)]
#[path = "soft_blit_tests.rs"]
mod tests;
