//! Unit tests for render_target.rs
//!
//! Runs RenderTarget against MockGraphicsContext and asserts on the recorded primitive calls.

use std::sync::{Arc, Mutex};
use glam::Vec4;
use crate::error::Error;
use crate::graphics_context::mock_graphics_context::MockGraphicsContext;
use crate::graphics_context::{
    AttachmentPoint, BindingTarget, BlitFilter, BufferMask, CubeFace, DeviceLimits, FramebufferId,
    FramebufferStatus, PixelFormat, Region, SharedContext, SurfaceDesc, SurfaceKey,
};
use crate::target::RenderTarget;

// ============================================================================
// HELPERS
// ============================================================================

struct Fixture {
    context: SharedContext,
    calls: Arc<Mutex<Vec<String>>>,
    status: Arc<Mutex<FramebufferStatus>>,
}

fn setup() -> Fixture {
    let (context, calls, status) = MockGraphicsContext::new().into_shared();
    Fixture { context, calls, status }
}

impl Fixture {
    fn surface(&self, desc: SurfaceDesc) -> SurfaceKey {
        self.context.lock().unwrap().create_surface(&desc).unwrap()
    }

    fn target(&self) -> RenderTarget {
        RenderTarget::new(self.context.clone(), BindingTarget::Both).unwrap()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| call.starts_with(prefix)).count()
    }

    fn last(&self, prefix: &str) -> Option<String> {
        self.calls.lock().unwrap().iter().rev().find(|call| call.starts_with(prefix)).cloned()
    }

    fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

fn assert_configuration_fault(result: crate::error::Result<()>) {
    match result {
        Err(Error::Configuration { .. }) => {}
        other => panic!("expected a configuration fault, got {:?}", other),
    }
}

// ============================================================================
// CREATION
// ============================================================================

#[test]
fn test_new_target_is_empty() {
    let fx = setup();
    let target = fx.target();

    assert!(!target.id().is_default());
    assert_eq!(fx.count("create_framebuffer"), 1);
    for point in [
        AttachmentPoint::Depth,
        AttachmentPoint::Stencil,
        AttachmentPoint::DepthStencil,
        AttachmentPoint::Colour(0),
        AttachmentPoint::Colour(7),
    ] {
        assert!(target.get_attachment(point).is_none());
    }
    assert_eq!(target.width().unwrap(), 0);
    assert_eq!(target.sample_count().unwrap(), 1);
}

#[test]
fn test_table_capacity_follows_device_limits() {
    let limits = DeviceLimits { max_colour_attachments: 2, ..DeviceLimits::default() };
    let (context, _, _) = MockGraphicsContext::new().with_limits(limits).into_shared();
    let target = RenderTarget::new(context, BindingTarget::Draw).unwrap();

    assert_eq!(target.attachments().colour_capacity(), 2);
    assert_eq!(target.binding(), BindingTarget::Draw);
}

#[test]
fn test_with_fixed_size() {
    let fx = setup();
    let target = RenderTarget::with_fixed_size(fx.context.clone(), 320, 240, 4).unwrap();
    assert_eq!((target.width().unwrap(), target.height().unwrap()), (320, 240));
    assert_eq!(target.sample_count().unwrap(), 4);

    let zero = RenderTarget::with_fixed_size(fx.context.clone(), 0, 240, 1);
    assert!(matches!(zero, Err(Error::Configuration { .. })));
    // The framebuffer created for the rejected target was released
    assert_eq!(fx.count("destroy_framebuffer"), 1);
}

// ============================================================================
// ATTACH: FORMAT ROLES
// ============================================================================

#[test]
fn test_colour_attachment_round_trips() {
    let fx = setup();
    let mut target = fx.target();
    let colour = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8G8B8A8_UNORM, 64, 32));

    target.set_attachment(AttachmentPoint::Colour(0), colour, None, None, 0).unwrap();

    let entry = target.get_attachment(AttachmentPoint::Colour(0)).unwrap();
    assert_eq!(entry.surface, colour);
    assert_eq!(fx.last("attach_texture_2d").unwrap(), format!("attach_texture_2d({}, Colour0, level 0)", target.id()));
    assert_eq!((target.width().unwrap(), target.height().unwrap()), (64, 32));
}

#[test]
fn test_depth_format_rejected_at_colour_point() {
    let fx = setup();
    let mut target = fx.target();
    let depth = fx.surface(SurfaceDesc::texture_2d(PixelFormat::D24_UNORM, 64, 64));

    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(0), depth, None, None, 0));
    assert_eq!(fx.count("attach_"), 0);
    assert!(target.get_attachment(AttachmentPoint::Colour(0)).is_none());
}

#[test]
fn test_colour_format_rejected_at_depth_points() {
    let fx = setup();
    let mut target = fx.target();
    let colour = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8G8B8A8_UNORM, 64, 64));

    assert_configuration_fault(target.set_attachment(AttachmentPoint::Depth, colour, None, None, 0));
    assert_configuration_fault(target.set_attachment(AttachmentPoint::DepthStencil, colour, None, None, 0));
    assert_configuration_fault(target.set_attachment(AttachmentPoint::Stencil, colour, None, None, 0));
}

#[test]
fn test_combined_format_at_depth_selects_depth_stencil() {
    let fx = setup();
    let mut target = fx.target();
    let ds = fx.surface(SurfaceDesc::renderbuffer(PixelFormat::D24_UNORM_S8_UINT, 64, 64));

    target.set_attachment(AttachmentPoint::Depth, ds, None, None, 0).unwrap();

    assert_eq!(fx.last("attach_renderbuffer").unwrap(), format!("attach_renderbuffer({}, DepthStencil)", target.id()));
    assert_eq!(target.get_attachment(AttachmentPoint::Depth).unwrap().surface, ds);
    assert_eq!(target.get_attachment(AttachmentPoint::Stencil).unwrap().surface, ds);
    assert_eq!(target.get_attachment(AttachmentPoint::DepthStencil).unwrap().surface, ds);
}

#[test]
fn test_depth_only_format_at_depth_stencil_selects_depth() {
    let fx = setup();
    let mut target = fx.target();
    let depth = fx.surface(SurfaceDesc::texture_2d(PixelFormat::D32_FLOAT, 64, 64));

    target.set_attachment(AttachmentPoint::DepthStencil, depth, None, None, 0).unwrap();

    assert_eq!(target.get_attachment(AttachmentPoint::Depth).unwrap().surface, depth);
    assert!(target.get_attachment(AttachmentPoint::DepthStencil).is_none());
    assert!(target.get_attachment(AttachmentPoint::Stencil).is_none());
}

#[test]
fn test_depth_only_over_combined_detaches_stencil() {
    let fx = setup();
    let mut target = fx.target();
    let ds = fx.surface(SurfaceDesc::renderbuffer(PixelFormat::D24_UNORM_S8_UINT, 16, 16));
    let depth = fx.surface(SurfaceDesc::texture_2d(PixelFormat::D32_FLOAT, 16, 16));
    target.set_attachment(AttachmentPoint::Depth, ds, None, None, 0).unwrap();
    fx.reset_calls();

    target.set_attachment(AttachmentPoint::Depth, depth, None, None, 0).unwrap();

    assert_eq!(fx.count("detach"), 1);
    assert_eq!(fx.last("detach").unwrap(), format!("detach({}, Stencil, Renderbuffer)", target.id()));
    assert_eq!(target.get_attachment(AttachmentPoint::Depth).unwrap().surface, depth);
    assert!(target.get_attachment(AttachmentPoint::Stencil).is_none());
}

#[test]
fn test_combined_over_combined_detaches_nothing() {
    let fx = setup();
    let mut target = fx.target();
    let first = fx.surface(SurfaceDesc::renderbuffer(PixelFormat::D24_UNORM_S8_UINT, 16, 16));
    let second = fx.surface(SurfaceDesc::renderbuffer(PixelFormat::D32_FLOAT_S8_UINT, 16, 16));
    target.set_attachment(AttachmentPoint::Depth, first, None, None, 0).unwrap();
    fx.reset_calls();

    target.set_attachment(AttachmentPoint::DepthStencil, second, None, None, 0).unwrap();

    assert_eq!(fx.count("detach"), 0);
    assert_eq!(target.get_attachment(AttachmentPoint::Stencil).unwrap().surface, second);
}

#[test]
fn test_stencil_point_requires_stencil_bits() {
    let fx = setup();
    let mut target = fx.target();
    let stencil = fx.surface(SurfaceDesc::renderbuffer(PixelFormat::S8_UINT, 64, 64));
    let depth = fx.surface(SurfaceDesc::renderbuffer(PixelFormat::D16_UNORM, 64, 64));

    assert_configuration_fault(target.set_attachment(AttachmentPoint::Stencil, depth, None, None, 0));
    target.set_attachment(AttachmentPoint::Stencil, stencil, None, None, 0).unwrap();
    assert_eq!(target.get_attachment(AttachmentPoint::Stencil).unwrap().surface, stencil);
}

#[test]
fn test_colour_index_beyond_device_limit_is_rejected() {
    let limits = DeviceLimits { max_colour_attachments: 2, ..DeviceLimits::default() };
    let (context, _, _) = MockGraphicsContext::new().with_limits(limits).into_shared();
    let colour = context.lock().unwrap()
        .create_surface(&SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 8, 8))
        .unwrap();
    let mut target = RenderTarget::new(context, BindingTarget::Both).unwrap();

    target.set_attachment(AttachmentPoint::Colour(1), colour, None, None, 0).unwrap();
    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(2), colour, None, None, 0));
}

#[test]
fn test_unknown_surface_is_invalid_resource() {
    let fx = setup();
    let mut target = fx.target();
    let colour = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 8, 8));
    fx.context.lock().unwrap().destroy_surface(colour).unwrap();

    let result = target.set_attachment(AttachmentPoint::Colour(0), colour, None, None, 0);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
fn test_level_out_of_range_is_rejected() {
    let fx = setup();
    let mut target = fx.target();
    let colour = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 8, 8).with_levels(2));

    target.set_attachment(AttachmentPoint::Colour(0), colour, None, None, 1).unwrap();
    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(0), colour, None, None, 2));
}

// ============================================================================
// ATTACH: DIMENSIONALITY DISPATCH
// ============================================================================

#[test]
fn test_1d_surface_uses_1d_attach() {
    let fx = setup();
    let mut target = fx.target();
    let line = fx.surface(SurfaceDesc::texture_1d(PixelFormat::R8_UNORM, 128));

    target.set_attachment(AttachmentPoint::Colour(0), line, None, None, 0).unwrap();
    assert_eq!(fx.count("attach_texture_1d"), 1);
    assert_eq!(target.height().unwrap(), 1);
}

#[test]
fn test_3d_surface_requires_offset_form() {
    let fx = setup();
    let mut target = fx.target();
    let volume = fx.surface(SurfaceDesc::texture_3d(PixelFormat::R8G8B8A8_UNORM, 16, 16, 4));

    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(0), volume, None, None, 0));
    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(0), volume, None, Some(1), 0));

    target.set_attachment_3d(AttachmentPoint::Colour(0), volume, 3, 0).unwrap();
    assert_eq!(
        fx.last("attach_texture_3d").unwrap(),
        format!("attach_texture_3d({}, Colour0, layer 3, level 0)", target.id())
    );
    assert_eq!(target.get_attachment(AttachmentPoint::Colour(0)).unwrap().layer, Some(3));

    assert_configuration_fault(target.set_attachment_3d(AttachmentPoint::Colour(0), volume, 4, 0));
}

#[test]
fn test_3d_form_rejects_other_kinds() {
    let fx = setup();
    let mut target = fx.target();
    let flat = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 16, 16));

    assert_configuration_fault(target.set_attachment_3d(AttachmentPoint::Colour(0), flat, 0, 0));
}

#[test]
fn test_array_layer_and_layered_attach() {
    let fx = setup();
    let mut target = fx.target();
    let array = fx.surface(SurfaceDesc::texture_2d_array(PixelFormat::R8_UNORM, 16, 16, 4));

    target.set_attachment(AttachmentPoint::Colour(0), array, None, Some(2), 0).unwrap();
    assert_eq!(fx.count("attach_texture_layer"), 1);
    assert!(!target.is_layered().unwrap());

    target.set_attachment(AttachmentPoint::Colour(0), array, None, None, 0).unwrap();
    assert_eq!(fx.count("attach_texture_layered"), 1);
    assert!(target.is_layered().unwrap());

    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(0), array, None, Some(4), 0));
    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(0), array, Some(CubeFace::PositiveX), None, 0));
}

#[test]
fn test_cube_face_and_layered_attach() {
    let fx = setup();
    let mut target = fx.target();
    let cube = fx.surface(SurfaceDesc::texture_cube(PixelFormat::R8G8B8A8_UNORM, 32));

    target.set_attachment(AttachmentPoint::Colour(0), cube, Some(CubeFace::NegativeY), None, 0).unwrap();
    assert_eq!(
        fx.last("attach_texture_cube_face").unwrap(),
        format!("attach_texture_cube_face({}, Colour0, NegativeY, level 0)", target.id())
    );

    target.set_attachment(AttachmentPoint::Colour(1), cube, None, None, 0).unwrap();
    assert_eq!(fx.count("attach_texture_layered"), 1);

    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(2), cube, None, Some(1), 0));
}

#[test]
fn test_cube_array_face_addresses_element_layer() {
    let fx = setup();
    let mut target = fx.target();
    let mut desc = SurfaceDesc::texture_cube(PixelFormat::R8_UNORM, 8);
    desc.kind = crate::graphics_context::SurfaceKind::TextureCubeArray;
    desc.depth_or_layers = 12;
    let cubes = fx.surface(desc);

    target.set_attachment(AttachmentPoint::Colour(0), cubes, Some(CubeFace::NegativeZ), Some(1), 0).unwrap();
    assert!(fx.last("attach_texture_layer").unwrap().contains("layer 11"));

    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(0), cubes, Some(CubeFace::PositiveX), Some(2), 0));
    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(0), cubes, None, Some(0), 0));
}

#[test]
fn test_renderbuffer_rejects_face_and_layer() {
    let fx = setup();
    let mut target = fx.target();
    let rb = fx.surface(SurfaceDesc::renderbuffer(PixelFormat::R8G8B8A8_UNORM, 16, 16));

    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(0), rb, None, Some(0), 0));
    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(0), rb, None, None, 1));
    target.set_attachment(AttachmentPoint::Colour(0), rb, None, None, 0).unwrap();
}

// ============================================================================
// DETACH
// ============================================================================

#[test]
fn test_remove_empty_point_is_noop() {
    let fx = setup();
    let mut target = fx.target();

    target.remove_attachment(AttachmentPoint::Colour(3)).unwrap();
    target.remove_attachment(AttachmentPoint::DepthStencil).unwrap();

    assert_eq!(fx.count("detach"), 0);
}

#[test]
fn test_remove_colour_detaches_with_kind() {
    let fx = setup();
    let mut target = fx.target();
    let colour = fx.surface(SurfaceDesc::texture_cube(PixelFormat::R8_UNORM, 8));
    target.set_attachment(AttachmentPoint::Colour(0), colour, Some(CubeFace::PositiveX), None, 0).unwrap();

    target.remove_attachment(AttachmentPoint::Colour(0)).unwrap();

    assert_eq!(fx.last("detach").unwrap(), format!("detach({}, Colour0, TextureCube)", target.id()));
    assert!(target.get_attachment(AttachmentPoint::Colour(0)).is_none());
}

#[test]
fn test_remove_depth_of_combined_clears_stencil() {
    let fx = setup();
    let mut target = fx.target();
    let ds = fx.surface(SurfaceDesc::texture_2d(PixelFormat::D24_UNORM_S8_UINT, 16, 16));
    target.set_attachment(AttachmentPoint::Depth, ds, None, None, 0).unwrap();

    target.remove_attachment(AttachmentPoint::Depth).unwrap();

    assert!(fx.last("detach").unwrap().contains("DepthStencil"));
    assert!(target.get_attachment(AttachmentPoint::Depth).is_none());
    assert!(target.get_attachment(AttachmentPoint::Stencil).is_none());
}

#[test]
fn test_remove_stencil_of_combined_keeps_depth() {
    let fx = setup();
    let mut target = fx.target();
    let ds = fx.surface(SurfaceDesc::texture_2d(PixelFormat::D24_UNORM_S8_UINT, 16, 16));
    target.set_attachment(AttachmentPoint::DepthStencil, ds, None, None, 0).unwrap();

    target.remove_attachment(AttachmentPoint::Stencil).unwrap();

    assert_eq!(fx.last("detach").unwrap(), format!("detach({}, Stencil, Texture2D)", target.id()));
    assert_eq!(target.get_attachment(AttachmentPoint::Depth).unwrap().surface, ds);
    assert!(target.get_attachment(AttachmentPoint::Stencil).is_none());
}

#[test]
fn test_removing_representative_moves_size_to_next_in_scan_order() {
    let fx = setup();
    let mut target = fx.target();
    let first = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 100, 50));
    let second = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 30, 20));
    target.set_attachment(AttachmentPoint::Colour(0), first, None, None, 0).unwrap();
    target.set_attachment(AttachmentPoint::Colour(1), second, None, None, 0).unwrap();
    assert_eq!(target.width().unwrap(), 100);

    target.remove_attachment(AttachmentPoint::Colour(0)).unwrap();

    assert_eq!((target.width().unwrap(), target.height().unwrap()), (30, 20));
}

// ============================================================================
// STATUS
// ============================================================================

#[test]
fn test_status_is_a_live_query() {
    let fx = setup();
    let mut target = fx.target();
    assert_eq!(target.status(), FramebufferStatus::MissingAttachment);

    let colour = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 8, 8));
    target.set_attachment(AttachmentPoint::Colour(0), colour, None, None, 0).unwrap();
    assert!(target.is_complete());

    *fx.status.lock().unwrap() = FramebufferStatus::IncompleteSamples;
    assert_eq!(target.validate(), FramebufferStatus::IncompleteSamples);
    assert_eq!(fx.count("check_status"), 3);
    assert_eq!(fx.count("bind_framebuffer"), 0);
}

#[test]
fn test_status_of_disposed_target_is_undefined() {
    let fx = setup();
    let mut target = fx.target();
    target.dispose();

    assert_eq!(target.status(), FramebufferStatus::Undefined);
    assert_eq!(fx.count("check_status"), 0);
}

// ============================================================================
// RESIZE
// ============================================================================

#[test]
fn test_resize_rejects_zero_size() {
    let fx = setup();
    let mut target = fx.target();

    assert_configuration_fault(target.resize(0, 10, 0));
    assert_configuration_fault(target.resize(10, 0, 0));
}

#[test]
fn test_resize_reallocates_each_surface_once() {
    let fx = setup();
    let mut target = fx.target();
    let colour = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8G8B8A8_UNORM, 64, 64));
    let depth = fx.surface(SurfaceDesc::renderbuffer(PixelFormat::D24_UNORM, 64, 64));
    target.set_attachment(AttachmentPoint::Colour(0), colour, None, None, 0).unwrap();
    target.set_attachment(AttachmentPoint::Colour(1), colour, None, None, 0).unwrap();
    target.set_attachment(AttachmentPoint::Depth, depth, None, None, 0).unwrap();
    fx.reset_calls();

    target.resize(128, 96, 0).unwrap();

    assert_eq!(fx.count("allocate_storage(level 0, 128x96)"), 2);
    assert_eq!((target.width().unwrap(), target.height().unwrap()), (128, 96));
    let depth_meta = target.attachment_metadata(AttachmentPoint::Depth).unwrap().unwrap();
    assert_eq!((depth_meta.width, depth_meta.height), (128, 96));
}

#[test]
fn test_resize_fixed_storage_reallocates_whole_chain() {
    let fx = setup();
    let mut target = fx.target();
    let fixed = fx.surface(
        SurfaceDesc::texture_2d(PixelFormat::R8G8B8A8_UNORM, 64, 64).with_levels(3).with_fixed_storage(),
    );
    target.set_attachment(AttachmentPoint::Colour(0), fixed, None, None, 1).unwrap();

    target.resize(100, 50, 1).unwrap();

    assert_eq!(fx.last("allocate_fixed_storage").unwrap(), "allocate_fixed_storage(3 levels, 200x100)");
    assert_eq!((target.width().unwrap(), target.height().unwrap()), (100, 50));
}

#[test]
fn test_resize_beyond_fixed_level_count_is_typed_fault() {
    let fx = setup();
    let mut target = fx.target();
    let growable = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 64, 64));
    let fixed = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 64, 64).with_levels(2).with_fixed_storage());
    target.set_attachment(AttachmentPoint::Colour(0), growable, None, None, 0).unwrap();
    target.set_attachment(AttachmentPoint::Colour(1), fixed, None, None, 0).unwrap();
    fx.reset_calls();

    let result = target.resize(32, 32, 2);

    assert_eq!(result, Err(Error::FixedStorage { surface: fixed, level: 2, level_count: 2 }));
    // Nothing was reallocated, not even the growable surface
    assert_eq!(fx.count("allocate_"), 0);
}

#[test]
fn test_resize_beyond_device_limit_reallocates_nothing() {
    let limits = DeviceLimits { max_size: 4096, ..DeviceLimits::default() };
    let (context, calls, status) = MockGraphicsContext::new().with_limits(limits).into_shared();
    let fx = Fixture { context, calls, status };
    let mut target = fx.target();
    let growable = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 64, 64).with_levels(2));
    let fixed = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 64, 64).with_levels(2).with_fixed_storage());
    target.set_attachment(AttachmentPoint::Colour(0), growable, None, None, 1).unwrap();
    target.set_attachment(AttachmentPoint::Colour(1), fixed, None, None, 1).unwrap();
    fx.reset_calls();

    // Level 1 fits, but the fixed chain would need a 6000x6000 base
    assert_configuration_fault(target.resize(3000, 3000, 1));
    assert_configuration_fault(target.resize(5000, 16, 1));
    assert_configuration_fault(target.resize(u32::MAX, 16, 1));

    assert_eq!(fx.count("allocate_"), 0);
    assert_eq!((target.width().unwrap(), target.height().unwrap()), (32, 32));

    target.resize(2048, 2048, 1).unwrap();
    assert_eq!(fx.last("allocate_fixed_storage").unwrap(), "allocate_fixed_storage(2 levels, 4096x4096)");
}

#[test]
fn test_resize_cube_must_stay_square() {
    let fx = setup();
    let mut target = fx.target();
    let cube = fx.surface(SurfaceDesc::texture_cube(PixelFormat::R8_UNORM, 16));
    target.set_attachment(AttachmentPoint::Colour(0), cube, None, None, 0).unwrap();

    assert_configuration_fault(target.resize(32, 16, 0));
    target.resize(32, 32, 0).unwrap();
}

// ============================================================================
// CLEAR
// ============================================================================

#[test]
fn test_clear_binds_draw_then_clears() {
    let fx = setup();
    let target = fx.target();
    fx.reset_calls();

    target.clear(BufferMask::COLOUR | BufferMask::DEPTH).unwrap();

    let calls = fx.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], format!("bind_framebuffer(Draw, {})", target.id()));
    assert!(calls[1].starts_with(&format!("clear({}", target.id())));
}

#[test]
fn test_clear_with_empty_mask_does_nothing() {
    let fx = setup();
    let target = fx.target();
    fx.reset_calls();

    target.clear(BufferMask::empty()).unwrap();
    assert!(fx.calls.lock().unwrap().is_empty());
}

#[test]
fn test_clear_values() {
    let fx = setup();
    let mut target = fx.target();

    assert_eq!(target.clear_colour(), Vec4::ZERO);
    assert_eq!(target.clear_depth(), 1.0);
    assert_eq!(target.clear_stencil(), 0);

    target.set_clear_colour(Vec4::new(0.1, 0.2, 0.3, 1.0));
    target.set_clear_depth(0.5);
    target.set_clear_stencil(7);

    let values = target.clear_values();
    assert_eq!(values.colour, Vec4::new(0.1, 0.2, 0.3, 1.0));
    assert_eq!(values.depth, 0.5);
    assert_eq!(values.stencil, 7);
}

// ============================================================================
// BLIT
// ============================================================================

#[test]
fn test_copy_to_default_target() {
    let fx = setup();
    let source = fx.target();
    fx.reset_calls();

    source
        .copy_to(None, Region::full(8, 8), Region::full(16, 16), BufferMask::COLOUR, BlitFilter::Linear)
        .unwrap();

    let calls = fx.calls.lock().unwrap().clone();
    assert_eq!(calls[0], format!("bind_framebuffer(Read, {})", source.id()));
    assert_eq!(calls[1], format!("bind_framebuffer(Draw, {})", FramebufferId::DEFAULT));
    assert!(calls[2].starts_with(&format!("blit({} -> #0", source.id())));
}

#[test]
fn test_copy_to_other_target() {
    let fx = setup();
    let source = fx.target();
    let destination = fx.target();

    source
        .copy_to(Some(&destination), Region::full(8, 8), Region::full(8, 8), BufferMask::COLOUR, BlitFilter::Nearest)
        .unwrap();

    assert!(fx.last("blit").unwrap().starts_with(&format!("blit({} -> {}", source.id(), destination.id())));
}

#[test]
fn test_depth_blit_requires_nearest() {
    let fx = setup();
    let source = fx.target();

    assert_configuration_fault(source.copy_to(
        None, Region::full(8, 8), Region::full(8, 8), BufferMask::DEPTH, BlitFilter::Linear,
    ));
    assert_configuration_fault(source.copy_to(
        None, Region::full(8, 8), Region::full(8, 8), BufferMask::COLOUR | BufferMask::STENCIL, BlitFilter::Linear,
    ));
    assert_eq!(fx.count("blit"), 0);
}

#[test]
fn test_empty_region_is_rejected() {
    let fx = setup();
    let source = fx.target();

    assert_configuration_fault(source.copy_to(
        None, Region::new(0, 0, 0, 8), Region::full(8, 8), BufferMask::COLOUR, BlitFilter::Nearest,
    ));
}

#[test]
fn test_blit_across_contexts_is_rejected() {
    let fx = setup();
    let other = setup();
    let source = fx.target();
    let destination = other.target();

    assert_configuration_fault(source.copy_to(
        Some(&destination), Region::full(8, 8), Region::full(8, 8), BufferMask::COLOUR, BlitFilter::Nearest,
    ));
}

#[test]
fn test_blit_to_disposed_target_is_rejected() {
    let fx = setup();
    let source = fx.target();
    let mut destination = fx.target();
    destination.dispose();

    assert_configuration_fault(source.copy_to(
        Some(&destination), Region::full(8, 8), Region::full(8, 8), BufferMask::COLOUR, BlitFilter::Nearest,
    ));
}

// ============================================================================
// DISPOSE
// ============================================================================

#[test]
fn test_dispose_twice_releases_once() {
    let fx = setup();
    let mut target = fx.target();

    target.dispose();
    target.dispose();
    drop(target);

    assert_eq!(fx.count("destroy_framebuffer"), 1);
}

#[test]
fn test_drop_disposes() {
    let fx = setup();
    {
        let _target = fx.target();
    }
    assert_eq!(fx.count("destroy_framebuffer"), 1);
}

#[test]
fn test_dispose_leaves_attached_surfaces_alone() {
    let fx = setup();
    let mut target = fx.target();
    let colour = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 8, 8));
    target.set_attachment(AttachmentPoint::Colour(0), colour, None, None, 0).unwrap();

    target.dispose();

    assert_eq!(fx.count("destroy_surface"), 0);
    assert!(fx.context.lock().unwrap().surface_info(colour).is_some());
}

#[test]
fn test_operations_after_dispose_are_faults() {
    let fx = setup();
    let mut target = fx.target();
    let colour = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 8, 8));
    target.dispose();

    assert_configuration_fault(target.set_attachment(AttachmentPoint::Colour(0), colour, None, None, 0));
    assert_configuration_fault(target.resize(8, 8, 0));
    assert_configuration_fault(target.clear(BufferMask::COLOUR));
}

// ============================================================================
// PLATFORM TARGET MIRROR
// ============================================================================

#[test]
fn test_default_mirror_rejects_attachment_changes() {
    let fx = setup();
    let mut mirror = RenderTarget::for_default(fx.context.clone()).unwrap();
    let colour = fx.surface(SurfaceDesc::texture_2d(PixelFormat::R8_UNORM, 8, 8));

    assert!(mirror.is_default());
    assert_eq!((mirror.width().unwrap(), mirror.height().unwrap()), (800, 600));
    assert!(mirror.double_buffered().unwrap());
    assert!(matches!(
        mirror.set_attachment(AttachmentPoint::Colour(0), colour, None, None, 0),
        Err(Error::NotSupported(_))
    ));
    assert!(matches!(mirror.resize(8, 8, 0), Err(Error::NotSupported(_))));

    mirror.dispose();
    assert_eq!(fx.count("destroy_framebuffer"), 0);
}
