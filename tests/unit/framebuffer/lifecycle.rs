use super::*;
use crate::caps::policy::{AlwaysOffscreen, LegacyMacPolicy, NeverOffscreen};
use crate::caps::probe::probe;
use crate::driver::api::FramebufferStatus;
use crate::driver::headless::{HeadlessDriver, HeadlessOpts};

fn setup(opts: HeadlessOpts) -> (HeadlessDriver, Capabilities, ContextHandle) {
    let d = HeadlessDriver::new(opts);
    let caps = probe(&d);
    let ctx = d.context();
    (d, caps, ctx)
}

#[test]
fn offscreen_decision_uses_effective_samples() {
    let caps = Capabilities::default();
    let mac = PlatformInfo::new("Mac OS X", "10.8");
    let strict = LegacyMacPolicy {
        min_minor_version: 6,
        min_samples: 2,
    };
    assert!(!decide_needs_offscreen(&strict, &mac, 1, &caps));
    assert!(decide_needs_offscreen(&strict, &mac, 3, &caps));
    assert!(decide_needs_offscreen(&AlwaysOffscreen, &mac, 0, &caps));
    assert!(!decide_needs_offscreen(&NeverOffscreen, &mac, 8, &caps));
}

#[test]
fn geometry_covers_the_request() {
    let (mut d, caps, ctx) = setup(HeadlessOpts::default());
    let mut fbs = FramebufferLifecycleManager::new();
    fbs.ensure_created(&mut d, 300, 200, &caps, 1, ctx).unwrap();
    assert_eq!((fbs.width(), fbs.height()), (300, 200));
    assert_eq!(fbs.state(), FramebufferState::Created);
    assert!(fbs.is_fbo_backed());

    let (mut d, caps, ctx) = setup(HeadlessOpts {
        extensions: "GL_EXT_framebuffer_multisample GL_EXT_packed_depth_stencil".to_string(),
        ..HeadlessOpts::default()
    });
    let mut fbs = FramebufferLifecycleManager::new();
    fbs.ensure_created(&mut d, 300, 200, &caps, 1, ctx).unwrap();
    assert_eq!((fbs.width(), fbs.height()), (512, 256));
    let tex = fbs.color_texture().unwrap();
    assert_eq!(d.texture_size(tex), Some((512, 256)));
    assert_eq!(fbs.set().unwrap().requested(), SurfaceSize::new(300, 200));
}

#[test]
fn same_request_allocates_once() {
    let (mut d, caps, ctx) = setup(HeadlessOpts::default());
    let mut fbs = FramebufferLifecycleManager::new();
    fbs.ensure_created(&mut d, 64, 64, &caps, 4, ctx).unwrap();
    let after_first = d.stats().buffer_allocations();
    fbs.ensure_created(&mut d, 64, 64, &caps, 4, ctx).unwrap();
    fbs.ensure_created(&mut d, 64, 64, &caps, 4, ContextHandle::Uninitialized)
        .unwrap();
    assert_eq!(d.stats().buffer_allocations(), after_first);
    // texture, color fbo, multisample fbo, color and depth/stencil renderbuffers
    assert_eq!(after_first, 5);
}

#[test]
fn resize_replaces_the_set() {
    let (mut d, caps, ctx) = setup(HeadlessOpts::default());
    let mut fbs = FramebufferLifecycleManager::new();
    fbs.ensure_created(&mut d, 64, 64, &caps, 1, ctx).unwrap();
    let old_fbo = fbs.screen_framebuffer().unwrap();
    let live = d.live_objects();

    fbs.ensure_created(&mut d, 128, 96, &caps, 1, ctx).unwrap();
    assert!(!d.has_framebuffer(old_fbo));
    assert_eq!(d.live_objects(), live);
    assert_eq!((fbs.width(), fbs.height()), (128, 96));
}

#[test]
fn multisample_without_support_fails_before_allocating() {
    let (mut d, caps, ctx) = setup(HeadlessOpts::minimal());
    let mut fbs = FramebufferLifecycleManager::new();
    let err = fbs.ensure_created(&mut d, 64, 64, &caps, 4, ctx).unwrap_err();
    assert!(matches!(err, CompositeError::MultisampleUnsupported));
    assert!(err.is_fatal());
    assert_eq!(d.stats().buffer_allocations(), 0);
    assert!(fbs.is_single_buffered());
}

#[test]
fn oversized_request_without_npot_is_rejected() {
    let (mut d, caps, ctx) = setup(HeadlessOpts::minimal());
    assert!(!caps.non_power_of_two_supported);
    let mut fbs = FramebufferLifecycleManager::new();
    let err = fbs
        .ensure_created(&mut d, 0x8000_0001, 16, &caps, 1, ctx)
        .unwrap_err();
    assert!(matches!(err, CompositeError::Config(_)));
    assert_eq!(d.stats().buffer_allocations(), 0);
    assert!(fbs.set().is_none());
}

#[test]
fn incomplete_framebuffer_releases_everything() {
    let (mut d, caps, ctx) = setup(HeadlessOpts::default());
    d.force_framebuffer_status(Some(FramebufferStatus::IncompleteFormats));
    let mut fbs = FramebufferLifecycleManager::new();
    let err = fbs.ensure_created(&mut d, 64, 64, &caps, 4, ctx).unwrap_err();
    assert!(matches!(
        err,
        CompositeError::FramebufferIncomplete(FramebufferStatus::IncompleteFormats)
    ));
    assert_eq!(d.live_objects(), 0);
    assert!(fbs.is_single_buffered());
    assert_eq!(fbs.state(), FramebufferState::Destroyed);
    assert_eq!(d.bound_framebuffer(FramebufferTarget::Draw), None);
}

#[test]
fn context_change_forgets_without_deleting() {
    let (mut d, caps, ctx) = setup(HeadlessOpts::default());
    let mut fbs = FramebufferLifecycleManager::new();
    fbs.ensure_created(&mut d, 32, 32, &caps, 2, ctx).unwrap();

    let new_ctx = d.recreate_context();
    let deleted = d.stats().objects_deleted;
    let allocs = d.stats().buffer_allocations();
    fbs.ensure_created(&mut d, 32, 32, &caps, 2, new_ctx).unwrap();
    assert_eq!(d.stats().objects_deleted, deleted);
    assert_eq!(d.stats().buffer_allocations(), allocs * 2);
    assert!(fbs.set().unwrap().owner().same_live(new_ctx));
}

#[test]
fn depth_only_store_without_packed_support() {
    let (mut d, caps, ctx) = setup(HeadlessOpts {
        extensions: "GL_ARB_texture_non_power_of_two GL_EXT_framebuffer_multisample".to_string(),
        ..HeadlessOpts::default()
    });
    let mut fbs = FramebufferLifecycleManager::new();
    fbs.ensure_created(&mut d, 40, 30, &caps, 4, ctx).unwrap();
    let set = fbs.set().unwrap();
    assert!(!set.packed_depth_stencil());
    assert!(matches!(set.depth_stencil(), DepthStencil::DepthOnly(_)));
    assert!(set.is_multisample());

    let (mut d, caps, ctx) = setup(HeadlessOpts::default());
    let mut fbs = FramebufferLifecycleManager::new();
    fbs.ensure_created(&mut d, 40, 30, &caps, 1, ctx).unwrap();
    let set = fbs.set().unwrap();
    assert!(set.packed_depth_stencil());
    assert!(!set.is_multisample());
}

#[test]
fn samples_above_the_limit_are_clamped() {
    let (mut d, caps, ctx) = setup(HeadlessOpts {
        max_samples: 5,
        ..HeadlessOpts::default()
    });
    let mut fbs = FramebufferLifecycleManager::new();
    fbs.ensure_created(&mut d, 16, 16, &caps, 16, ctx).unwrap();
    assert_eq!(fbs.set().unwrap().samples(), 4);
}

#[test]
fn destroy_and_screen_target() {
    let (mut d, caps, ctx) = setup(HeadlessOpts::default());
    let mut fbs = FramebufferLifecycleManager::new();
    assert_eq!(fbs.screen_framebuffer(), None);
    fbs.ensure_created(&mut d, 16, 16, &caps, 2, ctx).unwrap();
    let set = fbs.set().unwrap();
    let (color, multi) = (set.color_framebuffer(), set.multisample_framebuffer());
    assert_eq!(fbs.screen_framebuffer(), Some(color));
    assert_eq!(d.bound_framebuffer(FramebufferTarget::Draw), Some(color));

    fbs.mark_bound(true);
    assert_eq!(fbs.state(), FramebufferState::BoundMultisample);
    assert_eq!(fbs.screen_framebuffer(), multi);

    fbs.destroy(&mut d);
    assert_eq!(d.live_objects(), 0);
    assert_eq!(fbs.state(), FramebufferState::Destroyed);
    assert_eq!(fbs.width(), 0);
    fbs.destroy(&mut d);
}
