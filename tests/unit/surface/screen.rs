use super::*;
use crate::caps::policy::PlatformInfo;
use crate::driver::headless::{HeadlessDriver, HeadlessOpts};
use crate::surface::config::OffscreenMode;
use crate::surface::host::RecordingHost;

fn config(antialias: u32, offscreen: OffscreenMode) -> SurfaceConfig {
    SurfaceConfig {
        antialias,
        offscreen,
        platform: PlatformInfo::new("linux", ""),
        ..SurfaceConfig::default()
    }
}

fn live_surface(antialias: u32, offscreen: OffscreenMode) -> Surface<HeadlessDriver> {
    let mut s = Surface::new(HeadlessDriver::default(), config(antialias, offscreen)).unwrap();
    let ctx = s.driver().context();
    s.on_context_created(ctx);
    s.initialize(&mut RecordingHost::new()).unwrap();
    s.on_resized(100, 80);
    s
}

#[test]
fn swap_interval_table() {
    assert_eq!(swap_interval_for(120.0), 0);
    assert_eq!(swap_interval_for(60.0), 1);
    assert_eq!(swap_interval_for(31.0), 1);
    assert_eq!(swap_interval_for(30.0), 2);
    assert_eq!(swap_interval_for(1.0), 2);
}

#[test]
fn direct_surface_requests_a_multisampled_drawable() {
    let mut s = Surface::new(HeadlessDriver::default(), config(4, OffscreenMode::Never)).unwrap();
    let mut host = RecordingHost::new();
    let req = s.initialize(&mut host).unwrap();
    assert!(!s.needs_offscreen());
    assert!(req.sample_buffers);
    assert_eq!(req.samples, 4);
    assert_eq!((req.depth_bits, req.stencil_bits, req.alpha_bits), (24, 8, 8));
    assert!(req.background_opaque);

    s.initialize(&mut host).unwrap();
    assert_eq!((host.created, host.recreated), (1, 1));
}

#[test]
fn offscreen_surface_requests_a_plain_drawable() {
    let mut s = Surface::new(HeadlessDriver::default(), config(4, OffscreenMode::Always)).unwrap();
    let req = s.initialize(&mut RecordingHost::new()).unwrap();
    assert!(s.needs_offscreen());
    assert!(!req.sample_buffers);
    assert_eq!(req.samples, 1);
}

#[test]
fn direct_surface_never_creates_a_set() {
    let mut s = live_surface(4, OffscreenMode::Never);
    s.frame(|s| s.present_flat_color(Rgba::OPAQUE_BLACK, PixelRect::of_size(10, 10)))
        .unwrap();
    assert!(s.is_single_buffered());
    assert_eq!(s.screen_framebuffer(), None);
    assert_eq!(s.driver().stats().buffer_allocations(), 0);
    assert_eq!(s.blit_stats().presents, 0);
}

#[test]
fn resize_rebuilds_the_set_on_next_update() {
    let mut s = live_surface(2, OffscreenMode::Always);
    s.update().unwrap();
    assert_eq!((s.fbo_width(), s.fbo_height()), (100, 80));
    let old = s.color_texture().unwrap();

    s.on_resized(200, 150);
    assert!(s.is_single_buffered());
    assert!(!s.driver().has_texture(old));
    s.update().unwrap();
    assert_eq!((s.fbo_width(), s.fbo_height()), (200, 150));
}

#[test]
fn events_from_other_threads_apply_on_update() {
    let mut s = live_surface(1, OffscreenMode::Always);
    let events = s.events();
    std::thread::spawn(move || {
        assert!(events.resized(64, 32));
        assert!(events.frame_rate(24.0));
    })
    .join()
    .unwrap();

    assert_eq!(s.size(), SurfaceSize::new(100, 80));
    s.update().unwrap();
    assert_eq!(s.size(), SurfaceSize::new(64, 32));
    assert_eq!(s.fbo_width(), 64);
    assert_eq!(s.driver().swap_interval(), 2);
}

#[test]
fn context_change_forgets_the_set_and_reprobes() {
    let mut s = live_surface(2, OffscreenMode::Always);
    s.update().unwrap();
    let deleted = s.driver().stats().objects_deleted;

    let ctx = s.driver_mut().recreate_context();
    s.events().context_created(ctx);
    s.update().unwrap();
    assert!(s.context().same_live(ctx));
    assert!(s.is_fbo_backed());
    assert_eq!(s.driver().stats().objects_deleted, deleted);
    assert!(s.capabilities().multisample_supported);
}

#[test]
fn multisample_without_support_is_fatal() {
    let mut s = Surface::new(
        HeadlessDriver::new(HeadlessOpts::minimal()),
        config(4, OffscreenMode::Always),
    )
    .unwrap();
    let ctx = s.driver().context();
    s.on_context_created(ctx);
    s.initialize(&mut RecordingHost::new()).unwrap();
    s.on_resized(10, 10);
    let err = s.begin_frame().unwrap_err();
    assert!(matches!(err, CompositeError::MultisampleUnsupported));
    assert!(err.is_fatal());
    assert!(!s.in_frame());
}

#[test]
fn offscreen_need_is_known_before_initialize() {
    let s = Surface::new(HeadlessDriver::default(), config(4, OffscreenMode::Always)).unwrap();
    assert!(s.needs_offscreen());
    let s = Surface::new(HeadlessDriver::default(), config(4, OffscreenMode::Never)).unwrap();
    assert!(!s.needs_offscreen());
}

#[test]
fn repeated_context_report_keeps_the_set() {
    let mut s = live_surface(2, OffscreenMode::Always);
    s.update().unwrap();
    let live = s.driver().live_objects();
    let tex = s.color_texture().unwrap();

    let ctx = s.context();
    s.on_context_created(ctx);
    s.update().unwrap();
    assert_eq!(s.driver().live_objects(), live);
    assert_eq!(s.color_texture(), Some(tex));
    assert_eq!(s.driver().stats().buffer_allocations(), 5);
}

#[test]
fn frame_rate_crossing_sixty_needs_reinit() {
    let mut s = live_surface(1, OffscreenMode::Never);
    s.set_frame_rate(50.0).unwrap();
    assert!(!s.needs_reinit());
    assert_eq!(s.driver().swap_interval(), 1);

    s.set_frame_rate(120.0).unwrap();
    assert!(s.needs_reinit());
    assert_eq!(s.driver().swap_interval(), 0);

    s.initialize(&mut RecordingHost::new()).unwrap();
    assert!(!s.needs_reinit());
    assert!(s.set_frame_rate(0.0).is_err());
    assert_eq!(s.frame_rate(), 120.0);
}

#[test]
fn teardown_releases_everything() {
    let mut s = live_surface(4, OffscreenMode::Always);
    s.frame(|_| ()).unwrap();
    assert!(s.driver().live_objects() > 0);

    let mut host = RecordingHost::new();
    s.teardown(&mut host);
    assert_eq!(host.torn_down, 1);
    assert_eq!(s.driver().live_objects(), 0);
    assert!(s.is_single_buffered());
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = SurfaceConfig {
        frame_rate: 0.0,
        ..SurfaceConfig::default()
    };
    assert!(matches!(
        Surface::new(HeadlessDriver::default(), cfg),
        Err(CompositeError::Config(_))
    ));
}
