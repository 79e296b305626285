use super::*;
use crate::driver::headless::{HeadlessDriver, HeadlessOpts};

#[test]
fn full_driver_reports_everything() {
    let d = HeadlessDriver::default();
    let caps = probe(&d);
    assert!(caps.extended_profile);
    assert!(caps.multisample_supported);
    assert!(caps.packed_depth_stencil_supported);
    assert!(caps.non_power_of_two_supported);
    assert_eq!(caps.max_samples, 8);
}

#[test]
fn minimal_driver_reports_nothing() {
    let d = HeadlessDriver::new(HeadlessOpts::minimal());
    assert_eq!(probe(&d), Capabilities::default());
}

#[test]
fn multisample_needs_the_extended_profile() {
    let d = HeadlessDriver::new(HeadlessOpts {
        extended_profile: false,
        ..HeadlessOpts::default()
    });
    let caps = probe(&d);
    assert!(!caps.multisample_supported);
    assert_eq!(caps.max_samples, 1);
    assert!(caps.packed_depth_stencil_supported);
}

#[test]
fn bogus_max_samples_is_clamped_to_one() {
    let d = HeadlessDriver::new(HeadlessOpts {
        max_samples: -3,
        ..HeadlessOpts::default()
    });
    assert_eq!(probe(&d).max_samples, 1);
}

#[test]
fn extension_names_match_any_vendor_prefix() {
    let d = HeadlessDriver::new(HeadlessOpts {
        extensions: "GL_OES_packed_depth_stencil GL_OES_texture_npot".to_string(),
        ..HeadlessOpts::default()
    });
    let caps = probe(&d);
    assert!(caps.packed_depth_stencil_supported);
    assert!(!caps.non_power_of_two_supported);
    assert!(!caps.multisample_supported);
}
