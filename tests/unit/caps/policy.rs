use super::*;

fn mac(version: &str) -> PlatformInfo {
    PlatformInfo::new("Mac OS X", version)
}

#[test]
fn version_parsing() {
    assert_eq!(mac("10.8.5").version(), Some((10, 8)));
    assert_eq!(mac("10.6").version(), Some((10, 6)));
    assert_eq!(mac("14").version(), Some((14, 0)));
    assert_eq!(mac("").version(), None);
    assert_eq!(mac("ten.six").version(), None);
}

#[test]
fn macos_names() {
    assert!(PlatformInfo::new("macos", "").is_macos());
    assert!(mac("").is_macos());
    assert!(!PlatformInfo::new("linux", "6.1").is_macos());
}

#[test]
fn legacy_mac_policy_thresholds() {
    let p = LegacyMacPolicy::default();
    let caps = Capabilities::default();
    assert!(!p.needs_offscreen(&mac("10.5.8"), 4, &caps));
    assert!(p.needs_offscreen(&mac("10.6"), 4, &caps));
    assert!(p.needs_offscreen(&mac("10.9.1"), 1, &caps));
    assert!(p.needs_offscreen(&mac("12.3"), 2, &caps));
    assert!(!p.needs_offscreen(&mac(""), 4, &caps));
    assert!(!p.needs_offscreen(&PlatformInfo::new("windows", "10.0"), 4, &caps));
}

#[test]
fn legacy_mac_policy_honors_sample_floor() {
    let p = LegacyMacPolicy {
        min_minor_version: 7,
        min_samples: 4,
    };
    let caps = Capabilities::default();
    assert!(!p.needs_offscreen(&mac("10.8"), 2, &caps));
    assert!(p.needs_offscreen(&mac("10.8"), 4, &caps));
    assert!(!p.needs_offscreen(&mac("10.6"), 8, &caps));
}

#[test]
fn fixed_policies() {
    let caps = Capabilities::default();
    let linux = PlatformInfo::new("linux", "");
    assert!(AlwaysOffscreen.needs_offscreen(&linux, 1, &caps));
    assert!(!NeverOffscreen.needs_offscreen(&mac("10.8"), 8, &caps));
}
