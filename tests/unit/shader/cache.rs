use super::*;
use crate::driver::headless::HeadlessDriver;

#[test]
fn repeated_requests_hit_the_cache() {
    let mut d = HeadlessDriver::default();
    let ctx = d.context();
    let mut cache = ShaderProgramCache::new();

    let a = cache.get(&mut d, DrawPurpose::Texture2d, ctx);
    let b = cache.get(&mut d, DrawPurpose::Texture2d, ctx);
    assert!(a.is_valid());
    assert_eq!(a, b);
    assert_eq!(d.stats().shader_compiles, 2);
    assert_eq!(d.stats().program_links, 1);
    assert_eq!(cache.stats().builds, 1);
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn context_change_rebuilds_once() {
    let mut d = HeadlessDriver::default();
    let first_ctx = d.context();
    let mut cache = ShaderProgramCache::new();
    let first = cache.get(&mut d, DrawPurpose::FlatColor, first_ctx);

    let second_ctx = d.recreate_context();
    let before = d.stats().clone();
    let second = cache.get(&mut d, DrawPurpose::FlatColor, second_ctx);
    let again = cache.get(&mut d, DrawPurpose::FlatColor, second_ctx);

    assert!(second.is_valid());
    assert_ne!(first, second);
    assert_eq!(second, again);
    assert_eq!(d.stats().shader_compiles - before.shader_compiles, 2);
    assert_eq!(d.stats().program_links - before.program_links, 1);
    // Stale programs died with their context.
    assert_eq!(d.stats().objects_deleted, before.objects_deleted);
}

#[test]
fn purposes_are_cached_independently() {
    let mut d = HeadlessDriver::default();
    let ctx = d.context();
    let mut cache = ShaderProgramCache::new();
    let handles: Vec<_> = DrawPurpose::ALL
        .iter()
        .map(|&p| cache.get(&mut d, p, ctx))
        .collect();
    assert!(handles.iter().all(|h| h.is_valid()));
    assert_ne!(handles[0], handles[1]);
    assert_ne!(handles[1], handles[2]);
    assert_eq!(cache.stats().builds, 3);
}

#[test]
fn locations_are_resolved_per_purpose() {
    let mut d = HeadlessDriver::default();
    let ctx = d.context();
    let mut cache = ShaderProgramCache::new();

    let tex = cache.entry(&mut d, DrawPurpose::TextureRect, ctx);
    assert_eq!(tex.vertex_loc(), Some(0));
    assert_eq!(tex.texcoord_loc(), Some(1));
    assert!(tex.sampler_loc().is_some());
    assert!(tex.color_loc().is_none());

    let flat = cache.entry(&mut d, DrawPurpose::FlatColor, ctx);
    assert_eq!(flat.vertex_loc(), Some(0));
    assert!(flat.texcoord_loc().is_none());
    assert!(flat.color_loc().is_some());
}

#[test]
fn compile_failure_yields_invalid_handle_until_context_changes() {
    let mut d = HeadlessDriver::default();
    let ctx = d.context();
    d.set_fail_shader_compile(true);
    let mut cache = ShaderProgramCache::new();

    let h = cache.get(&mut d, DrawPurpose::Texture2d, ctx);
    assert!(!h.is_valid());
    assert!(matches!(
        cache.failure(DrawPurpose::Texture2d),
        Some(CompositeError::ShaderCompile {
            stage: ShaderStage::Vertex,
            ..
        })
    ));
    assert_eq!(cache.stats().compile_failures, 1);
    assert_eq!(d.live_objects(), 0);

    // Same context: no retry.
    d.set_fail_shader_compile(false);
    assert!(!cache.get(&mut d, DrawPurpose::Texture2d, ctx).is_valid());
    assert_eq!(d.stats().shader_compiles, 1);

    let ctx = d.recreate_context();
    assert!(cache.get(&mut d, DrawPurpose::Texture2d, ctx).is_valid());
    assert!(cache.failure(DrawPurpose::Texture2d).is_none());
}

#[test]
fn link_failure_is_recorded_and_cleaned_up() {
    let mut d = HeadlessDriver::default();
    let ctx = d.context();
    d.set_fail_program_link(true);
    let mut cache = ShaderProgramCache::new();

    assert!(!cache.get(&mut d, DrawPurpose::FlatColor, ctx).is_valid());
    let err = cache.failure(DrawPurpose::FlatColor).unwrap();
    assert!(err.to_string().starts_with("shader link error"));
    assert_eq!(cache.stats().link_failures, 1);
    assert_eq!(d.live_objects(), 0);
}

#[test]
fn release_deletes_only_owned_programs() {
    let mut d = HeadlessDriver::default();
    let ctx = d.context();
    let mut cache = ShaderProgramCache::new();
    cache.get(&mut d, DrawPurpose::Texture2d, ctx);
    cache.get(&mut d, DrawPurpose::FlatColor, ctx);
    assert_eq!(d.live_objects(), 6);

    cache.release(&mut d, ctx);
    assert_eq!(d.live_objects(), 0);
    assert_eq!(d.stats().objects_deleted, 6);

    cache.get(&mut d, DrawPurpose::Texture2d, ctx);
    let other = ContextHandle::fresh();
    let deleted = d.stats().objects_deleted;
    cache.release(&mut d, other);
    assert_eq!(d.stats().objects_deleted, deleted);
    // Forgotten all the same.
    cache.get(&mut d, DrawPurpose::Texture2d, ctx);
    assert_eq!(cache.stats().builds, 4);
}
