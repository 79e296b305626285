use super::*;

#[test]
fn sentinel_equals_everything() {
    let a = ContextHandle::live(7);
    let b = ContextHandle::fresh();
    let s = ContextHandle::Uninitialized;
    assert_eq!(s, a);
    assert_eq!(a, s);
    assert_eq!(s, b);
    assert_eq!(s, ContextHandle::Uninitialized);
}

#[test]
fn live_handles_compare_by_identifier() {
    let a = ContextHandle::live(3);
    assert_eq!(a, a);
    assert_eq!(a, ContextHandle::live(3));
    assert_ne!(a, ContextHandle::live(4));
}

#[test]
fn zero_is_the_sentinel() {
    assert!(!ContextHandle::live(0).is_live());
    assert_eq!(ContextHandle::live(0).id(), None);
    assert_eq!(ContextHandle::live(9).id(), Some(9));
}

#[test]
fn fresh_handles_are_distinct_and_live() {
    let a = ContextHandle::fresh();
    let b = ContextHandle::fresh();
    assert!(a.is_live() && b.is_live());
    assert_ne!(a, b);
}

#[test]
fn same_live_excludes_the_wildcard() {
    let a = ContextHandle::live(5);
    assert!(a.same_live(a));
    assert!(!a.same_live(ContextHandle::Uninitialized));
    assert!(!ContextHandle::Uninitialized.same_live(ContextHandle::Uninitialized));
}
