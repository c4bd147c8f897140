//! Unit tests for gles_state_cache.rs

use super::*;
use crate::software_driver::SoftwareGles;

fn setup() -> (Rc<SoftwareGles>, StateCacheManager) {
    let driver = Rc::new(SoftwareGles::gles3());
    let cache = StateCacheManager::new(driver.clone());
    (driver, cache)
}

fn gen(driver: &SoftwareGles) -> BufferName {
    driver.gen_buffer()
}

// ============================================================================
// BIND
// ============================================================================

#[test]
fn test_first_bind_reaches_driver() {
    let (driver, mut cache) = setup();
    let name = gen(&driver);
    driver.clear_calls();

    cache.bind_buffer(BindTarget::Array, name);

    assert_eq!(driver.calls(), vec![format!("bind_buffer(Array, {})", name.0)]);
    assert_eq!(driver.bound(BindTarget::Array), name);
    assert_eq!(cache.bound_buffer(BindTarget::Array), Some(name));
}

#[test]
fn test_repeated_bind_is_skipped() {
    let (driver, mut cache) = setup();
    let name = gen(&driver);
    driver.clear_calls();

    cache.bind_buffer(BindTarget::Array, name);
    cache.bind_buffer(BindTarget::Array, name);
    cache.bind_buffer(BindTarget::Array, name);

    assert_eq!(driver.call_count("bind_buffer"), 1);
    assert_eq!(cache.skipped_binds(), 2);
}

#[test]
fn test_targets_are_tracked_separately() {
    let (driver, mut cache) = setup();
    let a = gen(&driver);
    let b = gen(&driver);
    driver.clear_calls();

    cache.bind_buffer(BindTarget::Array, a);
    cache.bind_buffer(BindTarget::ElementArray, a);
    cache.bind_buffer(BindTarget::Array, b);
    cache.bind_buffer(BindTarget::ElementArray, a);

    assert_eq!(driver.call_count("bind_buffer"), 3);
    assert_eq!(cache.bound_buffer(BindTarget::Array), Some(b));
    assert_eq!(cache.bound_buffer(BindTarget::ElementArray), Some(a));
}

#[test]
fn test_unbind_is_recorded_but_not_reported() {
    let (driver, mut cache) = setup();
    let name = gen(&driver);

    cache.bind_buffer(BindTarget::CopyRead, name);
    cache.bind_buffer(BindTarget::CopyRead, BufferName::NONE);

    assert_eq!(cache.bound_buffer(BindTarget::CopyRead), None);
    assert_eq!(driver.bound(BindTarget::CopyRead), BufferName::NONE);
}

#[test]
fn test_invalidate_forces_rebind() {
    let (driver, mut cache) = setup();
    let name = gen(&driver);

    cache.bind_buffer(BindTarget::Array, name);
    cache.invalidate();
    driver.clear_calls();
    cache.bind_buffer(BindTarget::Array, name);

    assert_eq!(driver.call_count("bind_buffer"), 1);
}

// ============================================================================
// DELETE
// ============================================================================

#[test]
fn test_delete_evicts_every_slot() {
    let (driver, mut cache) = setup();
    let name = gen(&driver);
    let other = gen(&driver);

    cache.bind_buffer(BindTarget::Array, name);
    cache.bind_buffer(BindTarget::CopyWrite, name);
    cache.bind_buffer(BindTarget::ElementArray, other);

    cache.delete_buffer(BindTarget::Array, name);

    assert!(!cache.contains(name));
    assert_eq!(cache.bound_buffer(BindTarget::CopyWrite), None);
    assert_eq!(cache.bound_buffer(BindTarget::ElementArray), Some(other));
    assert!(!driver.is_live(name));
    assert!(driver.is_live(other));
}

#[test]
fn test_bind_after_delete_reaches_driver() {
    let (driver, mut cache) = setup();
    let first = gen(&driver);
    cache.bind_buffer(BindTarget::Array, first);
    cache.delete_buffer(BindTarget::Array, first);

    let second = gen(&driver);
    driver.clear_calls();
    cache.bind_buffer(BindTarget::Array, second);

    assert_eq!(driver.call_count("bind_buffer"), 1);
    assert_eq!(driver.bound(BindTarget::Array), second);
}

#[test]
fn test_delete_of_no_buffer_is_ignored() {
    let (driver, mut cache) = setup();
    driver.clear_calls();

    cache.delete_buffer(BindTarget::Array, BufferName::NONE);

    assert!(driver.calls().is_empty());
}
