//! Unit tests for software_driver.rs

use super::*;

fn driver_with_buffer(driver: SoftwareGles, size: usize) -> (SoftwareGles, BufferName) {
    let name = driver.gen_buffer();
    driver.bind_buffer(BindTarget::Array, name);
    driver.buffer_data(BindTarget::Array, size, None, GlUsage::DynamicDraw);
    (driver, name)
}

fn fill(driver: &SoftwareGles, data: &[u8]) {
    driver.buffer_data(BindTarget::Array, data.len(), Some(data), GlUsage::DynamicDraw);
}

// ============================================================================
// NAMES AND BINDINGS
// ============================================================================

#[test]
fn test_names_are_unique_and_non_zero() {
    let driver = SoftwareGles::gles3();
    let a = driver.gen_buffer();
    let b = driver.gen_buffer();

    assert!(a.is_valid());
    assert_ne!(a, b);
    assert_eq!(driver.buffer_count(), 2);
}

#[test]
fn test_out_of_names() {
    let driver = SoftwareGles::gles3();
    driver.set_out_of_names(true);

    assert_eq!(driver.gen_buffer(), BufferName::NONE);
    assert_eq!(driver.buffer_count(), 0);
}

#[test]
fn test_bind_unknown_name_is_invalid_operation() {
    let driver = SoftwareGles::gles3();

    driver.bind_buffer(BindTarget::Array, BufferName(42));

    assert_eq!(driver.get_error(), GlError::InvalidOperation);
    assert_eq!(driver.bound(BindTarget::Array), BufferName::NONE);
}

#[test]
fn test_es3_targets_rejected_on_gles2() {
    let driver = SoftwareGles::gles2();
    let name = driver.gen_buffer();

    driver.bind_buffer(BindTarget::CopyRead, name);

    assert_eq!(driver.get_error(), GlError::InvalidEnum);
    assert_eq!(driver.bound(BindTarget::CopyRead), BufferName::NONE);
}

#[test]
fn test_delete_unbinds_everywhere() {
    let (driver, name) = driver_with_buffer(SoftwareGles::gles3(), 8);
    driver.bind_buffer(BindTarget::CopyWrite, name);

    driver.delete_buffer(name);

    assert!(!driver.is_live(name));
    assert_eq!(driver.bound(BindTarget::Array), BufferName::NONE);
    assert_eq!(driver.bound(BindTarget::CopyWrite), BufferName::NONE);
    // Unknown names are ignored
    driver.delete_buffer(BufferName(99));
    assert_eq!(driver.get_error(), GlError::NoError);
}

// ============================================================================
// ERRORS
// ============================================================================

#[test]
fn test_first_error_is_sticky_until_read() {
    let driver = SoftwareGles::gles3();

    driver.buffer_sub_data(BindTarget::Array, 0, &[1]);
    driver.bind_buffer(BindTarget::Array, BufferName(7));
    driver.buffer_data(BindTarget::Array, 4, Some(&[1, 2]), GlUsage::StaticDraw);

    assert_eq!(driver.peek_error(), GlError::InvalidOperation);
    assert_eq!(driver.get_error(), GlError::InvalidOperation);
    assert_eq!(driver.get_error(), GlError::NoError);
}

#[test]
fn test_out_of_memory_keeps_previous_storage() {
    let (driver, name) = driver_with_buffer(SoftwareGles::gles3(), 4);
    fill(&driver, &[1, 2, 3, 4]);
    driver.set_out_of_memory(true);

    driver.buffer_data(BindTarget::Array, 1024, None, GlUsage::DynamicDraw);

    assert_eq!(driver.get_error(), GlError::OutOfMemory);
    assert_eq!(driver.buffer_contents(name), Some(vec![1, 2, 3, 4]));
}

// ============================================================================
// DATA
// ============================================================================

#[test]
fn test_buffer_data_without_source_is_undefined() {
    let (driver, name) = driver_with_buffer(SoftwareGles::gles3(), 4);

    assert_eq!(driver.buffer_contents(name), Some(vec![UNDEFINED_BYTE; 4]));
    assert_eq!(driver.usage_hint(name), Some(GlUsage::DynamicDraw));
}

#[test]
fn test_buffer_sub_data_range_checked() {
    let (driver, name) = driver_with_buffer(SoftwareGles::gles3(), 4);

    driver.buffer_sub_data(BindTarget::Array, 3, &[9, 9]);
    assert_eq!(driver.get_error(), GlError::InvalidValue);

    driver.buffer_sub_data(BindTarget::Array, 2, &[9, 9]);
    assert_eq!(driver.get_error(), GlError::NoError);
    assert_eq!(&driver.buffer_contents(name).unwrap()[2..], &[9, 9]);
}

#[test]
fn test_label_requires_extension() {
    let gles2 = SoftwareGles::gles2();
    let name = gles2.gen_buffer();
    gles2.label_buffer(name, "Buffer #1");
    assert_eq!(gles2.get_error(), GlError::InvalidOperation);
    assert_eq!(gles2.label(name), None);

    let gles3 = SoftwareGles::gles3();
    let name = gles3.gen_buffer();
    gles3.label_buffer(name, "Buffer #1");
    assert_eq!(gles3.label(name), Some("Buffer #1".to_string()));
}

// ============================================================================
// MAPPING
// ============================================================================

#[test]
fn test_range_mapping_gated_by_version_or_extension() {
    let (gles2, _) = driver_with_buffer(SoftwareGles::gles2(), 4);
    assert!(gles2.map_buffer_range(BindTarget::Array, 0, 4, MapAccess::READ).is_null());
    assert_eq!(gles2.get_error(), GlError::InvalidOperation);

    let ext = SoftwareGles::new(GlesVersion::ES_2_0, &[EXT_MAP_BUFFER_RANGE]);
    let (ext, _) = driver_with_buffer(ext, 4);
    assert!(!ext.map_buffer_range(BindTarget::Array, 0, 4, MapAccess::READ).is_null());
    assert!(ext.unmap_buffer(BindTarget::Array));
}

#[test]
fn test_invalid_access_combinations() {
    let (driver, _) = driver_with_buffer(SoftwareGles::gles3(), 8);

    for access in [
        MapAccess::empty(),
        MapAccess::READ | MapAccess::INVALIDATE_RANGE,
        MapAccess::READ | MapAccess::FLUSH_EXPLICIT,
    ] {
        assert!(driver.map_buffer_range(BindTarget::Array, 0, 8, access).is_null());
        assert_eq!(driver.get_error(), GlError::InvalidOperation);
    }
    assert!(driver.map_buffer_range(BindTarget::Array, 4, 8, MapAccess::READ).is_null());
    assert_eq!(driver.get_error(), GlError::InvalidValue);
}

#[test]
fn test_double_map_rejected() {
    let (driver, name) = driver_with_buffer(SoftwareGles::gles3(), 8);

    assert!(!driver.map_buffer_range(BindTarget::Array, 0, 4, MapAccess::READ).is_null());
    assert!(driver.map_buffer_range(BindTarget::Array, 4, 4, MapAccess::READ).is_null());
    assert_eq!(driver.get_error(), GlError::InvalidOperation);
    assert!(driver.is_mapped(name));
    assert!(driver.unmap_buffer(BindTarget::Array));
    assert!(!driver.is_mapped(name));
}

#[test]
fn test_explicit_flush_writes_only_flushed_bytes() {
    let (driver, name) = driver_with_buffer(SoftwareGles::gles3(), 8);
    fill(&driver, &[0; 8]);

    let ptr = driver.map_buffer_range(BindTarget::Array, 2, 4, MapAccess::WRITE | MapAccess::FLUSH_EXPLICIT);
    unsafe { std::ptr::write_bytes(ptr, 5, 4) };
    driver.flush_mapped_buffer_range(BindTarget::Array, 1, 2);
    assert!(driver.unmap_buffer(BindTarget::Array));

    assert_eq!(driver.buffer_contents(name), Some(vec![0, 0, 0, 5, 5, 0, 0, 0]));
}

#[test]
fn test_flush_requires_explicit_flush_mapping() {
    let (driver, _) = driver_with_buffer(SoftwareGles::gles3(), 8);

    driver.map_buffer_range(BindTarget::Array, 0, 8, MapAccess::READ | MapAccess::WRITE);
    driver.flush_mapped_buffer_range(BindTarget::Array, 0, 8);

    assert_eq!(driver.get_error(), GlError::InvalidOperation);
    assert!(driver.unmap_buffer(BindTarget::Array));
}

#[test]
fn test_read_mapping_discards_writes() {
    let (driver, name) = driver_with_buffer(SoftwareGles::gles3(), 4);
    fill(&driver, &[1, 2, 3, 4]);

    let ptr = driver.map_buffer_range(BindTarget::Array, 0, 4, MapAccess::READ);
    assert_eq!(unsafe { std::slice::from_raw_parts(ptr, 4) }, &[1, 2, 3, 4]);
    unsafe { std::ptr::write_bytes(ptr, 0, 4) };
    assert!(driver.unmap_buffer(BindTarget::Array));

    assert_eq!(driver.buffer_contents(name), Some(vec![1, 2, 3, 4]));
}

#[test]
fn test_invalidate_buffer_drops_everything() {
    let (driver, name) = driver_with_buffer(SoftwareGles::gles3(), 4);
    fill(&driver, &[1, 2, 3, 4]);

    driver.map_buffer_range(BindTarget::Array, 0, 2, MapAccess::WRITE | MapAccess::INVALIDATE_BUFFER);
    assert!(driver.unmap_buffer(BindTarget::Array));

    assert_eq!(driver.buffer_contents(name), Some(vec![UNDEFINED_BYTE; 4]));
}

#[test]
fn test_oes_mapping_covers_whole_buffer() {
    let driver = SoftwareGles::new(GlesVersion::ES_2_0, &[OES_MAPBUFFER]);
    let (driver, name) = driver_with_buffer(driver, 4);
    fill(&driver, &[1, 2, 3, 4]);

    let ptr = driver.map_buffer_oes(BindTarget::Array, LegacyMapAccess::WriteOnly);
    unsafe { *ptr.add(3) = 9 };
    assert!(driver.unmap_buffer(BindTarget::Array));

    assert_eq!(driver.buffer_contents(name), Some(vec![1, 2, 3, 9]));
}

#[test]
fn test_context_loss_corrupts_next_unmap_only() {
    let (driver, name) = driver_with_buffer(SoftwareGles::gles3(), 4);
    fill(&driver, &[1, 2, 3, 4]);
    driver.simulate_context_loss();

    driver.map_buffer_range(BindTarget::Array, 0, 4, MapAccess::READ);
    assert!(!driver.unmap_buffer(BindTarget::Array));
    assert_eq!(driver.buffer_contents(name), Some(vec![UNDEFINED_BYTE; 4]));

    driver.map_buffer_range(BindTarget::Array, 0, 4, MapAccess::READ);
    assert!(driver.unmap_buffer(BindTarget::Array));
}

#[test]
fn test_unmap_without_mapping() {
    let (driver, _) = driver_with_buffer(SoftwareGles::gles3(), 4);

    assert!(!driver.unmap_buffer(BindTarget::Array));
    assert_eq!(driver.get_error(), GlError::InvalidOperation);
}

// ============================================================================
// COPY
// ============================================================================

#[test]
fn test_copy_between_bound_buffers() {
    let driver = SoftwareGles::gles3();
    let src = driver.gen_buffer();
    let dst = driver.gen_buffer();
    driver.bind_buffer(BindTarget::CopyRead, src);
    driver.buffer_data(BindTarget::CopyRead, 4, Some(&[1, 2, 3, 4]), GlUsage::StaticDraw);
    driver.bind_buffer(BindTarget::CopyWrite, dst);
    driver.buffer_data(BindTarget::CopyWrite, 4, Some(&[0; 4]), GlUsage::StaticDraw);

    driver.copy_buffer_sub_data(BindTarget::CopyRead, BindTarget::CopyWrite, 1, 0, 3);

    assert_eq!(driver.get_error(), GlError::NoError);
    assert_eq!(driver.buffer_contents(dst), Some(vec![2, 3, 4, 0]));
}

#[test]
fn test_copy_rejects_overlap_in_same_buffer() {
    let (driver, name) = driver_with_buffer(SoftwareGles::gles3(), 8);
    driver.bind_buffer(BindTarget::CopyRead, name);
    driver.bind_buffer(BindTarget::CopyWrite, name);

    driver.copy_buffer_sub_data(BindTarget::CopyRead, BindTarget::CopyWrite, 0, 2, 4);
    assert_eq!(driver.get_error(), GlError::InvalidValue);

    driver.copy_buffer_sub_data(BindTarget::CopyRead, BindTarget::CopyWrite, 0, 4, 4);
    assert_eq!(driver.get_error(), GlError::NoError);
}

#[test]
fn test_copy_requires_es3() {
    let driver = SoftwareGles::new(GlesVersion::ES_2_0, &[EXT_MAP_BUFFER_RANGE]);

    driver.copy_buffer_sub_data(BindTarget::CopyRead, BindTarget::CopyWrite, 0, 0, 4);

    assert_eq!(driver.get_error(), GlError::InvalidOperation);
}

// ============================================================================
// CALL LOG
// ============================================================================

#[test]
fn test_call_log() {
    let (driver, name) = driver_with_buffer(SoftwareGles::gles3(), 4);

    assert_eq!(driver.calls(), vec![
        format!("gen_buffer() -> {}", name.0),
        format!("bind_buffer(Array, {})", name.0),
        "buffer_data(Array, 4, null, DynamicDraw)".to_string(),
    ]);
    assert_eq!(driver.call_count("bind_buffer"), 1);
    assert_eq!(driver.call_count("bind"), 0);

    driver.clear_calls();
    driver.get_error();
    assert!(driver.calls().is_empty());
}
