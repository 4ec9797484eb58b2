//! # vtmem-utils
//!
//! Shared utilities for the vtmem workspace: byte-offset and handle newtypes,
//! alignment helpers, and raw atomic memory access used by the heap.
use std::mem::align_of;

pub mod atomic;
pub mod newtypes;
pub mod sync;

pub use newtypes::{ByteOffset, FieldIndex, HandleId, TypeId};

pub const fn align_up(value: usize, align: usize) -> usize {
    if align <= 1 {
        return value;
    }
    let misalignment = value % align;
    if misalignment == 0 {
        value
    } else {
        value + align - misalignment
    }
}

pub fn is_ptr_aligned_to_field(ptr: *const u8, field_size: usize) -> bool {
    match field_size {
        0 | 1 => true,
        2 => (ptr as usize) % align_of::<u16>() == 0,
        4 => (ptr as usize) % align_of::<u32>() == 0,
        8 => (ptr as usize) % align_of::<u64>() == 0,
        _ => (ptr as usize) % field_size == 0,
    }
}

/// Whether a payload of `size` bytes at `ptr` can be moved with a single
/// hardware atomic instruction.
pub fn is_native_atomic(ptr: *const u8, size: usize) -> bool {
    matches!(size, 1 | 2 | 4 | 8) && is_ptr_aligned_to_field(ptr, size)
}

#[cfg(feature = "memory-validation")]
pub fn validate_alignment(ptr: *const u8, align: usize) {
    if (ptr as usize) % align != 0 {
        panic!(
            "Alignment violation: pointer {:p} is not aligned to {}",
            ptr, align
        );
    }
}

#[cfg(not(feature = "memory-validation"))]
#[inline(always)]
pub fn validate_alignment(_ptr: *const u8, _align: usize) {}
