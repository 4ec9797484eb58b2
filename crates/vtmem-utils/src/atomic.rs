use crate::{is_native_atomic, sync::Ordering};
use std::{
    ptr,
    sync::atomic::{AtomicU16, AtomicU32, AtomicU64, AtomicU8},
};

#[cfg(feature = "memory-validation")]
use std::{cell::RefCell, collections::HashSet};

#[cfg(feature = "memory-validation")]
thread_local! {
    static ATOMIC_LOCATIONS: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
    static NON_ATOMIC_LOCATIONS: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

#[cfg(feature = "memory-validation")]
pub fn validate_atomic_access(ptr: *const u8, is_atomic: bool) {
    let addr = ptr as usize;
    let (mine, other) = if is_atomic {
        (&ATOMIC_LOCATIONS, &NON_ATOMIC_LOCATIONS)
    } else {
        (&NON_ATOMIC_LOCATIONS, &ATOMIC_LOCATIONS)
    };
    other.with(|locations| {
        if locations.borrow().contains(&addr) {
            tracing::warn!(
                "Mixed atomic and non-atomic access to the same location detected: {:#x}",
                addr
            );
        }
    });
    mine.with(|locations| {
        locations.borrow_mut().insert(addr);
    });
}

#[cfg(feature = "memory-validation")]
fn validate_ordering(ordering: Ordering, is_load: bool) {
    match (is_load, ordering) {
        (true, Ordering::Release) | (true, Ordering::AcqRel) => {
            panic!("Invalid load ordering: {:?}", ordering);
        }
        (false, Ordering::Acquire) | (false, Ordering::AcqRel) => {
            panic!("Invalid store ordering: {:?}", ordering);
        }
        _ => {}
    }
}

#[cfg(not(feature = "memory-validation"))]
#[inline(always)]
pub fn validate_atomic_access(_ptr: *const u8, _is_atomic: bool) {}

#[cfg(not(feature = "memory-validation"))]
#[inline(always)]
fn validate_ordering(_ordering: Ordering, _is_load: bool) {}

/// Unified atomic memory access operations.
///
/// Every operation works on a raw location of 1, 2, 4 or 8 bytes and moves
/// the value through a `u64`, regardless of the underlying width.
pub trait AtomicAccess {
    /// Atomically load a value of the specified size from the pointer.
    ///
    /// # Safety
    /// - `ptr` must be valid and aligned for the operation
    /// - The pointed memory must be valid for reads
    unsafe fn load_atomic(ptr: *const u8, size: usize, ordering: Ordering) -> u64;

    /// Atomically store a value of the specified size to the pointer.
    ///
    /// # Safety
    /// - `ptr` must be valid and aligned for the operation
    /// - The pointed memory must be valid for writes
    unsafe fn store_atomic(ptr: *mut u8, size: usize, value: u64, ordering: Ordering);

    /// Atomically compare and exchange a value of the specified size.
    ///
    /// # Safety
    /// - `ptr` must be valid and aligned for the operation
    /// - The pointed memory must be valid for reads and writes
    unsafe fn compare_exchange_atomic(
        ptr: *mut u8,
        size: usize,
        expected: u64,
        new: u64,
        success: Ordering,
        failure: Ordering,
    ) -> Result<u64, u64>;

    /// Atomically exchange a value of the specified size.
    ///
    /// # Safety
    /// - `ptr` must be valid and aligned for the operation
    /// - The pointed memory must be valid for reads and writes
    unsafe fn exchange_atomic(ptr: *mut u8, size: usize, new: u64, ordering: Ordering) -> u64;
}

/// Concrete implementation using `AtomicT::from_ptr`
pub struct StandardAtomicAccess;

impl AtomicAccess for StandardAtomicAccess {
    unsafe fn load_atomic(ptr: *const u8, size: usize, ordering: Ordering) -> u64 {
        validate_atomic_access(ptr, true);
        validate_ordering(ordering, true);
        match size {
            1 => unsafe { AtomicU8::from_ptr(ptr as *mut u8) }.load(ordering) as u64,
            2 => unsafe { AtomicU16::from_ptr(ptr as *mut u16) }.load(ordering) as u64,
            4 => unsafe { AtomicU32::from_ptr(ptr as *mut u32) }.load(ordering) as u64,
            8 => unsafe { AtomicU64::from_ptr(ptr as *mut u64) }.load(ordering),
            _ => panic!("Unsupported atomic size: {}", size),
        }
    }

    unsafe fn store_atomic(ptr: *mut u8, size: usize, value: u64, ordering: Ordering) {
        validate_atomic_access(ptr as *const u8, true);
        validate_ordering(ordering, false);
        match size {
            1 => unsafe { AtomicU8::from_ptr(ptr) }.store(value as u8, ordering),
            2 => unsafe { AtomicU16::from_ptr(ptr as *mut u16) }.store(value as u16, ordering),
            4 => unsafe { AtomicU32::from_ptr(ptr as *mut u32) }.store(value as u32, ordering),
            8 => unsafe { AtomicU64::from_ptr(ptr as *mut u64) }.store(value, ordering),
            _ => panic!("Unsupported atomic size: {}", size),
        }
    }

    unsafe fn compare_exchange_atomic(
        ptr: *mut u8,
        size: usize,
        expected: u64,
        new: u64,
        success: Ordering,
        failure: Ordering,
    ) -> Result<u64, u64> {
        validate_atomic_access(ptr as *const u8, true);
        match size {
            1 => unsafe { AtomicU8::from_ptr(ptr) }
                .compare_exchange(expected as u8, new as u8, success, failure)
                .map(|x| x as u64)
                .map_err(|x| x as u64),
            2 => unsafe { AtomicU16::from_ptr(ptr as *mut u16) }
                .compare_exchange(expected as u16, new as u16, success, failure)
                .map(|x| x as u64)
                .map_err(|x| x as u64),
            4 => unsafe { AtomicU32::from_ptr(ptr as *mut u32) }
                .compare_exchange(expected as u32, new as u32, success, failure)
                .map(|x| x as u64)
                .map_err(|x| x as u64),
            8 => unsafe { AtomicU64::from_ptr(ptr as *mut u64) }
                .compare_exchange(expected, new, success, failure),
            _ => panic!("Unsupported atomic size: {}", size),
        }
    }

    unsafe fn exchange_atomic(ptr: *mut u8, size: usize, new: u64, ordering: Ordering) -> u64 {
        validate_atomic_access(ptr as *const u8, true);
        match size {
            1 => unsafe { AtomicU8::from_ptr(ptr) }.swap(new as u8, ordering) as u64,
            2 => unsafe { AtomicU16::from_ptr(ptr as *mut u16) }.swap(new as u16, ordering) as u64,
            4 => unsafe { AtomicU32::from_ptr(ptr as *mut u32) }.swap(new as u32, ordering) as u64,
            8 => unsafe { AtomicU64::from_ptr(ptr as *mut u64) }.swap(new, ordering),
            _ => panic!("Unsupported atomic size: {}", size),
        }
    }
}

/// Packs up to 8 native-endian bytes into the `u64` carrier used by [`AtomicAccess`].
pub fn pack_bytes(bytes: &[u8]) -> u64 {
    match bytes.len() {
        1 => bytes[0] as u64,
        2 => u16::from_ne_bytes([bytes[0], bytes[1]]) as u64,
        4 => u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64,
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            u64::from_ne_bytes(buf)
        }
        n => panic!("Unsupported atomic size: {}", n),
    }
}

/// Inverse of [`pack_bytes`].
pub fn unpack_bytes(value: u64, size: usize) -> Vec<u8> {
    match size {
        1 => vec![value as u8],
        2 => (value as u16).to_ne_bytes().to_vec(),
        4 => (value as u32).to_ne_bytes().to_vec(),
        8 => value.to_ne_bytes().to_vec(),
        n => panic!("Unsupported atomic size: {}", n),
    }
}

pub struct Atomic;

impl Atomic {
    /// # Safety
    /// Caller must ensure `ptr` is valid for `size` bytes and that no other
    /// thread is writing a non-native-sized payload at the same location.
    pub unsafe fn load_field(ptr: *const u8, size: usize, ordering: Ordering) -> Vec<u8> {
        if is_native_atomic(ptr, size) {
            let val = unsafe { StandardAtomicAccess::load_atomic(ptr, size, ordering) };
            unpack_bytes(val, size)
        } else {
            validate_atomic_access(ptr, false);
            let mut buf = vec![0u8; size];
            if size > 0 {
                unsafe { ptr::copy_nonoverlapping(ptr, buf.as_mut_ptr(), size) };
            }
            buf
        }
    }

    /// # Safety
    /// Caller must ensure `ptr` is valid for `value.len()` bytes and that no
    /// other thread is accessing a non-native-sized payload at the same location.
    pub unsafe fn store_field(ptr: *mut u8, value: &[u8], ordering: Ordering) {
        let size = value.len();
        if is_native_atomic(ptr, size) {
            unsafe { StandardAtomicAccess::store_atomic(ptr, size, pack_bytes(value), ordering) };
        } else {
            validate_atomic_access(ptr as *const u8, false);
            if size > 0 {
                unsafe { ptr::copy_nonoverlapping(value.as_ptr(), ptr, size) };
            }
        }
    }

    /// Byte-wise compare-and-exchange. Returns the bytes that were in memory,
    /// `Ok` when they matched `expected` and `new` was written.
    ///
    /// Only native sizes go through a single hardware instruction; for any other
    /// size the caller must hold exclusive access to the location.
    ///
    /// # Safety
    /// Caller must ensure `ptr` is valid for `expected.len()` bytes and that
    /// `expected` and `new` have the same length.
    pub unsafe fn compare_exchange_field(
        ptr: *mut u8,
        expected: &[u8],
        new: &[u8],
    ) -> Result<Vec<u8>, Vec<u8>> {
        debug_assert_eq!(expected.len(), new.len());
        let size = expected.len();
        if is_native_atomic(ptr as *const u8, size) {
            unsafe {
                StandardAtomicAccess::compare_exchange_atomic(
                    ptr,
                    size,
                    pack_bytes(expected),
                    pack_bytes(new),
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
            }
            .map(|prev| unpack_bytes(prev, size))
            .map_err(|cur| unpack_bytes(cur, size))
        } else {
            let current = unsafe { Self::load_field(ptr, size, Ordering::SeqCst) };
            if current == expected {
                unsafe { Self::store_field(ptr, new, Ordering::SeqCst) };
                Ok(current)
            } else {
                Err(current)
            }
        }
    }

    /// Byte-wise exchange with the same locking contract as
    /// [`Atomic::compare_exchange_field`].
    ///
    /// # Safety
    /// Caller must ensure `ptr` is valid for `new.len()` bytes.
    pub unsafe fn exchange_field(ptr: *mut u8, new: &[u8]) -> Vec<u8> {
        let size = new.len();
        if is_native_atomic(ptr as *const u8, size) {
            let prev = unsafe {
                StandardAtomicAccess::exchange_atomic(ptr, size, pack_bytes(new), Ordering::SeqCst)
            };
            unpack_bytes(prev, size)
        } else {
            let current = unsafe { Self::load_field(ptr, size, Ordering::SeqCst) };
            unsafe { Self::store_field(ptr, new, Ordering::SeqCst) };
            current
        }
    }
}
