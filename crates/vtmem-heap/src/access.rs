use crate::{error::AccessError, object::HeapObject};
use vtmem_utils::{
    atomic::{Atomic, AtomicAccess, StandardAtomicAccess},
    is_native_atomic,
    sync::Ordering,
    ByteOffset,
};

/// Bounds-checked access to the bytes of one heap object.
///
/// Locations of 1, 2, 4 or 8 aligned bytes are accessed with a single atomic
/// instruction while holding the object lock shared. Any other size holds the
/// lock exclusively for the whole operation, so a compare and its write can
/// never be split.
pub struct RawMemoryAccess<'a> {
    object: &'a HeapObject,
}

impl<'a> RawMemoryAccess<'a> {
    pub fn new(object: &'a HeapObject) -> Self {
        Self { object }
    }

    fn check_bounds(&self, offset: ByteOffset, size: usize) -> Result<*mut u8, AccessError> {
        let end = offset.as_usize().checked_add(size);
        match end {
            Some(end) if end <= self.object.size() => {
                // SAFETY: `offset + size` lies within the object's storage.
                Ok(unsafe { self.object.base_ptr().add(offset.as_usize()) })
            }
            _ => Err(AccessError::InvalidArgument(format!(
                "access of {} bytes at offset {} is out of bounds for {} of size {}",
                size,
                offset,
                self.object.type_descriptor().name,
                self.object.size()
            ))),
        }
    }

    fn with_lock<T>(&self, ptr: *const u8, size: usize, op: impl FnOnce() -> T) -> T {
        if is_native_atomic(ptr, size) {
            let _guard = self.object.lock().read();
            op()
        } else {
            let _guard = self.object.lock().write();
            op()
        }
    }

    pub fn read_bytes(&self, offset: ByteOffset, size: usize) -> Result<Vec<u8>, AccessError> {
        let ptr = self.check_bounds(offset, size)?;
        if size == 0 {
            return Ok(vec![]);
        }
        // SAFETY: bounds checked above, and the lock protocol excludes torn reads.
        Ok(self.with_lock(ptr, size, || unsafe {
            Atomic::load_field(ptr, size, Ordering::Acquire)
        }))
    }

    pub fn write_bytes(&self, offset: ByteOffset, data: &[u8]) -> Result<(), AccessError> {
        let ptr = self.check_bounds(offset, data.len())?;
        if data.is_empty() {
            return Ok(());
        }
        self.with_lock(ptr, data.len(), || unsafe {
            Atomic::store_field(ptr, data, Ordering::Release)
        });
        Ok(())
    }

    /// Returns `Ok(previous)` when `expected` matched and `new` was written,
    /// `Err(current)` otherwise.
    pub fn compare_exchange_bytes(
        &self,
        offset: ByteOffset,
        expected: &[u8],
        new: &[u8],
    ) -> Result<Result<Vec<u8>, Vec<u8>>, AccessError> {
        if expected.len() != new.len() {
            return Err(AccessError::invalid(format!(
                "compare-exchange of {} bytes with a {} byte update",
                expected.len(),
                new.len()
            )));
        }
        let ptr = self.check_bounds(offset, new.len())?;
        if new.is_empty() {
            return Ok(Ok(vec![]));
        }
        Ok(self.with_lock(ptr, new.len(), || unsafe {
            Atomic::compare_exchange_field(ptr, expected, new)
        }))
    }

    pub fn exchange_bytes(&self, offset: ByteOffset, new: &[u8]) -> Result<Vec<u8>, AccessError> {
        let ptr = self.check_bounds(offset, new.len())?;
        if new.is_empty() {
            return Ok(vec![]);
        }
        Ok(self.with_lock(ptr, new.len(), || unsafe { Atomic::exchange_field(ptr, new) }))
    }

    fn check_slot(&self, offset: ByteOffset, width: usize) -> Result<*mut u8, AccessError> {
        let ptr = self.check_bounds(offset, width)?;
        if !is_native_atomic(ptr, width) {
            return Err(AccessError::invalid(format!(
                "slot of {} bytes at offset {} is not atomically accessible",
                width, offset
            )));
        }
        Ok(ptr)
    }

    /// Reads a reference or header slot of `width` bytes.
    pub fn read_slot(&self, offset: ByteOffset, width: usize) -> Result<u64, AccessError> {
        let ptr = self.check_slot(offset, width)?;
        let _guard = self.object.lock().read();
        // SAFETY: bounds and alignment checked by check_slot.
        Ok(unsafe { StandardAtomicAccess::load_atomic(ptr, width, Ordering::Acquire) })
    }

    pub fn write_slot(&self, offset: ByteOffset, width: usize, value: u64) -> Result<(), AccessError> {
        let ptr = self.check_slot(offset, width)?;
        let _guard = self.object.lock().read();
        unsafe { StandardAtomicAccess::store_atomic(ptr, width, value, Ordering::Release) };
        Ok(())
    }

    pub fn compare_exchange_slot(
        &self,
        offset: ByteOffset,
        width: usize,
        expected: u64,
        new: u64,
    ) -> Result<Result<u64, u64>, AccessError> {
        let ptr = self.check_slot(offset, width)?;
        let _guard = self.object.lock().read();
        Ok(unsafe {
            StandardAtomicAccess::compare_exchange_atomic(
                ptr,
                width,
                expected,
                new,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
        })
    }

    pub fn exchange_slot(&self, offset: ByteOffset, width: usize, new: u64) -> Result<u64, AccessError> {
        let ptr = self.check_slot(offset, width)?;
        let _guard = self.object.lock().read();
        Ok(unsafe { StandardAtomicAccess::exchange_atomic(ptr, width, new, Ordering::SeqCst) })
    }

    /// The address of `offset` inside the object, for header slots that hold
    /// pointers into the object itself.
    pub fn address_of(&self, offset: ByteOffset) -> Result<u64, AccessError> {
        Ok(self.check_bounds(offset, 0)? as usize as u64)
    }
}
