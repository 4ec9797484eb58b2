use crate::{
    error::AccessError,
    heap::Heap,
    location::{SlotKind, StorageLocation},
    object::ObjectRef,
};
use tracing::{trace, warn};
use vtmem_layout::InstanceLayout;
use vtmem_types::{FieldDescriptor, TypeDescriptor};
use vtmem_utils::{sync::Arc, ByteOffset};

/// What a compare-and-swap reports back.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CasShape {
    /// Only whether the swap happened.
    Boolean,
    /// The value seen at the location, as a boxed copy for flattened slots.
    PreviousValue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CasOutcome {
    pub succeeded: bool,
    /// Null under [`CasShape::Boolean`].
    pub previous: ObjectRef,
}

/// Offset-based access to object fields and array elements, including
/// atomic compare-and-swap and exchange on flattened payloads.
///
/// A flattened location needs a concrete `ty` to interpret its bytes and
/// checks it strictly. For a boxed location `ty` is advisory.
#[derive(Copy, Clone)]
pub struct UnsafeAccess<'a> {
    heap: &'a Heap,
}

impl<'a> UnsafeAccess<'a> {
    pub fn new(heap: &'a Heap) -> Self {
        Self { heap }
    }

    pub fn heap(&self) -> &'a Heap {
        self.heap
    }

    pub fn is_flattened(&self, field: Option<&FieldDescriptor>) -> Result<bool, AccessError> {
        Ok(self.heap.engine().is_flattened(field)?)
    }

    pub fn is_flattened_array(&self, ty: Option<&TypeDescriptor>) -> bool {
        self.heap.engine().is_flattened_array(ty)
    }

    pub fn value_header_size(&self, ty: Option<&TypeDescriptor>) -> Result<usize, AccessError> {
        Ok(self.heap.engine().value_header_size(ty)?)
    }

    pub fn object_field_offset(
        &self,
        ty: &TypeDescriptor,
        name: &str,
    ) -> Result<ByteOffset, AccessError> {
        Ok(self.heap.engine().object_field_offset(ty, name)?)
    }

    pub fn array_base_offset(&self, ty: Option<&TypeDescriptor>) -> Result<ByteOffset, AccessError> {
        Ok(self.heap.engine().array_base_offset(ty)?)
    }

    /// Distance in bytes between consecutive elements of array type `ty`.
    pub fn array_index_scale(&self, ty: &TypeDescriptor) -> Result<usize, AccessError> {
        Ok(self.heap.engine().array_layout(ty)?.stride)
    }

    pub fn get_object_size(&self, obj: &ObjectRef) -> Result<usize, AccessError> {
        self.heap.get_object_size(obj)
    }

    fn required_type<'t>(
        ty: Option<&'t TypeDescriptor>,
        loc: &StorageLocation,
    ) -> Result<&'t TypeDescriptor, AccessError> {
        ty.ok_or_else(|| {
            AccessError::invalid(format!(
                "a type is required to access flattened offset {} of {}",
                loc.offset,
                loc.object.type_descriptor().name
            ))
        })
    }

    fn non_null<'v>(value: &'v ObjectRef, what: &str) -> Result<&'v ObjectRef, AccessError> {
        if value.is_null() {
            Err(AccessError::invalid(format!(
                "null {} for a flattened location",
                what
            )))
        } else {
            Ok(value)
        }
    }

    fn is_instance(value: &ObjectRef, ty: &TypeDescriptor) -> bool {
        value.type_id() == Some(ty.id)
    }

    fn box_bytes(&self, payload: &InstanceLayout, bytes: &[u8]) -> Result<ObjectRef, AccessError> {
        let ty = self.heap.engine().registry().get(payload.type_id)?;
        self.heap.box_payload(&ty, bytes)
    }

    fn read_flat(&self, loc: &StorageLocation, payload: &InstanceLayout) -> Result<Vec<u8>, AccessError> {
        loc.access().read_bytes(loc.offset, payload.data_size)
    }

    fn read_reference(&self, loc: &StorageLocation, width: usize) -> Result<ObjectRef, AccessError> {
        self.heap
            .object_from_slot(loc.access().read_slot(loc.offset, width)?)
    }

    /// Reads the object at `offset`. A flattened location yields a fresh
    /// boxed copy, or null if `ty` is not its declared type. A boxed location
    /// yields the stored reference, or null if it is not an instance of `ty`.
    pub fn get_value(
        &self,
        container: &ObjectRef,
        offset: ByteOffset,
        ty: Option<&TypeDescriptor>,
    ) -> Result<ObjectRef, AccessError> {
        let loc = StorageLocation::resolve(self.heap, container, offset)?;
        match &loc.kind {
            SlotKind::Flat(payload) => {
                let ty = Self::required_type(ty, &loc)?;
                if ty.id != loc.declared {
                    return Ok(ObjectRef::NULL);
                }
                let bytes = self.read_flat(&loc, payload)?;
                self.box_bytes(payload, &bytes)
            }
            SlotKind::Reference(width) => {
                let current = self.read_reference(&loc, *width)?;
                Ok(match ty {
                    Some(ty) if !Self::is_instance(&current, ty) => ObjectRef::NULL,
                    _ => current,
                })
            }
        }
    }

    /// Stores `value` at `offset`. Writes with the wrong type are silently
    /// dropped.
    pub fn put_value(
        &self,
        container: &ObjectRef,
        offset: ByteOffset,
        ty: Option<&TypeDescriptor>,
        value: &ObjectRef,
    ) -> Result<(), AccessError> {
        let loc = StorageLocation::resolve(self.heap, container, offset)?;
        match &loc.kind {
            SlotKind::Flat(payload) => {
                let ty = Self::required_type(ty, &loc)?;
                let value = Self::non_null(value, "value")?;
                if ty.id != loc.declared || !Self::is_instance(value, ty) {
                    trace!("put of {:?} at {} ignored", value, loc.offset);
                    return Ok(());
                }
                let bytes = self.payload_bytes(value, payload)?;
                loc.access().write_bytes(loc.offset, &bytes)
            }
            SlotKind::Reference(width) => match ty {
                Some(ty) if ty.id == loc.declared && Self::is_instance(value, ty) => {
                    loc.access().write_slot(loc.offset, *width, self.heap.publish(value))
                }
                _ => {
                    trace!("put of {:?} at {} ignored", value, loc.offset);
                    Ok(())
                }
            },
        }
    }

    fn payload_bytes(&self, value: &ObjectRef, payload: &InstanceLayout) -> Result<Vec<u8>, AccessError> {
        let object = self.heap.deref(value, "value")?;
        let bytes = self.heap.payload_of(object)?;
        debug_assert_eq!(bytes.len(), payload.data_size);
        Ok(bytes)
    }

    /// Atomically replaces the value at `offset` with `update` if it currently
    /// equals `expected`: substitutability for flattened locations, identity
    /// for boxed ones. With a null `ty` a boxed location is set
    /// unconditionally.
    pub fn compare_and_swap_value(
        &self,
        container: &ObjectRef,
        offset: ByteOffset,
        ty: Option<&TypeDescriptor>,
        expected: &ObjectRef,
        update: &ObjectRef,
        shape: CasShape,
    ) -> Result<CasOutcome, AccessError> {
        let loc = StorageLocation::resolve(self.heap, container, offset)?;
        match &loc.kind {
            SlotKind::Flat(payload) => {
                self.compare_and_swap_flat(&loc, payload, ty, expected, update, shape)
            }
            SlotKind::Reference(width) => {
                let access = loc.access();
                let (succeeded, previous) = match ty {
                    None => (true, access.exchange_slot(loc.offset, *width, self.heap.publish(update))?),
                    Some(_) => {
                        match access.compare_exchange_slot(
                            loc.offset,
                            *width,
                            expected.to_slot(),
                            self.heap.publish(update),
                        )? {
                            Ok(previous) => (true, previous),
                            Err(current) => (false, current),
                        }
                    }
                };
                let previous = match shape {
                    CasShape::Boolean => ObjectRef::NULL,
                    CasShape::PreviousValue => self.heap.object_from_slot(previous)?,
                };
                Ok(CasOutcome {
                    succeeded,
                    previous,
                })
            }
        }
    }

    fn compare_and_swap_flat(
        &self,
        loc: &StorageLocation,
        payload: &InstanceLayout,
        ty: Option<&TypeDescriptor>,
        expected: &ObjectRef,
        update: &ObjectRef,
        shape: CasShape,
    ) -> Result<CasOutcome, AccessError> {
        let ty = Self::required_type(ty, loc)?;
        // A type mismatch reports a null previous value, since a copy of the
        // current payload could be substitutable for `expected`. A null
        // `expected` gets the current payload instead.
        let rejected = CasOutcome {
            succeeded: false,
            previous: ObjectRef::NULL,
        };
        let mismatched = |current: Vec<u8>| -> Result<CasOutcome, AccessError> {
            let previous = match shape {
                CasShape::Boolean => ObjectRef::NULL,
                CasShape::PreviousValue => self.box_bytes(payload, &current)?,
            };
            Ok(CasOutcome {
                succeeded: false,
                previous,
            })
        };

        if ty.id != loc.declared || !Self::is_instance(expected, ty) {
            if expected.is_null() {
                return mismatched(self.read_flat(loc, payload)?);
            }
            return Ok(rejected);
        }
        let expected = self.payload_bytes(expected, payload)?;
        let current = self.read_flat(loc, payload)?;
        if current != expected {
            return mismatched(current);
        }
        let update = Self::non_null(update, "update")?;
        if !Self::is_instance(update, ty) {
            return Ok(rejected);
        }
        let update = self.payload_bytes(update, payload)?;

        match loc
            .access()
            .compare_exchange_bytes(loc.offset, &expected, &update)?
        {
            Ok(previous) => Ok(CasOutcome {
                succeeded: true,
                previous: match shape {
                    CasShape::Boolean => ObjectRef::NULL,
                    CasShape::PreviousValue => self.box_bytes(payload, &previous)?,
                },
            }),
            Err(current) => mismatched(current),
        }
    }

    pub fn compare_and_set_value(
        &self,
        container: &ObjectRef,
        offset: ByteOffset,
        ty: Option<&TypeDescriptor>,
        expected: &ObjectRef,
        update: &ObjectRef,
    ) -> Result<bool, AccessError> {
        self.compare_and_swap_value(container, offset, ty, expected, update, CasShape::Boolean)
            .map(|outcome| outcome.succeeded)
    }

    /// Like [`compare_and_set_value`](Self::compare_and_set_value), returning
    /// the value seen at the location. The swap happened iff the result is
    /// substitutable for `expected`. On a flattened location a type mismatch
    /// returns null.
    pub fn compare_and_exchange_value(
        &self,
        container: &ObjectRef,
        offset: ByteOffset,
        ty: Option<&TypeDescriptor>,
        expected: &ObjectRef,
        update: &ObjectRef,
    ) -> Result<ObjectRef, AccessError> {
        self.compare_and_swap_value(
            container,
            offset,
            ty,
            expected,
            update,
            CasShape::PreviousValue,
        )
        .map(|outcome| outcome.previous)
    }

    /// Atomically stores `value` and returns what was there before. On a
    /// flattened location with the wrong type nothing is written and the
    /// current value is returned.
    pub fn get_and_set_value(
        &self,
        container: &ObjectRef,
        offset: ByteOffset,
        ty: Option<&TypeDescriptor>,
        value: &ObjectRef,
    ) -> Result<ObjectRef, AccessError> {
        let loc = StorageLocation::resolve(self.heap, container, offset)?;
        match &loc.kind {
            SlotKind::Flat(payload) => {
                let ty = Self::required_type(ty, &loc)?;
                let value = Self::non_null(value, "value")?;
                let previous = if ty.id != loc.declared || !Self::is_instance(value, ty) {
                    self.read_flat(&loc, payload)?
                } else {
                    let bytes = self.payload_bytes(value, payload)?;
                    loc.access().exchange_bytes(loc.offset, &bytes)?
                };
                self.box_bytes(payload, &previous)
            }
            SlotKind::Reference(width) => self.heap.object_from_slot(
                loc.access()
                    .exchange_slot(loc.offset, *width, self.heap.publish(value))?,
            ),
        }
    }

    /// A zero-filled instance of `ty`, for an initialized value type that has
    /// an implicit default. Null otherwise.
    pub fn uninitialized_default_value(&self, ty: Option<&TypeDescriptor>) -> ObjectRef {
        let Some(ty) = ty else {
            return ObjectRef::NULL;
        };
        if !ty.is_value_type() || !ty.implicit_default || !ty.is_initialized() {
            return ObjectRef::NULL;
        }
        let default = self
            .heap
            .engine()
            .registry()
            .get(ty.id)
            .map_err(AccessError::from)
            .and_then(|ty: Arc<TypeDescriptor>| self.heap.default_instance(&ty));
        match default {
            Ok(default) => default,
            Err(e) => {
                warn!("no default instance of {}: {}", ty.name, e);
                ObjectRef::NULL
            }
        }
    }
}
