use crate::{
    access::RawMemoryAccess,
    error::AccessError,
    heap::Heap,
    object::{HeapObject, ObjectRef},
};
use vtmem_layout::{InstanceLayout, LayoutManager};
use vtmem_types::FieldType;
use vtmem_utils::{sync::Arc, ByteOffset, TypeId};

pub(crate) enum SlotKind {
    /// Inline payload of a value type.
    Flat(Arc<InstanceLayout>),
    /// A handle slot of `width` bytes.
    Reference(usize),
}

/// An object-typed field or array element named by container and offset.
pub(crate) struct StorageLocation {
    pub object: Arc<HeapObject>,
    pub offset: ByteOffset,
    pub declared: TypeId,
    pub kind: SlotKind,
}

impl StorageLocation {
    /// Fails on a null container, on an offset that does not start a field or
    /// element, and on primitive slots.
    pub fn resolve(
        heap: &Heap,
        container: &ObjectRef,
        offset: ByteOffset,
    ) -> Result<Self, AccessError> {
        let object = Arc::clone(heap.deref(container, "container")?);
        let engine = heap.engine();
        let ty = object.type_descriptor();
        let slot = match object.array_length() {
            Some(length) => engine.element_slot(ty, length, offset)?,
            None => engine.field_slot(ty, offset)?,
        };
        let (declared, kind) = match (slot.declared, slot.layout) {
            (FieldType::Reference(declared), LayoutManager::FlatValue(flat)) => {
                (declared, SlotKind::Flat(flat.value))
            }
            (FieldType::Reference(declared), LayoutManager::ReferenceSlot(r)) => {
                (declared, SlotKind::Reference(r.width))
            }
            _ => {
                return Err(AccessError::invalid(format!(
                    "offset {} of {} does not hold an object",
                    offset, ty.name
                )))
            }
        };
        Ok(Self {
            object,
            offset,
            declared,
            kind,
        })
    }

    pub fn access(&self) -> RawMemoryAccess<'_> {
        RawMemoryAccess::new(&self.object)
    }
}
