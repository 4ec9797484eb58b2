use crate::{
    access::RawMemoryAccess,
    error::AccessError,
    object::{FieldValue, HeapObject, ObjectRef, PrimitiveValue},
};
use dashmap::DashMap;
use tracing::{debug, trace};
use vtmem_layout::{
    FieldLayout, HasLayout, InstanceLayout, LayoutEngine, LayoutManager, ObjectLayout,
};
use vtmem_types::TypeDescriptor;
use vtmem_utils::{
    sync::{Arc, AtomicU32, Ordering},
    validate_alignment, ByteOffset, HandleId, TypeId,
};

const ARRAY_LENGTH_SIZE: usize = 4;
const DATA_ADDR_SIZE: usize = 8;

/// A non-collecting heap. Objects live until the heap is dropped and are
/// addressed by handle; reference slots store the handle id.
///
/// Boxed copies of flattened payloads are not entered in the handle table
/// until they are stored into a reference slot, so reading flattened values
/// does not grow the heap.
pub struct Heap {
    engine: Arc<LayoutEngine>,
    objects: DashMap<HandleId, Arc<HeapObject>>,
    next_handle: AtomicU32,
}

impl Heap {
    pub fn new(engine: Arc<LayoutEngine>) -> Self {
        Self {
            engine,
            objects: DashMap::new(),
            next_handle: AtomicU32::new(1),
        }
    }

    pub fn engine(&self) -> &Arc<LayoutEngine> {
        &self.engine
    }

    /// Number of objects reachable by handle.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn allocate(
        &self,
        ty: &Arc<TypeDescriptor>,
        length: Option<usize>,
    ) -> Result<Arc<HeapObject>, AccessError> {
        let object = self.allocate_detached(ty, length)?;
        self.objects.insert(object.handle(), Arc::clone(&object));
        Ok(object)
    }

    /// Allocates without entering the object in the handle table.
    fn allocate_detached(
        &self,
        ty: &Arc<TypeDescriptor>,
        length: Option<usize>,
    ) -> Result<Arc<HeapObject>, AccessError> {
        let layout = self.engine.object_layout(ty)?;
        let size = match &layout {
            ObjectLayout::Instance(i) => i.size,
            ObjectLayout::Array(a) => {
                let length = length.unwrap_or(0);
                a.size(length).ok_or_else(|| {
                    AccessError::invalid(format!("array {} of length {} is too large", ty.name, length))
                })?
            }
        };
        let handle = HandleId(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let object = Arc::new(HeapObject::new(
            handle,
            Arc::clone(ty),
            layout,
            length,
            size,
        ));
        validate_alignment(object.base_ptr(), 8);
        Self::write_header(&object)?;
        trace!("allocated {} {} ({} bytes)", handle, ty.name, size);
        Ok(object)
    }

    fn write_header(object: &HeapObject) -> Result<(), AccessError> {
        let access = RawMemoryAccess::new(object);
        let class = object.type_id().0 as u64;
        match object.layout() {
            ObjectLayout::Instance(i) => {
                access.write_slot(ByteOffset::ZERO, i.header.class_slot, class)?;
            }
            ObjectLayout::Array(a) => {
                access.write_slot(ByteOffset::ZERO, a.header.class_slot, class)?;
                let length = object.array_length().unwrap_or(0) as u64;
                access.write_slot(
                    ByteOffset(a.header.length_offset),
                    ARRAY_LENGTH_SIZE,
                    length,
                )?;
                if let Some(offset) = a.header.data_addr_offset {
                    let data = access.address_of(a.base_offset())?;
                    access.write_slot(ByteOffset(offset), DATA_ADDR_SIZE, data)?;
                }
            }
        }
        Ok(())
    }

    pub fn resolve(&self, handle: HandleId) -> Result<Arc<HeapObject>, AccessError> {
        self.objects
            .get(&handle)
            .map(|o| Arc::clone(o.value()))
            .ok_or_else(|| AccessError::invalid(format!("dangling handle {}", handle)))
    }

    pub(crate) fn object_from_slot(&self, raw: u64) -> Result<ObjectRef, AccessError> {
        match HandleId::from_slot(raw) {
            None => Ok(ObjectRef::NULL),
            Some(handle) => Ok(ObjectRef::new(self.resolve(handle)?)),
        }
    }

    /// The slot encoding of `obj`, entering it in the handle table first so
    /// the slot can be read back.
    pub(crate) fn publish(&self, obj: &ObjectRef) -> u64 {
        if let Some(object) = obj.as_object() {
            self.objects
                .entry(object.handle())
                .or_insert_with(|| Arc::clone(object));
        }
        obj.to_slot()
    }

    pub(crate) fn deref<'r>(
        &self,
        obj: &'r ObjectRef,
        what: &str,
    ) -> Result<&'r Arc<HeapObject>, AccessError> {
        obj.as_object()
            .ok_or_else(|| AccessError::invalid(format!("null {}", what)))
    }

    fn instance_layout_of(object: &HeapObject) -> Result<&Arc<InstanceLayout>, AccessError> {
        match object.layout() {
            ObjectLayout::Instance(i) => Ok(i),
            ObjectLayout::Array(_) => Err(AccessError::invalid(format!(
                "{} is an array",
                object.type_descriptor().name
            ))),
        }
    }

    /// Data bytes of a boxed value or identity object.
    pub(crate) fn payload_of(&self, object: &HeapObject) -> Result<Vec<u8>, AccessError> {
        let layout = Self::instance_layout_of(object)?;
        RawMemoryAccess::new(object).read_bytes(layout.data_offset(), layout.data_size)
    }

    /// Boxes a flattened payload into a fresh instance of `ty`.
    pub(crate) fn box_payload(
        &self,
        ty: &Arc<TypeDescriptor>,
        bytes: &[u8],
    ) -> Result<ObjectRef, AccessError> {
        let object = self.allocate_detached(ty, None)?;
        let layout = Self::instance_layout_of(&object)?;
        RawMemoryAccess::new(&object).write_bytes(layout.data_offset(), bytes)?;
        Ok(ObjectRef::new(object))
    }

    fn construct(
        &self,
        ty: &Arc<TypeDescriptor>,
        values: &[(&str, FieldValue)],
    ) -> Result<Arc<HeapObject>, AccessError> {
        if ty.is_array() {
            return Err(AccessError::invalid(format!(
                "{} is an array type, use new_array",
                ty.name
            )));
        }
        let object = self.allocate(ty, None)?;
        let layout = Arc::clone(Self::instance_layout_of(&object)?);
        for (name, value) in values {
            let field = layout.field(name).ok_or_else(|| {
                AccessError::NotFound(format!("Field not found: {}.{}", ty.name, name))
            })?;
            self.store(&object, field.offset, &field.layout, field.field.null_restricted, value)?;
        }
        for field in &layout.fields {
            if !values.iter().any(|(name, _)| *name == field.field.name) {
                self.store_default(&object, field)?;
            }
        }
        Ok(object)
    }

    /// Constructs an instance of `ty`, marking the type initialized. Fields not
    /// listed in `values` hold their default.
    pub fn new_instance(
        &self,
        ty: &Arc<TypeDescriptor>,
        values: &[(&str, FieldValue)],
    ) -> Result<ObjectRef, AccessError> {
        let object = self.construct(ty, values)?;
        if ty.mark_initialized() {
            debug!("initialized {}", ty.name);
        }
        Ok(ObjectRef::new(object))
    }

    /// A zero-filled instance of `ty` whose null-restricted value fields hold
    /// default instances. Does not initialize the type.
    pub fn default_instance(&self, ty: &Arc<TypeDescriptor>) -> Result<ObjectRef, AccessError> {
        Ok(ObjectRef::new(self.construct(ty, &[])?))
    }

    fn store_default(&self, object: &HeapObject, field: &FieldLayout) -> Result<(), AccessError> {
        let target = match &field.layout {
            LayoutManager::Scalar(_) => return Ok(()),
            LayoutManager::ReferenceSlot(slot) if field.field.null_restricted => slot.target,
            LayoutManager::ReferenceSlot(_) => return Ok(()),
            LayoutManager::FlatValue(v) => v.value.type_id,
        };
        if let Some(value) = self.element_default(target, field.field.owner)? {
            self.store(object, field.offset, &field.layout, true, &FieldValue::Object(value))?;
        }
        Ok(())
    }

    /// Default instance stored in null-restricted slots of type `target`.
    /// `None` for identity types and a value type containing itself.
    fn element_default(
        &self,
        target: TypeId,
        owner: TypeId,
    ) -> Result<Option<ObjectRef>, AccessError> {
        if target == owner {
            return Ok(None);
        }
        let target = self.engine.registry().get(target)?;
        if !target.is_value_type() {
            return Ok(None);
        }
        Ok(Some(self.default_instance(&target)?))
    }

    /// Writes `value` into the slot at `offset` as ordinary code would,
    /// checking its type against the slot.
    fn store(
        &self,
        object: &HeapObject,
        offset: ByteOffset,
        layout: &LayoutManager,
        null_restricted: bool,
        value: &FieldValue,
    ) -> Result<(), AccessError> {
        let access = RawMemoryAccess::new(object);
        match (layout, value) {
            (LayoutManager::Scalar(s), FieldValue::Primitive(p)) if s.0 == p.primitive() => {
                access.write_bytes(offset, &p.to_bytes())
            }
            (LayoutManager::ReferenceSlot(slot), FieldValue::Object(o)) => {
                match o.type_id() {
                    None if null_restricted => Err(AccessError::invalid(format!(
                        "null stored into null-restricted slot at offset {} of {}",
                        offset,
                        object.type_descriptor().name
                    ))),
                    Some(id) if id != slot.target => Err(self.type_mismatch(object, offset, o)),
                    _ => access.write_slot(offset, slot.width, self.publish(o)),
                }
            }
            (LayoutManager::FlatValue(flat), FieldValue::Object(o)) => {
                let source = self.deref(o, "value for a flattened slot")?;
                if source.type_id() != flat.value.type_id {
                    return Err(self.type_mismatch(object, offset, o));
                }
                access.write_bytes(offset, &self.payload_of(source)?)
            }
            _ => Err(AccessError::invalid(format!(
                "{:?} does not fit the {} slot at offset {} of {}",
                value,
                layout.type_tag(),
                offset,
                object.type_descriptor().name
            ))),
        }
    }

    fn type_mismatch(&self, object: &HeapObject, offset: ByteOffset, value: &ObjectRef) -> AccessError {
        AccessError::invalid(format!(
            "{:?} does not match the declared type of offset {} of {}",
            value,
            offset,
            object.type_descriptor().name
        ))
    }

    fn load(
        &self,
        object: &HeapObject,
        offset: ByteOffset,
        layout: &LayoutManager,
    ) -> Result<FieldValue, AccessError> {
        let access = RawMemoryAccess::new(object);
        match layout {
            LayoutManager::Scalar(s) => {
                let bytes = access.read_bytes(offset, s.size())?;
                PrimitiveValue::from_bytes(s.0, &bytes)
                    .map(FieldValue::Primitive)
                    .ok_or_else(|| AccessError::invalid(format!("short read at offset {}", offset)))
            }
            LayoutManager::ReferenceSlot(slot) => Ok(FieldValue::Object(
                self.object_from_slot(access.read_slot(offset, slot.width)?)?,
            )),
            LayoutManager::FlatValue(flat) => {
                let bytes = access.read_bytes(offset, flat.value.data_size)?;
                let ty = self.engine.registry().get(flat.value.type_id)?;
                Ok(FieldValue::Object(self.box_payload(&ty, &bytes)?))
            }
        }
    }

    /// Reads field `name`. A flattened field reads as a fresh boxed copy.
    pub fn read_field(&self, obj: &ObjectRef, name: &str) -> Result<FieldValue, AccessError> {
        let object = self.deref(obj, "object")?;
        let layout = Self::instance_layout_of(object)?;
        let field = layout.field(name).ok_or_else(|| {
            AccessError::NotFound(format!(
                "Field not found: {}.{}",
                object.type_descriptor().name,
                name
            ))
        })?;
        self.load(object, field.offset, &field.layout)
    }

    /// Follows a dotted path of fields, e.g. `"x.i"`.
    pub fn read_path(&self, obj: &ObjectRef, path: &str) -> Result<FieldValue, AccessError> {
        let mut current = FieldValue::Object(obj.clone());
        for name in path.split('.') {
            let FieldValue::Object(o) = &current else {
                return Err(AccessError::invalid(format!(
                    "{} in path {} is not an object",
                    name, path
                )));
            };
            current = self.read_field(o, name)?;
        }
        Ok(current)
    }

    pub fn read_int(&self, obj: &ObjectRef, path: &str) -> Result<i32, AccessError> {
        self.read_path(obj, path)?
            .as_int()
            .ok_or_else(|| AccessError::invalid(format!("{} is not an int", path)))
    }

    pub fn read_long(&self, obj: &ObjectRef, path: &str) -> Result<i64, AccessError> {
        self.read_path(obj, path)?
            .as_long()
            .ok_or_else(|| AccessError::invalid(format!("{} is not a long", path)))
    }

    /// An array of `length` elements. Null-restricted arrays start out filled
    /// with default instances.
    pub fn new_array(&self, ty: &Arc<TypeDescriptor>, length: usize) -> Result<ObjectRef, AccessError> {
        let (element, null_restricted) = ty
            .element()
            .ok_or_else(|| AccessError::invalid(format!("{} is not an array type", ty.name)))?;
        let object = self.allocate(ty, Some(length))?;
        if null_restricted && length > 0 {
            if let Some(default) = self.element_default(element, ty.id)? {
                let default = FieldValue::Object(default);
                for index in 0..length {
                    self.store_element_value(&object, index, &default)?;
                }
            }
        }
        Ok(ObjectRef::new(object))
    }

    pub fn new_array_from(
        &self,
        ty: &Arc<TypeDescriptor>,
        elements: &[ObjectRef],
    ) -> Result<ObjectRef, AccessError> {
        let array = self.new_array(ty, elements.len())?;
        let object = self.deref(&array, "array")?;
        for (index, element) in elements.iter().enumerate() {
            self.store_element_value(object, index, &FieldValue::Object(element.clone()))?;
        }
        Ok(array)
    }

    fn element_location(
        object: &HeapObject,
        index: usize,
    ) -> Result<(ByteOffset, &LayoutManager, bool), AccessError> {
        let ObjectLayout::Array(layout) = object.layout() else {
            return Err(AccessError::invalid(format!(
                "{} is not an array",
                object.type_descriptor().name
            )));
        };
        let length = object.array_length().unwrap_or(0);
        if index >= length {
            return Err(AccessError::invalid(format!(
                "index {} out of bounds for length {}",
                index, length
            )));
        }
        let null_restricted = object
            .type_descriptor()
            .element()
            .is_some_and(|(_, nr)| nr);
        Ok((
            layout.element_offset(index),
            &layout.element_layout,
            null_restricted,
        ))
    }

    fn store_element_value(
        &self,
        object: &HeapObject,
        index: usize,
        value: &FieldValue,
    ) -> Result<(), AccessError> {
        let (offset, layout, null_restricted) = Self::element_location(object, index)?;
        self.store(object, offset, layout, null_restricted, value)
    }

    pub fn write_element(
        &self,
        array: &ObjectRef,
        index: usize,
        value: &ObjectRef,
    ) -> Result<(), AccessError> {
        let object = self.deref(array, "array")?;
        self.store_element_value(object, index, &FieldValue::Object(value.clone()))
    }

    pub fn read_element(&self, array: &ObjectRef, index: usize) -> Result<ObjectRef, AccessError> {
        let object = self.deref(array, "array")?;
        let (offset, layout, _) = Self::element_location(object, index)?;
        match self.load(object, offset, layout)? {
            FieldValue::Object(o) => Ok(o),
            FieldValue::Primitive(_) => Err(AccessError::invalid("primitive array element")),
        }
    }

    /// Size of a live object, header included. Fails on null.
    pub fn get_object_size(&self, obj: &ObjectRef) -> Result<usize, AccessError> {
        Ok(self.deref(obj, "object")?.size())
    }

    /// Type id recorded in the class slot of the header.
    pub fn class_of(&self, obj: &ObjectRef) -> Result<TypeId, AccessError> {
        let object = self.deref(obj, "object")?;
        let width = match object.layout() {
            ObjectLayout::Instance(i) => i.header.class_slot,
            ObjectLayout::Array(a) => a.header.class_slot,
        };
        let raw = RawMemoryAccess::new(object).read_slot(ByteOffset::ZERO, width)?;
        Ok(TypeId(raw as u32))
    }

    /// Length recorded in an array header, and its `dataAddr` slot if present.
    pub fn array_header(&self, obj: &ObjectRef) -> Result<(usize, Option<u64>), AccessError> {
        let object = self.deref(obj, "array")?;
        let ObjectLayout::Array(layout) = object.layout() else {
            return Err(AccessError::invalid(format!(
                "{} is not an array",
                object.type_descriptor().name
            )));
        };
        let access = RawMemoryAccess::new(object);
        let length = access.read_slot(ByteOffset(layout.header.length_offset), ARRAY_LENGTH_SIZE)?;
        let data_addr = layout
            .header
            .data_addr_offset
            .map(|offset| access.read_slot(ByteOffset(offset), DATA_ADDR_SIZE))
            .transpose()?;
        Ok((length as usize, data_addr))
    }

    /// Address of the first element of an array.
    pub fn array_data_address(&self, obj: &ObjectRef) -> Result<u64, AccessError> {
        let object = self.deref(obj, "array")?;
        let ObjectLayout::Array(layout) = object.layout() else {
            return Err(AccessError::invalid("not an array"));
        };
        RawMemoryAccess::new(object).address_of(layout.base_offset())
    }

    /// Substitutability: identity for identity objects, type and field
    /// contents for value objects.
    pub fn acmp(&self, a: &ObjectRef, b: &ObjectRef) -> bool {
        match (a.as_object(), b.as_object()) {
            (None, None) => true,
            (Some(x), Some(y)) => {
                Arc::ptr_eq(x, y)
                    || (x.is_value()
                        && x.type_id() == y.type_id()
                        && self.substitutable(x, y).unwrap_or(false))
            }
            _ => false,
        }
    }

    fn substitutable(&self, x: &HeapObject, y: &HeapObject) -> Result<bool, AccessError> {
        let layout = Self::instance_layout_of(x)?;
        for field in &layout.fields {
            let same = match &field.layout {
                LayoutManager::ReferenceSlot(slot) => {
                    let read = |o: &HeapObject| {
                        RawMemoryAccess::new(o)
                            .read_slot(field.offset, slot.width)
                            .and_then(|raw| self.object_from_slot(raw))
                    };
                    self.acmp(&read(x)?, &read(y)?)
                }
                other => {
                    let size = other.access_size();
                    RawMemoryAccess::new(x).read_bytes(field.offset, size)?
                        == RawMemoryAccess::new(y).read_bytes(field.offset, size)?
                }
            };
            if !same {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
