use std::fmt::{self, Debug, Formatter};
use vtmem_layout::ObjectLayout;
use vtmem_types::{Primitive, TypeDescriptor};
use vtmem_utils::{
    sync::{Arc, AtomicU64, RwLock},
    HandleId, TypeId,
};

/// A heap object: header and data in one 8-byte aligned block.
pub struct HeapObject {
    handle: HandleId,
    ty: Arc<TypeDescriptor>,
    layout: ObjectLayout,
    length: Option<usize>,
    size: usize,
    storage: Box<[AtomicU64]>,
    /// Shared for single-instruction atomics, exclusive for wider payloads.
    lock: RwLock<()>,
}

impl HeapObject {
    pub(crate) fn new(
        handle: HandleId,
        ty: Arc<TypeDescriptor>,
        layout: ObjectLayout,
        length: Option<usize>,
        size: usize,
    ) -> Self {
        let words = size.div_ceil(8).max(1);
        Self {
            handle,
            ty,
            layout,
            length,
            size,
            storage: (0..words).map(|_| AtomicU64::new(0)).collect(),
            lock: RwLock::new(()),
        }
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn type_descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.ty
    }

    pub fn type_id(&self) -> TypeId {
        self.ty.id
    }

    pub fn layout(&self) -> &ObjectLayout {
        &self.layout
    }

    /// Object size in bytes, header included.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn array_length(&self) -> Option<usize> {
        self.length
    }

    pub fn is_value(&self) -> bool {
        self.ty.is_value_type()
    }

    pub(crate) fn base_ptr(&self) -> *mut u8 {
        // Atomics have interior mutability, so writing through this pointer is sound.
        self.storage.as_ptr() as *mut u8
    }

    pub(crate) fn lock(&self) -> &RwLock<()> {
        &self.lock
    }
}

impl Debug for HeapObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapObject")
            .field("handle", &self.handle)
            .field("type", &self.ty.name)
            .field("size", &self.size)
            .finish()
    }
}

/// A possibly-null reference to a heap object. Equality is identity.
#[derive(Clone, Default)]
pub struct ObjectRef(Option<Arc<HeapObject>>);

impl ObjectRef {
    pub const NULL: Self = ObjectRef(None);

    pub fn new(object: Arc<HeapObject>) -> Self {
        ObjectRef(Some(object))
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_object(&self) -> Option<&Arc<HeapObject>> {
        self.0.as_ref()
    }

    pub fn handle(&self) -> Option<HandleId> {
        self.0.as_ref().map(|o| o.handle)
    }

    pub fn type_id(&self) -> Option<TypeId> {
        self.0.as_ref().map(|o| o.ty.id)
    }

    pub fn type_descriptor(&self) -> Option<&Arc<TypeDescriptor>> {
        self.0.as_ref().map(|o| &o.ty)
    }

    pub(crate) fn to_slot(&self) -> u64 {
        HandleId::to_slot(self.handle())
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for ObjectRef {}

impl Debug for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(o) => write!(f, "ObjectRef({}: {})", o.handle, o.ty.name),
            None => f.write_str("ObjectRef(null)"),
        }
    }
}

impl From<Arc<HeapObject>> for ObjectRef {
    fn from(object: Arc<HeapObject>) -> Self {
        ObjectRef::new(object)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PrimitiveValue {
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
}

impl PrimitiveValue {
    pub fn primitive(&self) -> Primitive {
        match self {
            PrimitiveValue::Boolean(_) => Primitive::Boolean,
            PrimitiveValue::Byte(_) => Primitive::Byte,
            PrimitiveValue::Char(_) => Primitive::Char,
            PrimitiveValue::Short(_) => Primitive::Short,
            PrimitiveValue::Int(_) => Primitive::Int,
            PrimitiveValue::Float(_) => Primitive::Float,
            PrimitiveValue::Long(_) => Primitive::Long,
            PrimitiveValue::Double(_) => Primitive::Double,
        }
    }

    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            PrimitiveValue::Boolean(v) => vec![v as u8],
            PrimitiveValue::Byte(v) => v.to_ne_bytes().to_vec(),
            PrimitiveValue::Char(v) => v.to_ne_bytes().to_vec(),
            PrimitiveValue::Short(v) => v.to_ne_bytes().to_vec(),
            PrimitiveValue::Int(v) => v.to_ne_bytes().to_vec(),
            PrimitiveValue::Float(v) => v.to_ne_bytes().to_vec(),
            PrimitiveValue::Long(v) => v.to_ne_bytes().to_vec(),
            PrimitiveValue::Double(v) => v.to_ne_bytes().to_vec(),
        }
    }

    /// Decodes `bytes`, which must be exactly `primitive.size()` long.
    pub fn from_bytes(primitive: Primitive, bytes: &[u8]) -> Option<Self> {
        Some(match primitive {
            Primitive::Boolean => PrimitiveValue::Boolean(*bytes.first()? != 0),
            Primitive::Byte => PrimitiveValue::Byte(i8::from_ne_bytes(bytes.try_into().ok()?)),
            Primitive::Char => PrimitiveValue::Char(u16::from_ne_bytes(bytes.try_into().ok()?)),
            Primitive::Short => PrimitiveValue::Short(i16::from_ne_bytes(bytes.try_into().ok()?)),
            Primitive::Int => PrimitiveValue::Int(i32::from_ne_bytes(bytes.try_into().ok()?)),
            Primitive::Float => PrimitiveValue::Float(f32::from_ne_bytes(bytes.try_into().ok()?)),
            Primitive::Long => PrimitiveValue::Long(i64::from_ne_bytes(bytes.try_into().ok()?)),
            Primitive::Double => {
                PrimitiveValue::Double(f64::from_ne_bytes(bytes.try_into().ok()?))
            }
        })
    }
}

/// The contents of a field as seen by ordinary code.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Primitive(PrimitiveValue),
    Object(ObjectRef),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            FieldValue::Primitive(PrimitiveValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            FieldValue::Primitive(PrimitiveValue::Long(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            FieldValue::Object(o) => Some(o),
            FieldValue::Primitive(_) => None,
        }
    }
}

impl From<PrimitiveValue> for FieldValue {
    fn from(v: PrimitiveValue) -> Self {
        FieldValue::Primitive(v)
    }
}

impl From<ObjectRef> for FieldValue {
    fn from(o: ObjectRef) -> Self {
        FieldValue::Object(o)
    }
}

impl From<&ObjectRef> for FieldValue {
    fn from(o: &ObjectRef) -> Self {
        FieldValue::Object(o.clone())
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Primitive(PrimitiveValue::Int(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Primitive(PrimitiveValue::Long(v))
    }
}
