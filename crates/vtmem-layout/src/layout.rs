use crate::header::{ArrayHeaderShape, ObjectHeaderShape};
use enum_dispatch::enum_dispatch;
use serde::Serialize;
use std::ops::Range;
use vtmem_types::{FieldDescriptor, Primitive};
use vtmem_utils::{sync::Arc, ByteOffset, TypeId};

#[enum_dispatch]
pub trait HasLayout {
    /// Bytes the node occupies inside its container.
    fn size(&self) -> usize;
    fn alignment(&self) -> usize;
}

/// Storage of a single field or array element.
#[enum_dispatch(HasLayout)]
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutManager {
    Scalar,
    ReferenceSlot,
    FlatValue,
}

impl LayoutManager {
    pub fn is_flattened(&self) -> bool {
        matches!(self, LayoutManager::FlatValue(_))
    }

    /// Bytes actually read and written by an access. For a flattened value this
    /// is the payload without the trailing slot padding.
    pub fn access_size(&self) -> usize {
        match self {
            LayoutManager::Scalar(s) => s.size(),
            LayoutManager::ReferenceSlot(r) => r.width,
            LayoutManager::FlatValue(v) => v.value.data_size,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            LayoutManager::Scalar(Scalar(p)) => match p {
                Primitive::Boolean => "bool",
                Primitive::Byte => "i8",
                Primitive::Char => "u16",
                Primitive::Short => "i16",
                Primitive::Int => "i32",
                Primitive::Float => "f32",
                Primitive::Long => "i64",
                Primitive::Double => "f64",
            },
            LayoutManager::ReferenceSlot(_) => "ref",
            LayoutManager::FlatValue(_) => "flat",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Scalar(pub Primitive);

impl HasLayout for Scalar {
    fn size(&self) -> usize {
        self.0.size()
    }

    fn alignment(&self) -> usize {
        self.0.alignment()
    }
}

/// A reference slot holding a heap handle; `target` is the declared type.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReferenceSlot {
    pub target: TypeId,
    pub width: usize,
}

impl HasLayout for ReferenceSlot {
    fn size(&self) -> usize {
        self.width
    }

    fn alignment(&self) -> usize {
        self.width
    }
}

/// A value payload stored inline in its container.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatValue {
    pub value: Arc<InstanceLayout>,
    pub slot_size: usize,
    pub slot_alignment: usize,
}

impl HasLayout for FlatValue {
    fn size(&self) -> usize {
        self.slot_size
    }

    fn alignment(&self) -> usize {
        self.slot_alignment
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldLayout {
    pub field: FieldDescriptor,
    /// Offset from the start of the data area.
    pub position: usize,
    /// Offset from the start of the object, header included.
    pub offset: ByteOffset,
    pub layout: LayoutManager,
}

impl FieldLayout {
    pub fn as_range(&self) -> Range<usize> {
        self.offset.as_usize()..self.offset.as_usize() + self.layout.size()
    }

    pub fn is_flattened(&self) -> bool {
        self.layout.is_flattened()
    }
}

/// Layout of a value or identity type, both as a boxed object and as the
/// payload it contributes when flattened.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceLayout {
    pub type_id: TypeId,
    pub name: String,
    pub is_value: bool,
    pub header: ObjectHeaderShape,
    pub data_size: usize,
    /// Largest field alignment, `1` without fields.
    pub alignment: usize,
    /// Fields in placement order.
    pub fields: Vec<FieldLayout>,
    /// Size of a boxed instance.
    pub size: usize,
}

impl InstanceLayout {
    pub fn header_size(&self) -> usize {
        self.header.size
    }

    pub fn data_offset(&self) -> ByteOffset {
        ByteOffset(self.header.size)
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.field.name == name)
    }

    /// The field starting at `offset`. Zero-sized fields may share an offset
    /// with a neighbour; the non-empty one wins.
    pub fn field_at(&self, offset: ByteOffset) -> Option<&FieldLayout> {
        let mut at_offset = self.fields.iter().filter(|f| f.offset == offset);
        let first = at_offset.next()?;
        if first.layout.access_size() > 0 {
            return Some(first);
        }
        at_offset
            .find(|f| f.layout.access_size() > 0)
            .or(Some(first))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArrayLayout {
    pub type_id: TypeId,
    pub name: String,
    pub element: TypeId,
    pub header: ArrayHeaderShape,
    pub stride: usize,
    pub element_layout: LayoutManager,
}

impl ArrayLayout {
    pub fn is_flattened(&self) -> bool {
        self.element_layout.is_flattened()
    }

    pub fn base_offset(&self) -> ByteOffset {
        ByteOffset(self.header.size)
    }

    pub fn element_offset(&self, index: usize) -> ByteOffset {
        self.base_offset() + index * self.stride
    }

    /// Total object size, `None` on overflow.
    pub fn size(&self, length: usize) -> Option<usize> {
        length
            .checked_mul(self.stride)
            .and_then(|data| data.checked_add(self.header.size))
    }

    /// Index of the element starting at `offset` in an array of `length`.
    /// Elements of a zero-stride array all live at the base offset.
    pub fn index_at(&self, offset: ByteOffset, length: usize) -> Option<usize> {
        let relative = offset.checked_sub(self.base_offset())?.as_usize();
        if self.stride == 0 {
            return (relative == 0 && length > 0).then_some(0);
        }
        let index = relative / self.stride;
        (relative % self.stride == 0 && index < length).then_some(index)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectLayout {
    Instance(Arc<InstanceLayout>),
    Array(Arc<ArrayLayout>),
}

impl ObjectLayout {
    pub fn header_size(&self) -> usize {
        match self {
            ObjectLayout::Instance(i) => i.header.size,
            ObjectLayout::Array(a) => a.header.size,
        }
    }
}

/// Serializable summary of one field, for tooling output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldSummary {
    pub name: String,
    pub offset: usize,
    pub size: usize,
    pub kind: &'static str,
    pub flattened: bool,
}

impl From<&FieldLayout> for FieldSummary {
    fn from(f: &FieldLayout) -> Self {
        Self {
            name: f.field.name.clone(),
            offset: f.offset.as_usize(),
            size: f.layout.size(),
            kind: f.layout.type_tag(),
            flattened: f.is_flattened(),
        }
    }
}
