use crate::{
    error::LayoutError,
    layout::{HasLayout, LayoutManager},
    LayoutEngine,
};
use vtmem_types::{FieldType, TypeDescriptor, TypeResolutionError};
use vtmem_utils::ByteOffset;

/// A field or array element resolved from a container offset.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotLayout {
    pub offset: ByteOffset,
    /// Declared type of the field, or the element type of an array.
    pub declared: FieldType,
    pub layout: LayoutManager,
    pub element_index: Option<usize>,
}

impl SlotLayout {
    pub fn is_flattened(&self) -> bool {
        self.layout.is_flattened()
    }
}

impl LayoutEngine {
    pub fn array_base_offset(&self, ty: Option<&TypeDescriptor>) -> Result<ByteOffset, LayoutError> {
        let ty = ty.ok_or(LayoutError::NullArgument("array type"))?;
        Ok(self.array_layout(ty)?.base_offset())
    }

    pub fn array_element_offset(
        &self,
        ty: &TypeDescriptor,
        index: usize,
    ) -> Result<ByteOffset, LayoutError> {
        Ok(self.array_layout(ty)?.element_offset(index))
    }

    /// Offset of field `name` from the start of an instance of `ty`, header
    /// included.
    pub fn object_field_offset(
        &self,
        ty: &TypeDescriptor,
        name: &str,
    ) -> Result<ByteOffset, LayoutError> {
        self.instance_layout(ty)?
            .field(name)
            .map(|f| f.offset)
            .ok_or_else(|| {
                TypeResolutionError::FieldNotFound {
                    owner: ty.name.clone(),
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// The field of an instance of `ty` that starts at `offset`.
    pub fn field_slot(
        &self,
        ty: &TypeDescriptor,
        offset: ByteOffset,
    ) -> Result<SlotLayout, LayoutError> {
        let layout = self.instance_layout(ty)?;
        let field = layout
            .field_at(offset)
            .ok_or_else(|| LayoutError::NoSlotAtOffset {
                owner: ty.name.clone(),
                offset: offset.as_usize(),
            })?;
        Ok(SlotLayout {
            offset,
            declared: field.field.field_type,
            layout: field.layout.clone(),
            element_index: None,
        })
    }

    /// The element of an array of type `ty` and `length` that starts at `offset`.
    pub fn element_slot(
        &self,
        ty: &TypeDescriptor,
        length: usize,
        offset: ByteOffset,
    ) -> Result<SlotLayout, LayoutError> {
        let layout = self.array_layout(ty)?;
        let index = layout
            .index_at(offset, length)
            .ok_or_else(|| LayoutError::NoSlotAtOffset {
                owner: ty.name.clone(),
                offset: offset.as_usize(),
            })?;
        debug_assert!(layout.element_layout.size() == layout.stride);
        Ok(SlotLayout {
            offset,
            declared: FieldType::Reference(layout.element),
            layout: layout.element_layout.clone(),
            element_index: Some(index),
        })
    }
}
