use crate::{error::LayoutError, LayoutEngine};
use vtmem_types::TypeDescriptor;

impl LayoutEngine {
    /// Bytes of instance data of `ty`, excluding any header.
    pub fn data_size(&self, ty: &TypeDescriptor) -> Result<usize, LayoutError> {
        Ok(self.instance_layout(ty)?.data_size)
    }

    /// Size of a boxed instance of `ty`. For value types this is exactly header
    /// plus data; identity objects are padded to 8 bytes.
    pub fn instance_size(&self, ty: &TypeDescriptor) -> Result<usize, LayoutError> {
        Ok(self.instance_layout(ty)?.size)
    }

    pub fn array_size(&self, ty: &TypeDescriptor, length: usize) -> Result<usize, LayoutError> {
        self.array_layout(ty)?
            .size(length)
            .ok_or_else(|| LayoutError::ArrayTooLarge {
                name: ty.name.clone(),
                length,
            })
    }
}
