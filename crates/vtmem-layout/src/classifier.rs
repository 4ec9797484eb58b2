use crate::{error::LayoutError, layout::InstanceLayout, LayoutEngine};
use tracing::warn;
use vtmem_types::{FieldDescriptor, FieldType, TypeDescriptor};
use vtmem_utils::sync::Arc;

impl LayoutEngine {
    /// Whether `field` stores its value inline. Fails on a missing field.
    ///
    /// A field is flattened when field flattening is enabled, the field is
    /// null-restricted, and its declared type is a flattenable value type whose
    /// payload fits the threshold.
    pub fn is_flattened(&self, field: Option<&FieldDescriptor>) -> Result<bool, LayoutError> {
        let field = field.ok_or(LayoutError::NullArgument("field"))?;
        Ok(self.flattened_payload(field)?.is_some())
    }

    /// Payload layout of a flattened field, `None` when the field is boxed or
    /// primitive.
    pub(crate) fn flattened_payload(
        &self,
        field: &FieldDescriptor,
    ) -> Result<Option<Arc<InstanceLayout>>, LayoutError> {
        let config = self.config();
        if !config.field_flattening_enabled() || !field.null_restricted {
            return Ok(None);
        }
        let FieldType::Reference(target) = field.field_type else {
            return Ok(None);
        };
        if target == field.owner {
            return Ok(None);
        }
        let target = self.registry().get(target)?;
        if !target.is_value_type() || !target.flattenable {
            return Ok(None);
        }
        let payload = self.instance_layout(&target)?;
        Ok((payload.data_size <= config.flattening_threshold).then_some(payload))
    }

    /// Whether elements of array type `ty` are stored inline. `false` for
    /// `None` and for non-array types.
    pub fn is_flattened_array(&self, ty: Option<&TypeDescriptor>) -> bool {
        let Some((element, null_restricted)) = ty.and_then(|t| t.element()) else {
            return false;
        };
        if !self.config().array_flattening || !null_restricted {
            return false;
        }
        match self.registry().get(element) {
            Ok(element) => element.is_value_type() && element.flattenable,
            Err(e) => {
                warn!("array element of {:?} did not resolve: {}", ty.map(|t| &t.name), e);
                false
            }
        }
    }
}
