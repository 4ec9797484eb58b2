use crate::{
    error::LayoutError,
    header::HeaderSizeCalculator,
    layout::{
        ArrayLayout, FieldLayout, FlatValue, HasLayout, InstanceLayout, LayoutManager,
        ReferenceSlot, Scalar,
    },
    LayoutEngine,
};
use tracing::trace;
use vtmem_types::{FieldDescriptor, FieldType, TypeDescriptor};
use vtmem_utils::{align_up, sync::Arc, ByteOffset};

pub struct LayoutFactory;

impl LayoutFactory {
    /// Places fields largest-alignment first, keeping declaration order among
    /// equals. Returns the placed fields with data-relative positions, the data
    /// size and the largest alignment.
    pub(crate) fn create_field_layout(
        fields: impl IntoIterator<Item = (FieldDescriptor, LayoutManager)>,
    ) -> (Vec<(FieldDescriptor, usize, LayoutManager)>, usize, usize) {
        let mut sorted_fields: Vec<_> = fields.into_iter().collect();
        sorted_fields.sort_by_key(|(_, layout)| std::cmp::Reverse(layout.alignment()));

        let mut offset = 0;
        let mut max_alignment = 1;
        let mut placed = Vec::with_capacity(sorted_fields.len());
        for (field, layout) in sorted_fields {
            let field_align = layout.alignment();
            max_alignment = max_alignment.max(field_align);
            let aligned_offset = align_up(offset, field_align);
            offset = aligned_offset + layout.size();
            placed.push((field, aligned_offset, layout));
        }

        (placed, align_up(offset, max_alignment), max_alignment)
    }

    pub(crate) fn field_layout_manager(
        engine: &LayoutEngine,
        field: &FieldDescriptor,
    ) -> Result<LayoutManager, LayoutError> {
        let slot = engine.config().reference_size();
        Ok(match field.field_type {
            FieldType::Primitive(p) => Scalar(p).into(),
            FieldType::Reference(target) => match engine.flattened_payload(field)? {
                Some(value) => Self::flat_value(value, slot).into(),
                None => ReferenceSlot {
                    target,
                    width: slot,
                }
                .into(),
            },
        })
    }

    fn flat_value(value: Arc<InstanceLayout>, slot: usize) -> FlatValue {
        if value.data_size == 0 {
            FlatValue {
                value,
                slot_size: 0,
                slot_alignment: 1,
            }
        } else {
            FlatValue {
                slot_size: align_up(value.data_size, slot),
                slot_alignment: value.alignment.max(slot),
                value,
            }
        }
    }

    pub(crate) fn create_instance_layout(
        engine: &LayoutEngine,
        ty: &TypeDescriptor,
    ) -> Result<InstanceLayout, LayoutError> {
        if ty.is_array() {
            return Err(LayoutError::UnexpectedArray(ty.name.clone()));
        }
        trace!("Computing layout for: {}", ty.name);

        let fields = ty
            .fields
            .iter()
            .map(|f| Ok((f.clone(), Self::field_layout_manager(engine, f)?)))
            .collect::<Result<Vec<_>, LayoutError>>()?;
        let (placed, data_size, alignment) = Self::create_field_layout(fields);

        let config = engine.config();
        let (header, size) = if ty.is_value_type() {
            let header = HeaderSizeCalculator::value_header(config, alignment);
            (header, header.size + data_size)
        } else {
            let header = HeaderSizeCalculator::identity_header(config, alignment);
            (header, align_up(header.size + data_size, 8))
        };

        let fields = placed
            .into_iter()
            .map(|(field, position, layout)| FieldLayout {
                field,
                position,
                offset: ByteOffset(header.size + position),
                layout,
            })
            .collect();

        Ok(InstanceLayout {
            type_id: ty.id,
            name: ty.name.clone(),
            is_value: ty.is_value_type(),
            header,
            data_size,
            alignment,
            fields,
            size,
        })
    }

    pub(crate) fn create_array_layout(
        engine: &LayoutEngine,
        ty: &TypeDescriptor,
    ) -> Result<ArrayLayout, LayoutError> {
        let (element, _) = ty
            .element()
            .ok_or_else(|| LayoutError::NotAnArray(ty.name.clone()))?;
        trace!("Computing array layout for: {}", ty.name);

        let slot = engine.config().reference_size();
        let element_layout: LayoutManager = if engine.is_flattened_array(Some(ty)) {
            let element_type = engine.registry().get(element)?;
            let value = engine.instance_layout(&element_type)?;
            FlatValue {
                slot_size: align_up(value.data_size, slot),
                slot_alignment: value.alignment.max(slot),
                value,
            }
            .into()
        } else {
            ReferenceSlot {
                target: element,
                width: slot,
            }
            .into()
        };

        Ok(ArrayLayout {
            type_id: ty.id,
            name: ty.name.clone(),
            element,
            header: HeaderSizeCalculator::array_header(engine.config()),
            stride: element_layout.size(),
            element_layout,
        })
    }
}
