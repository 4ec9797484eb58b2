//! Header shapes of boxed values, identity objects and arrays.
use crate::{config::RuntimeConfig, error::LayoutError, LayoutEngine};
use serde::Serialize;
use vtmem_types::TypeDescriptor;
use vtmem_utils::align_up;

const ARRAY_LENGTH_SIZE: usize = 4;
const DATA_ADDR_SIZE: usize = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObjectHeaderShape {
    /// Width of the class slot at offset 0.
    pub class_slot: usize,
    /// Offset of the lock word, identity objects only.
    pub lock_word: Option<usize>,
    pub size: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArrayHeaderShape {
    pub class_slot: usize,
    pub length_offset: usize,
    pub data_addr_offset: Option<usize>,
    pub size: usize,
}

pub struct HeaderSizeCalculator;

impl HeaderSizeCalculator {
    /// A boxed value carries only its class slot. Padding needed to align the
    /// first field is counted as header, so a compressed slot grows to 8 bytes
    /// in front of an 8-aligned field.
    pub fn value_header(config: &RuntimeConfig, max_field_alignment: usize) -> ObjectHeaderShape {
        let slot = config.reference_size();
        ObjectHeaderShape {
            class_slot: slot,
            lock_word: None,
            size: align_up(slot, max_field_alignment),
        }
    }

    pub fn identity_header(
        config: &RuntimeConfig,
        max_field_alignment: usize,
    ) -> ObjectHeaderShape {
        let slot = config.reference_size();
        ObjectHeaderShape {
            class_slot: slot,
            lock_word: Some(slot),
            size: align_up(2 * slot, max_field_alignment),
        }
    }

    pub fn array_header(config: &RuntimeConfig) -> ArrayHeaderShape {
        let slot = config.reference_size();
        let length_offset = slot;
        let mut size = align_up(length_offset + ARRAY_LENGTH_SIZE, slot);
        let data_addr_offset = if config.gc.has_data_addr_slot() {
            let offset = size;
            size += DATA_ADDR_SIZE;
            Some(offset)
        } else {
            None
        };
        ArrayHeaderShape {
            class_slot: slot,
            length_offset,
            data_addr_offset,
            size,
        }
    }
}

impl LayoutEngine {
    /// Header bytes of a boxed value of type `ty`; `0` for `None`, identity
    /// types and arrays.
    pub fn value_header_size(&self, ty: Option<&TypeDescriptor>) -> Result<usize, LayoutError> {
        match ty {
            Some(ty) if ty.is_value_type() => Ok(self.instance_layout(ty)?.header.size),
            _ => Ok(0),
        }
    }

    pub fn identity_header_size(&self, ty: &TypeDescriptor) -> Result<usize, LayoutError> {
        if ty.is_identity_type() {
            Ok(self.instance_layout(ty)?.header.size)
        } else {
            Ok(0)
        }
    }

    pub fn array_header_size(&self) -> usize {
        HeaderSizeCalculator::array_header(self.config()).size
    }
}
