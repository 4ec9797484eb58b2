//! The standard set of test types: small value types, identity types wrapping
//! them, and arrays of both.
use vtmem_types::{Primitive, TypeDefinition, TypeDescriptor, TypeRegistry, TypeResolutionError};
use vtmem_utils::sync::Arc;

pub struct Fixtures {
    pub value_int: Arc<TypeDescriptor>,
    /// Same shape as `ValueInt`, distinct type.
    pub value_int2: Arc<TypeDescriptor>,
    pub value_long: Arc<TypeDescriptor>,
    pub point: Arc<TypeDescriptor>,
    pub long_point: Arc<TypeDescriptor>,
    pub with_long_field: Arc<TypeDescriptor>,
    pub class_point: Arc<TypeDescriptor>,
    pub value_class_int: Arc<TypeDescriptor>,
    /// Value type whose fields are nullable, so never flattened.
    pub value_class_point: Arc<TypeDescriptor>,
    pub int_wrapper: Arc<TypeDescriptor>,
    pub zero_size: Arc<TypeDescriptor>,
    pub zero_size_wrapper: Arc<TypeDescriptor>,
    /// Never instantiated, so it has no default value.
    pub never_initialized: Arc<TypeDescriptor>,
    pub value_int_array: Arc<TypeDescriptor>,
    pub point_array: Arc<TypeDescriptor>,
    pub zero_size_array: Arc<TypeDescriptor>,
    pub nullable_zero_size_array: Arc<TypeDescriptor>,
    pub class_point_array: Arc<TypeDescriptor>,
}

impl Fixtures {
    pub fn define(registry: &TypeRegistry) -> Result<Self, TypeResolutionError> {
        let value_int =
            registry.define(TypeDefinition::value("ValueInt").primitive("i", Primitive::Int))?;
        let value_int2 =
            registry.define(TypeDefinition::value("ValueInt2").primitive("i", Primitive::Int))?;
        let value_long =
            registry.define(TypeDefinition::value("ValueLong").primitive("l", Primitive::Long))?;
        let point = registry.define(
            TypeDefinition::value("ValueTypePoint2D")
                .null_restricted("x", "ValueInt")
                .null_restricted("y", "ValueInt"),
        )?;
        let long_point = registry.define(
            TypeDefinition::value("ValueTypeLongPoint2D")
                .null_restricted("x", "ValueLong")
                .null_restricted("y", "ValueLong"),
        )?;
        let with_long_field = registry.define(
            TypeDefinition::value("ValueTypeWithLongField").null_restricted("l", "ValueLong"),
        )?;
        let class_point = registry.define(
            TypeDefinition::identity("ClassTypePoint2D")
                .primitive("x", Primitive::Int)
                .primitive("y", Primitive::Int),
        )?;
        let value_class_int = registry
            .define(TypeDefinition::value("ValueClassInt").primitive("i", Primitive::Int))?;
        let value_class_point = registry.define(
            TypeDefinition::value("ValueClassPoint2D")
                .nullable("x", "ValueClassInt")
                .nullable("y", "ValueClassInt"),
        )?;
        let int_wrapper = registry
            .define(TypeDefinition::identity("IntWrapper").null_restricted("vti", "ValueInt"))?;
        let zero_size = registry.define(TypeDefinition::value("ZeroSizeValueType"))?;
        let zero_size_wrapper = registry.define(
            TypeDefinition::value("ZeroSizeValueTypeWrapper")
                .null_restricted("z", "ZeroSizeValueType"),
        )?;
        let never_initialized = registry
            .define(TypeDefinition::value("NeverInitialized").null_restricted("i", "ValueInt"))?;

        Ok(Self {
            value_int_array: registry.array_of(value_int.id, true)?,
            point_array: registry.array_of(point.id, true)?,
            zero_size_array: registry.array_of(zero_size.id, true)?,
            nullable_zero_size_array: registry.array_of(zero_size.id, false)?,
            class_point_array: registry.array_of(class_point.id, false)?,
            value_int,
            value_int2,
            value_long,
            point,
            long_point,
            with_long_field,
            class_point,
            value_class_int,
            value_class_point,
            int_wrapper,
            zero_size,
            zero_size_wrapper,
            never_initialized,
        })
    }

    /// Every fixture type, in definition order.
    pub fn all(&self) -> Vec<&Arc<TypeDescriptor>> {
        vec![
            &self.value_int,
            &self.value_int2,
            &self.value_long,
            &self.point,
            &self.long_point,
            &self.with_long_field,
            &self.class_point,
            &self.value_class_int,
            &self.value_class_point,
            &self.int_wrapper,
            &self.zero_size,
            &self.zero_size_wrapper,
            &self.never_initialized,
            &self.value_int_array,
            &self.point_array,
            &self.zero_size_array,
            &self.nullable_zero_size_array,
            &self.class_point_array,
        ]
    }
}
