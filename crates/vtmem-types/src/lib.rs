//! # vtmem-types
//!
//! Type and field descriptors for value, identity and array types, and the
//! registry that resolves them by name.
pub mod definition;
pub mod descriptor;
pub mod error;
pub mod registry;

pub use definition::{FieldDefinition, FieldSpec, TypeDefinition};
pub use descriptor::{FieldDescriptor, FieldType, Primitive, TypeDescriptor, TypeKind};
pub use error::TypeResolutionError;
pub use registry::TypeRegistry;
