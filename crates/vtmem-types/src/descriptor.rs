use std::fmt::{self, Display, Formatter};
use vtmem_utils::{
    sync::{AtomicBool, Ordering},
    FieldIndex, TypeId,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Float,
    Long,
    Double,
}

impl Primitive {
    pub const fn size(self) -> usize {
        match self {
            Primitive::Boolean | Primitive::Byte => 1,
            Primitive::Char | Primitive::Short => 2,
            Primitive::Int | Primitive::Float => 4,
            Primitive::Long | Primitive::Double => 8,
        }
    }

    pub const fn alignment(self) -> usize {
        self.size()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Long => "long",
            Primitive::Double => "double",
        }
    }
}

impl Display for Primitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Primitive(Primitive),
    Reference(TypeId),
}

impl FieldType {
    pub fn reference_target(&self) -> Option<TypeId> {
        match self {
            FieldType::Reference(id) => Some(*id),
            FieldType::Primitive(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub owner: TypeId,
    pub name: String,
    pub index: FieldIndex,
    pub field_type: FieldType,
    /// A null-restricted field can never hold null. Primitive fields are always
    /// null-restricted.
    pub null_restricted: bool,
}

impl FieldDescriptor {
    pub fn is_primitive(&self) -> bool {
        matches!(self.field_type, FieldType::Primitive(_))
    }
}

impl Display for FieldDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Aggregate without identity; instances may be flattened.
    Value,
    /// Ordinary class with identity; always boxed.
    Identity,
    Array {
        element: TypeId,
        null_restricted: bool,
    },
}

#[derive(Debug)]
pub struct TypeDescriptor {
    pub id: TypeId,
    pub name: String,
    pub kind: TypeKind,
    pub fields: Vec<FieldDescriptor>,
    /// Value type whose fields are all primitives or null-restricted fields of
    /// flattenable value types.
    pub flattenable: bool,
    /// Flattenable value type with an empty payload.
    pub zero_sized: bool,
    pub implicit_default: bool,
    initialized: AtomicBool,
}

impl TypeDescriptor {
    pub(crate) fn new(
        id: TypeId,
        name: String,
        kind: TypeKind,
        fields: Vec<FieldDescriptor>,
        flattenable: bool,
        zero_sized: bool,
        implicit_default: bool,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            fields,
            flattenable,
            zero_sized,
            implicit_default,
            // Arrays and identity types need no class initialization to be described.
            initialized: AtomicBool::new(!matches!(kind, TypeKind::Value)),
        }
    }

    pub fn is_value_type(&self) -> bool {
        matches!(self.kind, TypeKind::Value)
    }

    pub fn is_identity_type(&self) -> bool {
        matches!(self.kind, TypeKind::Identity)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    /// Element type and null-restriction of an array type.
    pub fn element(&self) -> Option<(TypeId, bool)> {
        match self.kind {
            TypeKind::Array {
                element,
                null_restricted,
            } => Some((element, null_restricted)),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Returns `true` the first time the type is marked.
    pub fn mark_initialized(&self) -> bool {
        !self.initialized.swap(true, Ordering::AcqRel)
    }
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}
