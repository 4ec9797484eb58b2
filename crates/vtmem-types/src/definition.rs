use crate::descriptor::Primitive;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldSpec {
    Primitive(Primitive),
    Reference {
        type_name: String,
        null_restricted: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub spec: FieldSpec,
}

/// Declarative description of a type, resolved against a
/// [`TypeRegistry`](crate::TypeRegistry) on definition.
///
/// Reference fields name their target type. The target must already be
/// defined, except for a reference back to the type being defined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDefinition {
    pub name: String,
    pub is_value: bool,
    pub fields: Vec<FieldDefinition>,
    pub implicit_default: bool,
}

impl TypeDefinition {
    /// A value class. Value classes admit an implicit default instance unless
    /// [`without_implicit_default`](Self::without_implicit_default) is called.
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_value: true,
            fields: vec![],
            implicit_default: true,
        }
    }

    pub fn identity(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_value: false,
            fields: vec![],
            implicit_default: false,
        }
    }

    pub fn without_implicit_default(mut self) -> Self {
        self.implicit_default = false;
        self
    }

    pub fn primitive(mut self, name: impl Into<String>, primitive: Primitive) -> Self {
        self.fields.push(FieldDefinition {
            name: name.into(),
            spec: FieldSpec::Primitive(primitive),
        });
        self
    }

    /// A field that can never hold null (`T!`).
    pub fn null_restricted(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push(FieldDefinition {
            name: name.into(),
            spec: FieldSpec::Reference {
                type_name: type_name.into(),
                null_restricted: true,
            },
        });
        self
    }

    pub fn nullable(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push(FieldDefinition {
            name: name.into(),
            spec: FieldSpec::Reference {
                type_name: type_name.into(),
                null_restricted: false,
            },
        });
        self
    }
}
