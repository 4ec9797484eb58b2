use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeResolutionError {
    #[error("Type not found: {0}")]
    TypeNotFound(String),
    #[error("Field not found: {owner}.{name}")]
    FieldNotFound { owner: String, name: String },
    #[error("Type {0} is already defined with a different shape")]
    DuplicateType(String),
    #[error("Field {field} refers to undefined type {target}")]
    UnresolvedFieldType { field: String, target: String },
    #[error("Invalid type handle: {0}")]
    InvalidHandle(u32),
    #[error("Null-restricted array element must be a value type, got {0}")]
    InvalidArrayElement(String),
}
