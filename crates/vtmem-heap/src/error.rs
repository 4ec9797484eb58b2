use thiserror::Error;
use vtmem_layout::LayoutError;
use vtmem_types::TypeResolutionError;

/// The two fault classes of the accessor. Every other failure is reported
/// through an ordinary return value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccessError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AccessError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AccessError::InvalidArgument(msg.into())
    }
}

impl From<TypeResolutionError> for AccessError {
    fn from(e: TypeResolutionError) -> Self {
        match e {
            TypeResolutionError::TypeNotFound(_) | TypeResolutionError::FieldNotFound { .. } => {
                AccessError::NotFound(e.to_string())
            }
            _ => AccessError::InvalidArgument(e.to_string()),
        }
    }
}

impl From<LayoutError> for AccessError {
    fn from(e: LayoutError) -> Self {
        match e {
            LayoutError::Type(inner) => inner.into(),
            other => AccessError::InvalidArgument(other.to_string()),
        }
    }
}
