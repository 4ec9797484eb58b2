use thiserror::Error;
use vtmem_types::TypeResolutionError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for option {option}")]
    InvalidValue { option: String, value: String },
    #[error("Unknown GC policy: {0}")]
    UnknownGcPolicy(String),
    #[error("Could not read {name}: {reason}")]
    Environment { name: String, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error(transparent)]
    Type(#[from] TypeResolutionError),
    #[error("Null {0}")]
    NullArgument(&'static str),
    #[error("{0} is not an array type")]
    NotAnArray(String),
    #[error("{0} is an array type")]
    UnexpectedArray(String),
    #[error("No field or element of {owner} starts at offset {offset}")]
    NoSlotAtOffset { owner: String, offset: usize },
    #[error("Array {name} of length {length} exceeds the addressable size")]
    ArrayTooLarge { name: String, length: usize },
}
