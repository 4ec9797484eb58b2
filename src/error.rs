use thiserror::Error;
use vtmem_layout::{ConfigError, LayoutError};
use vtmem_types::TypeResolutionError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Type(#[from] TypeResolutionError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}
