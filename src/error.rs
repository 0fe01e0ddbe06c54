use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Error;

/// A referenced raster or font file was missing or could not be decoded.
/// Always fatal to the operation that triggered it.
#[derive(Debug, Clone)]
pub struct ResourceError {
    pub kind: &'static str,
    pub path: PathBuf,
    pub message: String,
}

impl ResourceError {
    pub fn new(kind: &'static str, path: &Path, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} resource '{}' unavailable: {}",
            self.kind,
            self.path.display(),
            self.message
        )
    }
}

impl std::error::Error for ResourceError {}

/// The bot configuration document failed schema validation. Propagated as a
/// hard failure so callers can never proceed with an unusable config.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub message: String,
}

impl ConfigValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration: {}", self.message)
    }
}

impl std::error::Error for ConfigValidationError {}

pub fn find_resource_error(error: &Error) -> Option<&ResourceError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ResourceError>())
}

pub fn find_config_validation_error(error: &Error) -> Option<&ConfigValidationError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ConfigValidationError>())
}
