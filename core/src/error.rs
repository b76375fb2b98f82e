use std::path::PathBuf;
use thiserror::Error;

/// Result type for archive conversion
pub type Result<T> = std::result::Result<T, TomoError>;

/// Error types for archive conversion
#[derive(Error, Debug)]
pub enum TomoError {
    /// A source document could not be parsed at all
    #[error("Failed to parse XML {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A node lacked one or more required children
    #[error("Node {node} is missing required keys: {}", fields.join(", "))]
    MissingFields { node: String, fields: Vec<String> },

    /// The archive violates an invariant of the domain graph
    #[error("{0}")]
    DomainInvariant(String),

    /// The dataset writer rejected an attribute
    #[error("Failed to insert DICOM element {key}: {value:?}")]
    Encode { key: String, value: String },

    /// Patient identifier lookup failed
    #[error("MRN lookup failed: {0}")]
    Lookup(String),

    /// DICOM file serialization error
    #[error("DICOM write error: {0}")]
    Write(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TomoError {
    /// Builds a parse error for the document at `path`
    pub fn parse(path: impl Into<PathBuf>, err: roxmltree::Error) -> Self {
        TomoError::Parse {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Builds a missing-fields error for a single field
    pub fn missing(node: &str, field: &str) -> Self {
        TomoError::MissingFields {
            node: node.to_string(),
            fields: vec![field.to_string()],
        }
    }
}

// Helper conversions
impl From<String> for TomoError {
    fn from(s: String) -> Self {
        TomoError::DomainInvariant(s)
    }
}

impl From<&str> for TomoError {
    fn from(s: &str) -> Self {
        TomoError::DomainInvariant(s.to_string())
    }
}
