use std::path::PathBuf;
use thiserror::Error;

use crate::report::ExportFormat;

#[derive(Error, Debug)]
pub enum PharmacyError {
    #[error("Config directory not found at {0}. Run 'pharmacy init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid key material: {0}")]
    KeyMaterial(String),

    #[error("Invalid encrypted ID format: {0}")]
    IdFormat(String),

    #[error("Encrypted ID failed to decrypt (corrupted ID or wrong key)")]
    IdDecryption,

    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("A client with NIT '{0}' already exists")]
    DuplicateNit(String),

    #[error("{entity} not found or deleted")]
    NotFound { entity: &'static str },

    #[error("Invalid {field} value '{value}'")]
    InvalidArgument { field: &'static str, value: String },

    #[error("Report row {row} is missing required field '{field}'")]
    MissingField { row: usize, field: &'static str },

    #[error("No {0} renderer registered")]
    RendererNotRegistered(ExportFormat),

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(#[from] lopdf::Error),

    #[error("Failed to generate spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Broad classes callers use to decide how an error is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Domain,
    InvalidLink,
    Infrastructure,
}

impl PharmacyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PharmacyError::Validation(_)
            | PharmacyError::InvalidArgument { .. }
            | PharmacyError::MissingField { .. } => ErrorKind::Validation,
            PharmacyError::DuplicateNit(_)
            | PharmacyError::NotFound { .. }
            | PharmacyError::ConfigNotFound(_)
            | PharmacyError::AlreadyInitialized(_) => ErrorKind::Domain,
            PharmacyError::IdFormat(_) | PharmacyError::IdDecryption => ErrorKind::InvalidLink,
            _ => ErrorKind::Infrastructure,
        }
    }

    /// Message safe to show to the person at the terminal.
    ///
    /// Infrastructure failures are collapsed into a generic line; the
    /// detailed cause is expected to be logged by the caller.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::InvalidLink => "Invalid or tampered link".to_string(),
            ErrorKind::Infrastructure => match self {
                PharmacyError::ConfigFileNotFound(_) | PharmacyError::ConfigParse { .. } => {
                    self.to_string()
                }
                _ => "An internal error occurred; see the log for details (RUST_LOG=error)"
                    .to_string(),
            },
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PharmacyError>;
