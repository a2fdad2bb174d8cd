use chrono::NaiveDateTime;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{PharmacyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Pdf,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Pdf => write!(f, "PDF"),
            ExportFormat::Xlsx => write!(f, "Excel"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = PharmacyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            _ => Err(PharmacyError::InvalidArgument {
                field: "format",
                value: s.to_string(),
            }),
        }
    }
}

/// Everything a renderer needs besides the rows. Built once per request and
/// never mutated afterwards; the `with_*` methods consume and return it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig<F> {
    pub title: String,
    pub logo_path: Option<PathBuf>,
    pub generated_by: String,
    pub generated_at: NaiveDateTime,
    pub filter: F,
    pub currency_symbol: String,
    pub organization: String,
}

impl<F> ReportConfig<F> {
    pub fn new(title: impl Into<String>, filter: F, generated_at: NaiveDateTime) -> Self {
        Self {
            title: title.into(),
            logo_path: None,
            generated_by: "System".to_string(),
            generated_at,
            filter,
            currency_symbol: "Bs.".to_string(),
            organization: String::new(),
        }
    }

    pub fn with_logo(self, logo_path: Option<PathBuf>) -> Self {
        Self { logo_path, ..self }
    }

    pub fn with_generated_by(self, generated_by: impl Into<String>) -> Self {
        Self {
            generated_by: generated_by.into(),
            ..self
        }
    }

    pub fn with_currency(self, currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
            ..self
        }
    }

    pub fn with_organization(self, organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            ..self
        }
    }
}

/// Turns a report config and its rows into a finished document.
///
/// Implementations are stateless and must be deterministic: the same config
/// and rows always produce the same bytes.
pub trait ReportRenderer<F, R> {
    fn format(&self) -> ExportFormat;

    fn render(&self, config: &ReportConfig<F>, rows: &[R]) -> Result<Vec<u8>>;
}
