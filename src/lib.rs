pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod ids;
pub mod money;
pub mod pdf;
pub mod report;
pub mod store;
pub mod xlsx;

pub use config::Config;
pub use error::{ErrorKind, PharmacyError, Result};
pub use ids::IdCodec;
pub use report::{ExportFormat, GeneratedReport, ReportService};
pub use store::Database;
