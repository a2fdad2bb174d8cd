//! Report pipeline: filter -> validation -> aggregation -> immutable
//! [`ReportConfig`] -> rendered bytes.

mod document;
mod filter;
mod rows;
mod service;

pub use document::{ExportFormat, ReportConfig, ReportRenderer};
pub use filter::{
    FidelityFilter, FidelitySort, InventoryFilter, InventorySort, SortOrder, MAX_TOP_N,
};
pub use rows::{
    check_fidelity_rows, check_medicine_rows, group_by_category, CategoryGroup,
    ClientFidelityRow, FidelityTotals, MedicineRow, StockLevel,
};
pub use service::{
    fidelity_title, report_file_name, FidelityRenderer, GeneratedReport, InventoryRenderer,
    ReportKind, ReportOptions, ReportRequest, ReportService, INVENTORY_TITLE,
};
