use chrono::NaiveDateTime;
use std::path::PathBuf;

use super::document::{ExportFormat, ReportConfig, ReportRenderer};
use super::filter::{FidelityFilter, InventoryFilter};
use super::rows::{ClientFidelityRow, MedicineRow};
use crate::config::Config;
use crate::error::{PharmacyError, Result};
use crate::store::{Database, ReportRepository};

pub type FidelityRenderer = Box<dyn ReportRenderer<FidelityFilter, ClientFidelityRow>>;
pub type InventoryRenderer = Box<dyn ReportRenderer<InventoryFilter, MedicineRow>>;

/// Settings the service applies to every report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub default_limit: u32,
    pub max_span_days: i64,
    pub currency_symbol: String,
    pub organization: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_span_days: 366,
            currency_symbol: "Bs.".to_string(),
            organization: String::new(),
        }
    }
}

impl ReportOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_limit: config.reports.default_limit,
            max_span_days: config.reports.max_span_days,
            currency_symbol: config.pharmacy.currency_symbol.clone(),
            organization: config.pharmacy.name.clone(),
        }
    }
}

/// Who asked for a report, and when. `generated_at` doubles as "today" for
/// date validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub generated_by: String,
    pub logo_path: Option<PathBuf>,
    pub generated_at: NaiveDateTime,
}

impl ReportRequest {
    pub fn new(generated_by: impl Into<String>, generated_at: NaiveDateTime) -> Self {
        Self {
            generated_by: generated_by.into(),
            logo_path: None,
            generated_at,
        }
    }

    pub fn with_logo(self, logo_path: Option<PathBuf>) -> Self {
        Self { logo_path, ..self }
    }
}

/// A rendered report ready to be written out or sent.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub title: String,
    pub file_name: String,
    pub format: ExportFormat,
    pub mime_type: &'static str,
    pub rows: usize,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    ClientFidelity,
    MedicinesByCategory,
}

impl ReportKind {
    fn file_stem(self) -> &'static str {
        match self {
            ReportKind::ClientFidelity => "ClientFidelity",
            ReportKind::MedicinesByCategory => "MedicinesByCategory",
        }
    }
}

/// `<Kind>Report_<yyyyMMdd_HHmmss>.<ext>`
pub fn report_file_name(kind: ReportKind, at: NaiveDateTime, format: ExportFormat) -> String {
    format!(
        "{}Report_{}.{}",
        kind.file_stem(),
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

pub fn fidelity_title(filter: &FidelityFilter) -> String {
    match filter.top_n {
        Some(n) if n > 0 => format!("Top {n} Clients by Total Spent"),
        _ => "Client Fidelity Report".to_string(),
    }
}

pub const INVENTORY_TITLE: &str = "Medicines by Category";

/// Validates filters, runs the aggregation and hands the rows to the
/// renderer registered for the requested format.
pub struct ReportService {
    repo: ReportRepository,
    options: ReportOptions,
    fidelity_renderers: Vec<FidelityRenderer>,
    inventory_renderers: Vec<InventoryRenderer>,
}

impl ReportService {
    /// A service with no renderers; see [`ReportService::with_default_renderers`].
    pub fn new(db: Database, options: ReportOptions) -> Self {
        Self {
            repo: ReportRepository::new(db),
            options,
            fidelity_renderers: Vec::new(),
            inventory_renderers: Vec::new(),
        }
    }

    /// PDF and spreadsheet renderers for both reports.
    pub fn with_default_renderers(db: Database, options: ReportOptions) -> Self {
        let mut service = Self::new(db, options);
        service.register_fidelity(Box::new(crate::pdf::FidelityPdf));
        service.register_fidelity(Box::new(crate::xlsx::FidelityXlsx));
        service.register_inventory(Box::new(crate::pdf::InventoryPdf));
        service.register_inventory(Box::new(crate::xlsx::InventoryXlsx));
        service
    }

    /// Later registrations for the same format take precedence.
    pub fn register_fidelity(&mut self, renderer: FidelityRenderer) {
        self.fidelity_renderers.insert(0, renderer);
    }

    pub fn register_inventory(&mut self, renderer: InventoryRenderer) {
        self.inventory_renderers.insert(0, renderer);
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Validated fidelity rows, without rendering.
    pub fn fidelity_rows(
        &self,
        filter: &FidelityFilter,
        request: &ReportRequest,
    ) -> Result<Vec<ClientFidelityRow>> {
        let errors = filter.validate(request.generated_at.date(), self.options.max_span_days);
        if !errors.is_empty() {
            return Err(PharmacyError::Validation(errors));
        }
        self.repo
            .client_fidelity(filter, filter.row_limit(self.options.default_limit))
    }

    pub fn inventory_rows(&self, filter: &InventoryFilter) -> Result<Vec<MedicineRow>> {
        let errors = filter.validate();
        if !errors.is_empty() {
            return Err(PharmacyError::Validation(errors));
        }
        self.repo.medicines_by_category(filter)
    }

    pub fn generate_fidelity(
        &self,
        filter: &FidelityFilter,
        request: &ReportRequest,
        format: ExportFormat,
    ) -> Result<GeneratedReport> {
        let renderer = self
            .fidelity_renderers
            .iter()
            .find(|r| r.format() == format)
            .ok_or(PharmacyError::RendererNotRegistered(format))?;

        let rows = self.fidelity_rows(filter, request)?;
        let config = self.config_for(fidelity_title(filter), filter.clone(), request);
        let bytes = renderer.render(&config, &rows)?;

        Ok(self.finish(
            ReportKind::ClientFidelity,
            config.title,
            format,
            request,
            rows.len(),
            bytes,
        ))
    }

    pub fn generate_inventory(
        &self,
        filter: &InventoryFilter,
        request: &ReportRequest,
        format: ExportFormat,
    ) -> Result<GeneratedReport> {
        let renderer = self
            .inventory_renderers
            .iter()
            .find(|r| r.format() == format)
            .ok_or(PharmacyError::RendererNotRegistered(format))?;

        let rows = self.inventory_rows(filter)?;
        let config = self.config_for(INVENTORY_TITLE.to_string(), filter.clone(), request);
        let bytes = renderer.render(&config, &rows)?;

        Ok(self.finish(
            ReportKind::MedicinesByCategory,
            config.title,
            format,
            request,
            rows.len(),
            bytes,
        ))
    }

    fn config_for<F>(&self, title: String, filter: F, request: &ReportRequest) -> ReportConfig<F> {
        ReportConfig::new(title, filter, request.generated_at)
            .with_logo(request.logo_path.clone())
            .with_generated_by(request.generated_by.clone())
            .with_currency(self.options.currency_symbol.clone())
            .with_organization(self.options.organization.clone())
    }

    fn finish(
        &self,
        kind: ReportKind,
        title: String,
        format: ExportFormat,
        request: &ReportRequest,
        rows: usize,
        bytes: Vec<u8>,
    ) -> GeneratedReport {
        log::info!(
            "generated {kind:?} report as {format}: {rows} rows, {} bytes",
            bytes.len()
        );
        GeneratedReport {
            title,
            file_name: report_file_name(kind, request.generated_at, format),
            format,
            mime_type: format.mime_type(),
            rows,
            bytes,
        }
    }
}
