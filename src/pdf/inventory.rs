use rust_decimal::Decimal;

use super::{Column, Header, RowStyle, TableDocument, BANNER_FILL, GRAY, LOW_FILL, MEDIUM_FILL, RED};
use crate::error::Result;
use crate::format::{format_amount, format_grouped_int, format_money};
use crate::report::{
    check_medicine_rows, group_by_category, ExportFormat, InventoryFilter, MedicineRow,
    ReportConfig, ReportRenderer, StockLevel,
};

const COLUMNS: [Column; 7] = [
    Column::left("Medicine", 150.0),
    Column::left("Presentation", 85.0),
    Column::right("Stock", 45.0),
    Column::left("Level", 50.0),
    Column::right("Unit price", 65.0),
    Column::right("Total value", 75.0),
    Column::left("Status", 45.0),
];

/// Medicines grouped by category, with per-category subtotals.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryPdf;

impl ReportRenderer<InventoryFilter, MedicineRow> for InventoryPdf {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn render(
        &self,
        config: &ReportConfig<InventoryFilter>,
        rows: &[MedicineRow],
    ) -> Result<Vec<u8>> {
        check_medicine_rows(rows)?;

        let header = Header {
            title: &config.title,
            organization: &config.organization,
            generated_by: &config.generated_by,
            generated_at: config.generated_at,
            logo_path: config.logo_path.as_deref(),
            details: config.filter.header_details(&config.currency_symbol, rows),
        };
        let mut doc = TableDocument::new(header, COLUMNS.to_vec());

        if rows.is_empty() {
            doc.banner(
                "No medicines match the selected filters.",
                RowStyle::striped(0).text(GRAY),
            );
        }

        let groups = group_by_category(rows);
        for group in &groups {
            doc.banner(
                &format!("{} ({} medicines)", group.category_name, group.rows.len()),
                RowStyle::striped(0).fill(BANNER_FILL).bold(),
            );
            for (i, row) in group.rows.iter().enumerate() {
                let level = row.stock_level();
                let mut style = RowStyle::striped(i);
                match level {
                    StockLevel::Low => style = style.fill(LOW_FILL),
                    StockLevel::Medium => style = style.fill(MEDIUM_FILL),
                    StockLevel::High => {}
                }
                if !row.active {
                    style = style.text(RED);
                }
                doc.row(
                    &[
                        row.medicine_name.clone(),
                        row.presentation_name.clone(),
                        format_grouped_int(row.stock_total),
                        level.label().to_string(),
                        format_amount(row.unit_price),
                        format_amount(row.total_value()),
                        if row.active { "Active" } else { "Inactive" }.to_string(),
                    ],
                    style,
                );
            }
            doc.row(
                &[
                    "Subtotal".to_string(),
                    String::new(),
                    format_grouped_int(group.total_stock()),
                    String::new(),
                    String::new(),
                    format_amount(group.total_value()),
                    String::new(),
                ],
                RowStyle::striped(0).bold(),
            );
        }

        let symbol = &config.currency_symbol;
        let total_stock: i64 = rows.iter().map(|r| r.stock_total).sum();
        let total_value: Decimal = rows.iter().map(MedicineRow::total_value).sum();
        let low = rows
            .iter()
            .filter(|r| r.stock_level() == StockLevel::Low)
            .count();
        doc.totals(&[
            ("Categories".to_string(), groups.len().to_string()),
            ("Medicines".to_string(), rows.len().to_string()),
            ("Low stock".to_string(), low.to_string()),
            ("Total units".to_string(), format_grouped_int(total_stock)),
            ("Inventory value".to_string(), format_money(total_value, symbol)),
        ]);

        doc.finish()
    }
}
