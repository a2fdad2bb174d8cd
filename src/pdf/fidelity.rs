use super::{Column, Header, RowStyle, TableDocument, GRAY};
use crate::error::Result;
use crate::format::{format_amount, format_grouped_int, format_money, format_optional_date};
use crate::report::{
    check_fidelity_rows, ClientFidelityRow, ExportFormat, FidelityFilter, FidelityTotals,
    ReportConfig, ReportRenderer,
};

const COLUMNS: [Column; 7] = [
    Column::right("#", 25.0),
    Column::left("Client", 150.0),
    Column::left("NIT", 75.0),
    Column::right("Purchases", 60.0),
    Column::right("Total spent", 75.0),
    Column::right("Avg. ticket", 70.0),
    Column::right("Last purchase", 60.0),
];

/// Client fidelity report as an A4 PDF.
#[derive(Debug, Clone, Copy, Default)]
pub struct FidelityPdf;

impl ReportRenderer<FidelityFilter, ClientFidelityRow> for FidelityPdf {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn render(
        &self,
        config: &ReportConfig<FidelityFilter>,
        rows: &[ClientFidelityRow],
    ) -> Result<Vec<u8>> {
        check_fidelity_rows(rows)?;

        let header = Header {
            title: &config.title,
            organization: &config.organization,
            generated_by: &config.generated_by,
            generated_at: config.generated_at,
            logo_path: config.logo_path.as_deref(),
            details: config.filter.describe(&config.currency_symbol),
        };
        let mut doc = TableDocument::new(header, COLUMNS.to_vec());

        if rows.is_empty() {
            doc.banner(
                "No clients match the selected filters.",
                RowStyle::striped(0).text(GRAY),
            );
        }

        for (i, row) in rows.iter().enumerate() {
            let mut style = RowStyle::striped(i);
            if row.sales_count == 0 {
                style = style.text(GRAY);
            }
            doc.row(
                &[
                    (i + 1).to_string(),
                    row.full_name.clone(),
                    row.nit.clone().unwrap_or_else(|| "-".to_string()),
                    format_grouped_int(row.sales_count),
                    format_amount(row.total_spent),
                    format_amount(row.avg_ticket),
                    format_optional_date(row.last_sale),
                ],
                style,
            );
        }

        let totals = FidelityTotals::of(rows);
        let symbol = &config.currency_symbol;
        doc.totals(&[
            ("Clients".to_string(), totals.clients.to_string()),
            ("Purchases".to_string(), format_grouped_int(totals.sales_count)),
            ("Total spent".to_string(), format_money(totals.total_spent, symbol)),
            ("Average ticket".to_string(), format_money(totals.avg_ticket(), symbol)),
        ]);

        doc.finish()
    }
}
