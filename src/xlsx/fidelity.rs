use super::{
    detail_pairs, new_workbook, set_column_widths, write_column_headers, write_header_block,
    RowFormats, ZERO_FILL,
};
use crate::error::Result;
use crate::format::format_optional_date;
use crate::money::to_f64;
use crate::report::{
    check_fidelity_rows, ClientFidelityRow, ExportFormat, FidelityFilter, FidelityTotals,
    ReportConfig, ReportRenderer,
};

const HEADERS: [&str; 7] = [
    "#",
    "Client",
    "NIT",
    "Purchases",
    "Total spent",
    "Avg. ticket",
    "Last purchase",
];
const WIDTHS: [f64; 7] = [6.0, 32.0, 16.0, 12.0, 16.0, 14.0, 15.0];

/// Client fidelity report as a single-sheet workbook.
#[derive(Debug, Clone, Copy, Default)]
pub struct FidelityXlsx;

impl ReportRenderer<FidelityFilter, ClientFidelityRow> for FidelityXlsx {
    fn format(&self) -> ExportFormat {
        ExportFormat::Xlsx
    }

    fn render(
        &self,
        config: &ReportConfig<FidelityFilter>,
        rows: &[ClientFidelityRow],
    ) -> Result<Vec<u8>> {
        check_fidelity_rows(rows)?;

        let mut workbook = new_workbook(&config.title, &config.generated_by, config.generated_at)?;
        let sheet = workbook.add_worksheet();
        sheet.set_name("Client Fidelity")?;

        let details = detail_pairs(&config.filter.describe(&config.currency_symbol));
        let header_row = write_header_block(
            sheet,
            &config.title,
            &config.organization,
            &config.generated_by,
            config.generated_at,
            &details,
            HEADERS.len() as u16 - 1,
        )?;
        write_column_headers(sheet, header_row, &HEADERS)?;
        set_column_widths(sheet, &WIDTHS)?;
        sheet.set_freeze_panes(header_row + 1, 0)?;

        let mut r = header_row + 1;
        for (i, row) in rows.iter().enumerate() {
            let formats = if row.sales_count == 0 {
                RowFormats::new(Some(ZERO_FILL), None, false)
            } else {
                RowFormats::striped(i)
            };
            sheet.write_number_with_format(r, 0, (i + 1) as f64, &formats.integer)?;
            sheet.write_string_with_format(r, 1, &row.full_name, &formats.text)?;
            let nit = row.nit.as_deref().unwrap_or("");
            sheet.write_string_with_format(r, 2, nit, &formats.text)?;
            sheet.write_number_with_format(r, 3, row.sales_count as f64, &formats.integer)?;
            sheet.write_number_with_format(r, 4, to_f64(row.total_spent), &formats.money)?;
            sheet.write_number_with_format(r, 5, to_f64(row.avg_ticket), &formats.money)?;
            let last_sale = format_optional_date(row.last_sale);
            sheet.write_string_with_format(r, 6, last_sale, &formats.text)?;
            r += 1;
        }

        let totals = FidelityTotals::of(rows);
        let formats = RowFormats::totals();
        sheet.write_string_with_format(r, 0, "", &formats.text)?;
        let label = format!("Total ({} clients)", totals.clients);
        sheet.write_string_with_format(r, 1, label, &formats.text)?;
        sheet.write_string_with_format(r, 2, "", &formats.text)?;
        sheet.write_number_with_format(r, 3, totals.sales_count as f64, &formats.integer)?;
        sheet.write_number_with_format(r, 4, to_f64(totals.total_spent), &formats.money)?;
        sheet.write_number_with_format(r, 5, to_f64(totals.avg_ticket()), &formats.money)?;
        sheet.write_string_with_format(r, 6, "", &formats.text)?;

        Ok(workbook.save_to_buffer()?)
    }
}
