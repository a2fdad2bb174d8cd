use rust_decimal::Decimal;

use super::{
    detail_pairs, new_workbook, set_column_widths, write_column_headers, write_header_block,
    RowFormats, INACTIVE_FONT, LOW_FILL, MEDIUM_FILL, STRIPE_FILL, TOTAL_FILL,
};
use crate::error::Result;
use crate::money::to_f64;
use crate::report::{
    check_medicine_rows, group_by_category, ExportFormat, InventoryFilter, MedicineRow,
    ReportConfig, ReportRenderer, StockLevel,
};

const HEADERS: [&str; 8] = [
    "Category",
    "Medicine",
    "Presentation",
    "Stock",
    "Level",
    "Unit price",
    "Total value",
    "Status",
];
const WIDTHS: [f64; 8] = [20.0, 32.0, 18.0, 10.0, 10.0, 13.0, 15.0, 11.0];

/// Medicines by category as a single-sheet workbook with subtotal rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryXlsx;

impl ReportRenderer<InventoryFilter, MedicineRow> for InventoryXlsx {
    fn format(&self) -> ExportFormat {
        ExportFormat::Xlsx
    }

    fn render(
        &self,
        config: &ReportConfig<InventoryFilter>,
        rows: &[MedicineRow],
    ) -> Result<Vec<u8>> {
        check_medicine_rows(rows)?;

        let mut workbook = new_workbook(&config.title, &config.generated_by, config.generated_at)?;
        let sheet = workbook.add_worksheet();
        sheet.set_name("Medicines")?;

        let details = config.filter.header_details(&config.currency_symbol, rows);
        let details = detail_pairs(&details);
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
        for group in group_by_category(rows) {
            for (i, row) in group.rows.iter().enumerate() {
                let level = row.stock_level();
                let fill = match level {
                    StockLevel::Low => Some(LOW_FILL),
                    StockLevel::Medium => Some(MEDIUM_FILL),
                    StockLevel::High => (i % 2 == 1).then_some(STRIPE_FILL),
                };
                let font = (!row.active).then_some(INACTIVE_FONT);
                let formats = RowFormats::new(fill, font, false);

                sheet.write_string_with_format(r, 0, group.category_name, &formats.text)?;
                sheet.write_string_with_format(r, 1, &row.medicine_name, &formats.text)?;
                sheet.write_string_with_format(r, 2, &row.presentation_name, &formats.text)?;
                sheet.write_number_with_format(r, 3, row.stock_total as f64, &formats.integer)?;
                sheet.write_string_with_format(r, 4, level.label(), &formats.text)?;
                sheet.write_number_with_format(r, 5, to_f64(row.unit_price), &formats.money)?;
                sheet.write_number_with_format(r, 6, to_f64(row.total_value()), &formats.money)?;
                let status = if row.active { "Active" } else { "Inactive" };
                sheet.write_string_with_format(r, 7, status, &formats.text)?;
                r += 1;
            }

            let formats = RowFormats::new(Some(TOTAL_FILL), None, true);
            sheet.write_string_with_format(r, 0, group.category_name, &formats.text)?;
            sheet.write_string_with_format(r, 1, "Subtotal", &formats.text)?;
            sheet.write_string_with_format(r, 2, "", &formats.text)?;
            sheet.write_number_with_format(r, 3, group.total_stock() as f64, &formats.integer)?;
            sheet.write_string_with_format(r, 4, "", &formats.text)?;
            sheet.write_string_with_format(r, 5, "", &formats.text)?;
            sheet.write_number_with_format(r, 6, to_f64(group.total_value()), &formats.money)?;
            sheet.write_string_with_format(r, 7, "", &formats.text)?;
            r += 2;
        }

        let total_stock: i64 = rows.iter().map(|r| r.stock_total).sum();
        let total_value: Decimal = rows.iter().map(MedicineRow::total_value).sum();
        let formats = RowFormats::totals();
        sheet.write_string_with_format(r, 0, "Total", &formats.text)?;
        sheet.write_string_with_format(r, 1, format!("{} medicines", rows.len()), &formats.text)?;
        sheet.write_string_with_format(r, 2, "", &formats.text)?;
        sheet.write_number_with_format(r, 3, total_stock as f64, &formats.integer)?;
        sheet.write_string_with_format(r, 4, "", &formats.text)?;
        sheet.write_string_with_format(r, 5, "", &formats.text)?;
        sheet.write_number_with_format(r, 6, to_f64(total_value), &formats.money)?;
        sheet.write_string_with_format(r, 7, "", &formats.text)?;

        Ok(workbook.save_to_buffer()?)
    }
}
