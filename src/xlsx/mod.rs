//! Single-sheet spreadsheet reports built with `rust_xlsxwriter`.

mod fidelity;
mod inventory;

pub use fidelity::FidelityXlsx;
pub use inventory::InventoryXlsx;

use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_xlsxwriter::{
    Color, DocProperties, ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet,
};

use crate::error::Result;
use crate::format::format_datetime;

pub(crate) const HEADER_FILL: Color = Color::RGB(0x29617F);
pub(crate) const STRIPE_FILL: Color = Color::RGB(0xF0F2F7);
pub(crate) const TOTAL_FILL: Color = Color::RGB(0xD9E6F0);
pub(crate) const LOW_FILL: Color = Color::RGB(0xFCDEDE);
pub(crate) const MEDIUM_FILL: Color = Color::RGB(0xFFF2CC);
pub(crate) const ZERO_FILL: Color = Color::RGB(0xEDEDED);
pub(crate) const INACTIVE_FONT: Color = Color::RGB(0xBF1A1A);

const MONEY_FORMAT: &str = "#,##0.00";
const INTEGER_FORMAT: &str = "#,##0";

/// Cell formats for one table row, derived from a fill and font colour.
pub(crate) struct RowFormats {
    pub text: Format,
    pub integer: Format,
    pub money: Format,
}

impl RowFormats {
    pub fn new(fill: Option<Color>, font: Option<Color>, bold: bool) -> Self {
        let mut base = Format::new().set_border(FormatBorder::Thin);
        if let Some(fill) = fill {
            base = base.set_background_color(fill);
        }
        if let Some(font) = font {
            base = base.set_font_color(font);
        }
        if bold {
            base = base.set_bold();
        }
        Self {
            text: base.clone(),
            integer: base.clone().set_num_format(INTEGER_FORMAT),
            money: base.set_num_format(MONEY_FORMAT),
        }
    }

    /// Plain row with every other index shaded.
    pub fn striped(index: usize) -> Self {
        Self::new((index % 2 == 1).then_some(STRIPE_FILL), None, false)
    }

    pub fn totals() -> Self {
        Self::new(Some(TOTAL_FILL), None, true)
    }
}

/// Workbook with document properties pinned to the report timestamp, so
/// the saved bytes do not depend on the wall clock.
pub(crate) fn new_workbook(title: &str, author: &str, at: NaiveDateTime) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let created = ExcelDateTime::from_ymd(at.year() as u16, at.month() as u8, at.day() as u8)?
        .and_hms(at.hour() as u16, at.minute() as u8, at.second() as u8)?;
    let properties = DocProperties::new()
        .set_title(title)
        .set_author(author)
        .set_creation_datetime(&created);
    workbook.set_properties(&properties);
    Ok(workbook)
}

/// Title, organization and `label: value` metadata rows above the table.
/// Returns the first free row.
pub(crate) fn write_header_block(
    sheet: &mut Worksheet,
    title: &str,
    organization: &str,
    generated_by: &str,
    generated_at: NaiveDateTime,
    details: &[(String, String)],
    last_col: u16,
) -> Result<u32> {
    let title_format = Format::new()
        .set_bold()
        .set_font_size(16)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    sheet.merge_range(0, 0, 0, last_col, title, &title_format)?;
    sheet.set_row_height(0, 26)?;

    let mut row = 1;
    if !organization.is_empty() {
        let org_format = Format::new()
            .set_italic()
            .set_align(FormatAlign::Center)
            .set_font_color(Color::RGB(0x595959));
        sheet.merge_range(row, 0, row, last_col, organization, &org_format)?;
        row += 1;
    }
    row += 1;

    let label_format = Format::new().set_bold();
    let mut meta: Vec<(String, String)> = details.to_vec();
    meta.push(("Generated".to_string(), format_datetime(generated_at)));
    meta.push(("Generated by".to_string(), generated_by.to_string()));
    for (label, value) in &meta {
        sheet.write_string_with_format(row, 0, label, &label_format)?;
        sheet.write_string(row, 1, value)?;
        row += 1;
    }

    Ok(row + 1)
}

pub(crate) fn write_column_headers(
    sheet: &mut Worksheet,
    row: u32,
    headers: &[&str],
) -> Result<()> {
    let format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(HEADER_FILL)
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center);
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, *header, &format)?;
    }
    Ok(())
}

pub(crate) fn set_column_widths(sheet: &mut Worksheet, widths: &[f64]) -> Result<()> {
    for (col, width) in widths.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }
    Ok(())
}

/// Split `"Label: value"` descriptions into metadata pairs.
pub(crate) fn detail_pairs(lines: &[String]) -> Vec<(String, String)> {
    lines
        .iter()
        .map(|line| match line.split_once(": ") {
            Some((label, value)) => (label.to_string(), value.to_string()),
            None => ("Filter".to_string(), line.clone()),
        })
        .collect()
}
