use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{PharmacyError, Result};
use crate::money;

/// Upper bound of the low stock band.
pub const LOW_STOCK_MAX: i64 = 10;
/// Upper bound of the medium stock band.
pub const MEDIUM_STOCK_MAX: i64 = 50;

/// One client's purchases within the report period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientFidelityRow {
    pub client_id: i32,
    pub full_name: String,
    pub nit: Option<String>,
    pub sales_count: i64,
    pub total_spent: Decimal,
    pub avg_ticket: Decimal,
    pub last_sale: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StockLevel {
    Low,
    Medium,
    High,
}

impl StockLevel {
    pub fn for_stock(stock: i64) -> Self {
        if stock <= LOW_STOCK_MAX {
            StockLevel::Low
        } else if stock <= MEDIUM_STOCK_MAX {
            StockLevel::Medium
        } else {
            StockLevel::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StockLevel::Low => "Low",
            StockLevel::Medium => "Medium",
            StockLevel::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicineRow {
    pub category_id: i64,
    pub category_name: String,
    pub medicine_id: i64,
    pub medicine_name: String,
    pub description: Option<String>,
    pub presentation_name: String,
    pub stock_total: i64,
    pub unit_price: Decimal,
    pub active: bool,
}

impl MedicineRow {
    pub fn total_value(&self) -> Decimal {
        Decimal::from(self.stock_total) * self.unit_price
    }

    pub fn stock_level(&self) -> StockLevel {
        StockLevel::for_stock(self.stock_total)
    }
}

/// Consecutive medicines of one category, as the inventory query orders them.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup<'a> {
    pub category_id: i64,
    pub category_name: &'a str,
    pub rows: &'a [MedicineRow],
}

impl CategoryGroup<'_> {
    pub fn total_stock(&self) -> i64 {
        self.rows.iter().map(|r| r.stock_total).sum()
    }

    pub fn total_value(&self) -> Decimal {
        self.rows.iter().map(MedicineRow::total_value).sum()
    }
}

/// Split rows into runs sharing a category. Rows are expected sorted by
/// category; a category appearing twice non-adjacently yields two groups.
pub fn group_by_category(rows: &[MedicineRow]) -> Vec<CategoryGroup<'_>> {
    rows.chunk_by(|a, b| a.category_id == b.category_id)
        .map(|chunk| CategoryGroup {
            category_id: chunk[0].category_id,
            category_name: &chunk[0].category_name,
            rows: chunk,
        })
        .collect()
}

/// Totals shown in the fidelity report footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FidelityTotals {
    pub clients: usize,
    pub sales_count: i64,
    pub total_spent: Decimal,
}

impl FidelityTotals {
    pub fn of(rows: &[ClientFidelityRow]) -> Self {
        Self {
            clients: rows.len(),
            sales_count: rows.iter().map(|r| r.sales_count).sum(),
            total_spent: rows.iter().map(|r| r.total_spent).sum(),
        }
    }

    pub fn avg_ticket(&self) -> Decimal {
        money::average(self.total_spent, self.sales_count)
    }
}

/// Rejects rows a renderer cannot display. Row numbers are 1-based.
pub fn check_fidelity_rows(rows: &[ClientFidelityRow]) -> Result<()> {
    for (i, row) in rows.iter().enumerate() {
        if row.full_name.trim().is_empty() {
            return Err(PharmacyError::MissingField {
                row: i + 1,
                field: "full_name",
            });
        }
    }
    Ok(())
}

pub fn check_medicine_rows(rows: &[MedicineRow]) -> Result<()> {
    for (i, row) in rows.iter().enumerate() {
        if row.medicine_name.trim().is_empty() {
            return Err(PharmacyError::MissingField {
                row: i + 1,
                field: "medicine_name",
            });
        }
        if row.category_name.trim().is_empty() {
            return Err(PharmacyError::MissingField {
                row: i + 1,
                field: "category_name",
            });
        }
    }
    Ok(())
}
