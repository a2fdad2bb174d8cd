use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

use super::rows::MedicineRow;
use crate::error::PharmacyError;

/// Largest `top_n` a fidelity request may ask for.
pub const MAX_TOP_N: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = PharmacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(PharmacyError::InvalidArgument {
                field: "order",
                value: s.to_string(),
            }),
        }
    }
}

/// Accepted sort keys for the fidelity report. Each maps to a fixed column
/// expression; nothing from the caller reaches the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FidelitySort {
    #[default]
    FullName,
    TotalSpent,
    SalesCount,
    LastSale,
}

impl FidelitySort {
    pub(crate) fn column(self) -> &'static str {
        match self {
            FidelitySort::FullName => "full_name COLLATE NOCASE",
            FidelitySort::TotalSpent => "total_cents",
            FidelitySort::SalesCount => "sales_count",
            FidelitySort::LastSale => "last_sale",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FidelitySort::FullName => "Name",
            FidelitySort::TotalSpent => "Total spent",
            FidelitySort::SalesCount => "Purchases",
            FidelitySort::LastSale => "Last purchase",
        }
    }
}

impl FromStr for FidelitySort {
    type Err = PharmacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "name" | "full-name" | "fullname" => Ok(FidelitySort::FullName),
            "total" | "total-spent" | "totalspent" => Ok(FidelitySort::TotalSpent),
            "count" | "sales-count" | "salescount" | "purchases" => Ok(FidelitySort::SalesCount),
            "last-sale" | "lastsale" | "last" => Ok(FidelitySort::LastSale),
            _ => Err(PharmacyError::InvalidArgument {
                field: "sort",
                value: s.to_string(),
            }),
        }
    }
}

/// Parameters of the client fidelity report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FidelityFilter {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub min_total: Decimal,
    pub top_n: Option<u32>,
    pub sort: FidelitySort,
    pub order: SortOrder,
}

impl FidelityFilter {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            min_total: Decimal::ZERO,
            top_n: None,
            sort: FidelitySort::default(),
            order: SortOrder::default(),
        }
    }

    pub fn is_top_n(&self) -> bool {
        matches!(self.top_n, Some(n) if n > 0)
    }

    /// Sort actually applied: a top-N request always ranks by total spent,
    /// highest first, whatever was asked for.
    pub fn effective_sort(&self) -> (FidelitySort, SortOrder) {
        if self.is_top_n() {
            (FidelitySort::TotalSpent, SortOrder::Desc)
        } else {
            (self.sort, self.order)
        }
    }

    pub fn row_limit(&self, default_limit: u32) -> u32 {
        match self.top_n {
            Some(n) if n > 0 => n,
            _ => default_limit,
        }
    }

    /// Every rule the filter breaks, as messages fit for display. An empty
    /// list means the filter may be queried.
    pub fn validate(&self, today: NaiveDate, max_span_days: i64) -> Vec<String> {
        let mut errors = Vec::new();

        if self.start_date > self.end_date {
            errors.push("Start date must be on or before the end date".to_string());
        }
        if self.end_date > today {
            errors.push("End date cannot be in the future".to_string());
        }
        if (self.end_date - self.start_date).num_days() > max_span_days {
            errors.push(format!("Report period cannot exceed {max_span_days} days"));
        }
        if self.min_total < Decimal::ZERO {
            errors.push("Minimum total must be zero or greater".to_string());
        }
        if let Some(n) = self.top_n {
            if n == 0 || n > MAX_TOP_N {
                errors.push(format!("Top N must be between 1 and {MAX_TOP_N}"));
            }
        }

        errors
    }

    pub fn period(&self) -> String {
        format!(
            "{} to {}",
            self.start_date.format("%d/%m/%Y"),
            self.end_date.format("%d/%m/%Y")
        )
    }

    /// Header lines describing the filter: period first, then the minimum
    /// total and the top-N cap when set.
    pub fn describe(&self, currency_symbol: &str) -> Vec<String> {
        let mut parts = vec![format!("Period: {}", self.period())];
        if self.min_total > Decimal::ZERO {
            parts.push(format!("Minimum total: {currency_symbol} {:.2}", self.min_total));
        }
        if let Some(n) = self.top_n.filter(|n| *n > 0) {
            parts.push(format!("Top {n} by total spent"));
        }
        parts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum InventorySort {
    CategoryName,
    #[default]
    MedicineName,
    StockTotal,
    UnitPrice,
    TotalValue,
}

impl InventorySort {
    pub(crate) fn column(self) -> &'static str {
        match self {
            InventorySort::CategoryName => "c.name COLLATE NOCASE",
            InventorySort::MedicineName => "m.name COLLATE NOCASE",
            InventorySort::StockTotal => "m.stock_total",
            InventorySort::UnitPrice => "m.unit_price_cents",
            InventorySort::TotalValue => "(m.stock_total * m.unit_price_cents)",
        }
    }
}

impl FromStr for InventorySort {
    type Err = PharmacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "category" | "category-name" => Ok(InventorySort::CategoryName),
            "name" | "medicine" | "medicine-name" => Ok(InventorySort::MedicineName),
            "stock" | "stock-total" => Ok(InventorySort::StockTotal),
            "price" | "unit-price" => Ok(InventorySort::UnitPrice),
            "value" | "total-value" => Ok(InventorySort::TotalValue),
            _ => Err(PharmacyError::InvalidArgument {
                field: "sort",
                value: s.to_string(),
            }),
        }
    }
}

/// Parameters of the medicines-by-category inventory report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryFilter {
    pub category_id: Option<i64>,
    pub only_low_stock: bool,
    pub low_stock_threshold: i64,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: InventorySort,
    pub order: SortOrder,
}

impl Default for InventoryFilter {
    fn default() -> Self {
        Self {
            category_id: None,
            only_low_stock: false,
            low_stock_threshold: 10,
            min_price: None,
            max_price: None,
            sort: InventorySort::default(),
            order: SortOrder::default(),
        }
    }
}

impl InventoryFilter {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.low_stock_threshold < 0 {
            errors.push("Low-stock threshold must be zero or greater".to_string());
        }
        for (label, price) in [("Minimum", self.min_price), ("Maximum", self.max_price)] {
            if let Some(p) = price {
                if p < Decimal::ZERO {
                    errors.push(format!("{label} price must be zero or greater"));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                errors.push("Minimum price cannot exceed the maximum price".to_string());
            }
        }

        errors
    }

    /// Short description of the active conditions, for report headers.
    pub fn describe(&self, currency_symbol: &str) -> Vec<String> {
        let mut parts = Vec::new();
        if self.only_low_stock {
            parts.push(format!("Low stock (<= {})", self.low_stock_threshold));
        }
        if let Some(min) = self.min_price {
            parts.push(format!("Min price: {currency_symbol} {min:.2}"));
        }
        if let Some(max) = self.max_price {
            parts.push(format!("Max price: {currency_symbol} {max:.2}"));
        }
        parts
    }

    /// Header lines shared by both inventory renderers: the category shown
    /// by name when the rows carry it, then [`Self::describe`].
    pub fn header_details(&self, currency_symbol: &str, rows: &[MedicineRow]) -> Vec<String> {
        let category = match (self.category_id, rows.first()) {
            (None, _) => "All".to_string(),
            (Some(_), Some(row)) => row.category_name.clone(),
            (Some(id), None) => format!("#{id}"),
        };
        let mut details = vec![format!("Category: {category}")];
        details.extend(self.describe(currency_symbol));
        details
    }
}
