use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{Database, Lifecycle};
use crate::error::{PharmacyError, Result};
use crate::money;

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub medicine_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewMedicine {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub presentation: String,
    pub stock_total: i64,
    pub unit_price: Decimal,
    pub active: bool,
}

impl NewMedicine {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Medicine name is required".to_string());
        }
        if self.category.trim().is_empty() {
            errors.push("Category is required".to_string());
        }
        if self.presentation.trim().is_empty() {
            errors.push("Presentation is required".to_string());
        }
        if self.stock_total < 0 {
            errors.push("Stock must be zero or greater".to_string());
        }
        if self.unit_price < Decimal::ZERO {
            errors.push("Unit price must be zero or greater".to_string());
        }
        errors
    }
}

/// Medicines, with their categories and presentations created on demand.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    db: Database,
}

impl CatalogRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn add_medicine(&self, medicine: &NewMedicine) -> Result<i64> {
        let errors = medicine.validate();
        if !errors.is_empty() {
            return Err(PharmacyError::Validation(errors));
        }

        let unit_price_cents = money::to_cents(medicine.unit_price)?;

        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        let category_id = lookup_or_insert(&tx, "categories", medicine.category.trim())?;
        let presentation_id =
            lookup_or_insert(&tx, "presentations", medicine.presentation.trim())?;
        tx.execute(
            "INSERT INTO medicines
                (name, description, category_id, presentation_id,
                 stock_total, unit_price_cents, active, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                medicine.name.trim(),
                medicine.description.as_deref().map(str::trim),
                category_id,
                presentation_id,
                medicine.stock_total,
                unit_price_cents,
                medicine.active as i64,
                Lifecycle::Active.flag()
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        log::info!("added medicine {id} to category {category_id}");
        Ok(id)
    }

    pub fn categories(&self) -> Result<Vec<Category>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, COUNT(m.id)
             FROM categories c
             LEFT JOIN medicines m ON m.category_id = c.id AND m.is_deleted = 0
             WHERE c.is_deleted = 0
             GROUP BY c.id, c.name
             ORDER BY c.name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                medicine_count: row.get(2)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Case-insensitive lookup of an active category by name.
    pub fn find_category(&self, name: &str) -> Result<Option<Category>> {
        Ok(self
            .categories()?
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim())))
    }

    pub fn medicine_count(&self) -> Result<i64> {
        let conn = self.db.connect()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM medicines WHERE is_deleted = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// `table` is one of the two fixed lookup tables above; never caller input.
fn lookup_or_insert(conn: &Connection, table: &'static str, name: &str) -> Result<i64> {
    let existing: Option<(i64, i64)> = conn
        .query_row(
            &format!("SELECT id, is_deleted FROM {table} WHERE name = ?1"),
            params![name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match existing {
        Some((id, deleted)) => {
            if Lifecycle::from_flag(deleted) == Lifecycle::Deleted {
                conn.execute(
                    &format!("UPDATE {table} SET is_deleted = 0 WHERE id = ?1"),
                    params![id],
                )?;
            }
            Ok(id)
        }
        None => {
            conn.execute(
                &format!("INSERT INTO {table} (name, is_deleted) VALUES (?1, 0)"),
                params![name],
            )?;
            Ok(conn.last_insert_rowid())
        }
    }
}
