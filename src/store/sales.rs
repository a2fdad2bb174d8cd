use chrono::NaiveDateTime;
use rusqlite::params;
use rust_decimal::Decimal;

use super::clients::find_active;
use super::{format_timestamp, Database, Lifecycle};
use crate::error::{PharmacyError, Result};
use crate::money;

#[derive(Debug, Clone)]
pub struct SaleRepository {
    db: Database,
}

impl SaleRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a sale for an active client. Returns the new sale id.
    pub fn record(
        &self,
        client_id: i32,
        total_amount: Decimal,
        sale_date: NaiveDateTime,
    ) -> Result<i64> {
        if total_amount < Decimal::ZERO {
            return Err(PharmacyError::Validation(vec![
                "Sale amount must be zero or greater".to_string(),
            ]));
        }

        let total_cents = money::to_cents(total_amount)?;

        let conn = self.db.connect()?;
        if find_active(&conn, client_id)?.is_none() {
            return Err(PharmacyError::NotFound { entity: "Client" });
        }

        conn.execute(
            "INSERT INTO sales (client_id, total_cents, sale_date, is_deleted)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                client_id,
                total_cents,
                format_timestamp(sale_date),
                Lifecycle::Active.flag()
            ],
        )?;
        let id = conn.last_insert_rowid();
        log::debug!("recorded sale {id} for client {client_id}: {total_cents}c");
        Ok(id)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.db.connect()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM sales WHERE is_deleted = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
