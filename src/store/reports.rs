use chrono::NaiveDate;
use rusqlite::{params, Row};

use super::{parse_timestamp, Database};
use crate::error::Result;
use crate::money;
use crate::report::{ClientFidelityRow, FidelityFilter, InventoryFilter, MedicineRow};

/// Read-only aggregation queries behind the reports. Each call runs exactly
/// one statement on a fresh connection.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: Database,
}

fn day_start(date: NaiveDate) -> String {
    format!("{} 00:00:00", date.format("%Y-%m-%d"))
}

fn day_end(date: NaiveDate) -> String {
    format!("{} 23:59:59", date.format("%Y-%m-%d"))
}

fn map_fidelity(row: &Row<'_>) -> rusqlite::Result<ClientFidelityRow> {
    let sales_count: i64 = row.get(3)?;
    let total_spent = money::from_cents(row.get(4)?);
    let last_sale: Option<String> = row.get(5)?;
    Ok(ClientFidelityRow {
        client_id: row.get(0)?,
        full_name: row.get(1)?,
        nit: row.get(2)?,
        sales_count,
        total_spent,
        avg_ticket: money::average(total_spent, sales_count),
        last_sale: last_sale
            .as_deref()
            .map(|raw| parse_timestamp(5, raw))
            .transpose()?,
    })
}

fn map_medicine(row: &Row<'_>) -> rusqlite::Result<MedicineRow> {
    let active: i64 = row.get(8)?;
    Ok(MedicineRow {
        category_id: row.get(0)?,
        category_name: row.get(1)?,
        medicine_id: row.get(2)?,
        medicine_name: row.get(3)?,
        description: row.get(4)?,
        presentation_name: row.get(5)?,
        stock_total: row.get(6)?,
        unit_price: money::from_cents(row.get(7)?),
        active: active != 0,
    })
}

impl ReportRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Purchases per active client between the filter's dates, inclusive of
    /// the whole end day. Clients without sales in the window appear with
    /// zero totals as long as they pass `min_total`.
    pub fn client_fidelity(
        &self,
        filter: &FidelityFilter,
        limit: u32,
    ) -> Result<Vec<ClientFidelityRow>> {
        let min_cents = money::to_cents(filter.min_total)?;
        let (sort, order) = filter.effective_sort();
        let sql = format!(
            "SELECT c.id,
                    TRIM(c.first_name || ' ' || c.last_name) AS full_name,
                    c.nit,
                    COUNT(s.id) AS sales_count,
                    COALESCE(SUM(s.total_cents), 0) AS total_cents,
                    MAX(s.sale_date) AS last_sale
             FROM clients c
             LEFT JOIN sales s
                    ON s.client_id = c.id
                   AND s.is_deleted = 0
                   AND s.sale_date BETWEEN ?1 AND ?2
             WHERE c.is_deleted = 0
             GROUP BY c.id, c.first_name, c.last_name, c.nit
             HAVING total_cents >= ?3
             ORDER BY {} {}, c.id ASC
             LIMIT ?4",
            sort.column(),
            order.sql()
        );
        log::debug!(
            "fidelity query: {} .. {}, min {min_cents}c, limit {limit}, sort {sort:?} {order:?}",
            filter.start_date,
            filter.end_date
        );

        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                day_start(filter.start_date),
                day_end(filter.end_date),
                min_cents,
                limit
            ],
            map_fidelity,
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Non-deleted medicines, ordered by category and then the filter's sort.
    pub fn medicines_by_category(&self, filter: &InventoryFilter) -> Result<Vec<MedicineRow>> {
        let sql = format!(
            "SELECT c.id, c.name, m.id, m.name, m.description, p.name,
                    m.stock_total, m.unit_price_cents, m.active
             FROM medicines m
             JOIN categories c ON c.id = m.category_id AND c.is_deleted = 0
             JOIN presentations p ON p.id = m.presentation_id
             WHERE m.is_deleted = 0
               AND (?1 IS NULL OR c.id = ?1)
               AND (?2 = 0 OR m.stock_total <= ?3)
               AND (?4 IS NULL OR m.unit_price_cents >= ?4)
               AND (?5 IS NULL OR m.unit_price_cents <= ?5)
             ORDER BY c.name COLLATE NOCASE ASC, c.id ASC, {} {}, m.id ASC",
            filter.sort.column(),
            filter.order.sql()
        );
        let min_cents = filter.min_price.map(money::to_cents).transpose()?;
        let max_cents = filter.max_price.map(money::to_cents).transpose()?;
        log::debug!("inventory query: {filter:?}");

        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                filter.category_id,
                filter.only_low_stock as i64,
                filter.low_stock_threshold,
                min_cents,
                max_cents
            ],
            map_medicine,
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}
