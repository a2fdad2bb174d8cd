use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_timestamp, Database, Lifecycle};
use crate::client::{validate_client, Client, ClientInput, ClientUpdate};
use crate::error::{PharmacyError, Result};

const CLIENT_COLUMNS: &str =
    "id, first_name, last_name, nit, email, is_deleted, created_at, updated_at";

fn map_client(row: &Row<'_>) -> rusqlite::Result<Client> {
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(Client {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        nit: row.get(3)?,
        email: row.get(4)?,
        lifecycle: Lifecycle::from_flag(row.get(5)?),
        created_at: parse_timestamp(6, &created_at)?,
        updated_at: parse_timestamp(7, &updated_at)?,
    })
}

fn validated(input: &ClientInput) -> Result<ClientInput> {
    let input = input.normalized();
    let errors = validate_client(&input);
    if errors.is_empty() {
        Ok(input)
    } else {
        Err(PharmacyError::Validation(
            errors.iter().map(ToString::to_string).collect(),
        ))
    }
}

/// Client registry with soft delete. Deleted clients are invisible to
/// every read here.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    db: Database,
}

impl ClientRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, input: &ClientInput, now: NaiveDateTime) -> Result<Client> {
        let input = validated(input)?;
        let conn = self.db.connect()?;
        if let Some(nit) = input.nit.as_deref() {
            ensure_unique_nit(&conn, nit, None)?;
        }

        let stamp = format_timestamp(now);
        conn.execute(
            "INSERT INTO clients
                (first_name, last_name, nit, email, is_deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                &input.first_name,
                &input.last_name,
                &input.nit,
                &input.email,
                Lifecycle::Active.flag(),
                &stamp
            ],
        )?;
        let id = conn.last_insert_rowid() as i32;
        log::info!("created client {id}");

        find_active(&conn, id)?.ok_or(PharmacyError::NotFound { entity: "Client" })
    }

    pub fn get(&self, id: i32) -> Result<Option<Client>> {
        let conn = self.db.connect()?;
        find_active(&conn, id)
    }

    pub fn list(&self) -> Result<Vec<Client>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients
             WHERE is_deleted = 0
             ORDER BY last_name, first_name, id"
        ))?;
        let rows = stmt.query_map([], map_client)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.db.connect()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM clients WHERE is_deleted = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn update(&self, id: i32, update: &ClientUpdate, now: NaiveDateTime) -> Result<Client> {
        let conn = self.db.connect()?;
        let current =
            find_active(&conn, id)?.ok_or(PharmacyError::NotFound { entity: "Client" })?;

        let input = validated(&update.apply(&current.to_input()))?;
        if let Some(nit) = input.nit.as_deref() {
            ensure_unique_nit(&conn, nit, Some(id))?;
        }

        conn.execute(
            "UPDATE clients
             SET first_name = ?1, last_name = ?2, nit = ?3, email = ?4, updated_at = ?5
             WHERE id = ?6 AND is_deleted = 0",
            params![
                &input.first_name,
                &input.last_name,
                &input.nit,
                &input.email,
                format_timestamp(now),
                id
            ],
        )?;
        log::info!("updated client {id}");

        find_active(&conn, id)?.ok_or(PharmacyError::NotFound { entity: "Client" })
    }

    pub fn soft_delete(&self, id: i32, now: NaiveDateTime) -> Result<()> {
        let conn = self.db.connect()?;
        let changed = conn.execute(
            "UPDATE clients SET is_deleted = ?1, updated_at = ?2
             WHERE id = ?3 AND is_deleted = 0",
            params![Lifecycle::Deleted.flag(), format_timestamp(now), id],
        )?;
        if changed == 0 {
            return Err(PharmacyError::NotFound { entity: "Client" });
        }
        log::info!("soft-deleted client {id}");
        Ok(())
    }
}

pub(super) fn find_active(conn: &Connection, id: i32) -> Result<Option<Client>> {
    let client = conn
        .query_row(
            &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1 AND is_deleted = 0"),
            params![id],
            map_client,
        )
        .optional()?;
    Ok(client)
}

fn ensure_unique_nit(conn: &Connection, nit: &str, except: Option<i32>) -> Result<()> {
    let taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM clients
         WHERE nit = ?1 AND is_deleted = 0 AND (?2 IS NULL OR id <> ?2)",
        params![nit, except],
        |row| row.get(0),
    )?;
    if taken > 0 {
        return Err(PharmacyError::DuplicateNit(nit.to_string()));
    }
    Ok(())
}
