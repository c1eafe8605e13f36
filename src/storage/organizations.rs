//! Organization operations

use super::sqlite::{now, Store};
use crate::model::{NewOrganization, Organization, UpdateOrganization};
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};

const ORGANIZATION_COLUMNS: &str = "id, name, description, created_at, updated_at";

fn row_to_organization(row: &rusqlite::Row) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub(crate) fn fetch_organization(conn: &Connection, id: i64) -> Result<Option<Organization>> {
    conn.query_row(
        &format!("SELECT {} FROM organizations WHERE id = ?1", ORGANIZATION_COLUMNS),
        [id],
        row_to_organization,
    )
    .optional()
    .map_err(Into::into)
}

impl Store {
    pub fn create_organization(&self, input: &NewOrganization) -> Result<Organization> {
        if input.name.trim().is_empty() {
            return Err(Error::Validation("organization name is required".into()));
        }
        let ts = now();
        self.conn.execute(
            "INSERT INTO organizations (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![input.name, input.description, ts],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!("Created organization {} ({})", input.name, id);
        self.get_organization(id)
    }

    pub fn get_organization(&self, id: i64) -> Result<Organization> {
        fetch_organization(&self.conn, id)?.ok_or_else(|| Error::not_found("Organization", id))
    }

    pub fn list_organizations(&self) -> Result<Vec<Organization>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM organizations ORDER BY name",
            ORGANIZATION_COLUMNS
        ))?;
        let orgs = stmt
            .query_map([], row_to_organization)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(orgs)
    }

    pub fn update_organization(&self, id: i64, input: &UpdateOrganization) -> Result<Organization> {
        let current = self.get_organization(id)?;
        let name = input.name.clone().unwrap_or(current.name);
        let description = input.description.clone().unwrap_or(current.description);
        self.conn.execute(
            "UPDATE organizations SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![name, description, now(), id],
        )?;
        self.get_organization(id)
    }

    /// Delete an organization and, by cascade, every row scoped to it
    pub fn delete_organization(&self, id: i64) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM organizations WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(Error::not_found("Organization", id));
        }
        tracing::info!("Deleted organization {} and all scoped data", id);
        Ok(())
    }
}
