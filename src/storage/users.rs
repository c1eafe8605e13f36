//! User operations

use super::sqlite::{enum_column, ensure_user_in_org, now, Store};
use crate::model::{NewUser, UpdateUser, User, UserRole};
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

pub(crate) const USER_COLUMNS: &str = "id, organization_id, full_name, email, password, phone, role, is_active, avatar_url, created_at, updated_at";

pub(crate) fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        phone: row.get(5)?,
        role: enum_column(row, 6)?,
        is_active: row.get(7)?,
        avatar_url: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

pub(crate) fn fetch_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        [id],
        row_to_user,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn require_user(conn: &Connection, id: i64) -> Result<User> {
    fetch_user(conn, id)?.ok_or_else(|| Error::not_found("User", id))
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(Error::Validation(format!("invalid email address: {}", email))),
    }
}

impl Store {
    /// Create a user. Emails are unique across all organizations.
    pub fn create_user(&self, input: &NewUser) -> Result<User> {
        if input.full_name.trim().is_empty() {
            return Err(Error::Validation("full name is required".into()));
        }
        let email = normalize_email(&input.email)?;
        let ts = now();
        self.conn.execute(
            r#"
            INSERT INTO users (organization_id, full_name, email, password, phone, role, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
            params![
                input.organization_id,
                input.full_name,
                email,
                input.password_hash,
                input.phone,
                input.role.as_str(),
                ts,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!("Created user {} ({}) as {}", email, id, input.role);
        self.get_user(id)
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        require_user(&self.conn, id)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                [email.trim().to_lowercase()],
                row_to_user,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_organization_users(&self, organization_id: i64) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM users WHERE organization_id = ?1 ORDER BY full_name",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map([organization_id], row_to_user)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(users)
    }

    /// Update profile fields and role.
    ///
    /// Demoting to `member` fails with `Error::Validation` while the user is
    /// still the assigned manager of a project.
    pub fn update_user(&mut self, id: i64, input: &UpdateUser) -> Result<User> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = require_user(&tx, id)?;
        let email = match &input.email {
            Some(email) => normalize_email(email)?,
            None => current.email,
        };
        let role = input.role.unwrap_or(current.role);
        if role == UserRole::Member && current.role != UserRole::Member {
            let managed: i64 = tx.query_row(
                "SELECT COUNT(*) FROM projects WHERE assigned_manager_id = ?1",
                [id],
                |row| row.get(0),
            )?;
            if managed > 0 {
                return Err(Error::Validation(format!(
                    "user {} still manages {} project(s); reassign them before changing role to member",
                    id, managed
                )));
            }
        }

        tx.execute(
            r#"
            UPDATE users SET full_name = ?1, email = ?2, phone = ?3, role = ?4, avatar_url = ?5, updated_at = ?6
            WHERE id = ?7
            "#,
            params![
                input.full_name.clone().unwrap_or(current.full_name),
                email,
                input.phone.clone().unwrap_or(current.phone),
                role.as_str(),
                input.avatar_url.clone().unwrap_or(current.avatar_url),
                now(),
                id,
            ],
        )?;
        let user = require_user(&tx, id)?;
        tx.commit()?;
        Ok(user)
    }

    pub fn set_user_password(&self, id: i64, password_hash: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE users SET password = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, now(), id],
        )?;
        if changed == 0 {
            return Err(Error::not_found("User", id));
        }
        Ok(())
    }

    pub fn set_user_active(&self, id: i64, is_active: bool) -> Result<User> {
        let changed = self.conn.execute(
            "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![is_active, now(), id],
        )?;
        if changed == 0 {
            return Err(Error::not_found("User", id));
        }
        self.get_user(id)
    }

    /// Delete a user.
    ///
    /// Messages, comments, memberships and created projects go with the user;
    /// assignments are nullified. Fails with `Error::ForeignKey` while the
    /// user still authors tasks or milestones outside those projects; move
    /// them first with [`Store::reassign_authored_work`].
    pub fn delete_user(&self, id: i64) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(Error::not_found("User", id));
        }
        tracing::info!("Deleted user {}", id);
        Ok(())
    }

    /// Move authorship of all tasks and milestones from one user to another
    /// in the same organization. Returns `(tasks, milestones)` moved.
    pub fn reassign_authored_work(&mut self, from_user: i64, to_user: i64) -> Result<(usize, usize)> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let source = require_user(&tx, from_user)?;
        ensure_user_in_org(&tx, "User", to_user, source.organization_id)?;

        let tasks = tx.execute(
            "UPDATE tasks SET created_by = ?1, updated_at = ?2 WHERE created_by = ?3",
            params![to_user, now(), from_user],
        )?;
        let milestones = tx.execute(
            "UPDATE milestones SET created_by = ?1, updated_at = ?2 WHERE created_by = ?3",
            params![to_user, now(), from_user],
        )?;
        tx.commit()?;

        tracing::info!(
            "Reassigned {} tasks and {} milestones from user {} to {}",
            tasks,
            milestones,
            from_user,
            to_user
        );
        Ok((tasks, milestones))
    }
}
