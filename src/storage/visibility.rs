//! Project visibility: mode switching, explicit grants and the view check
//!
//! A viewer must belong to the project's organization. Admins see every
//! project there; otherwise `all` projects are open to the organization and
//! `specific` projects only to the creator, the assigned manager, team
//! members and grant holders.

use super::projects::{require_project, row_to_project, PROJECT_COLUMNS};
use super::sqlite::{ensure_user_in_org, now, Store};
use super::users::require_user;
use crate::model::{Project, ProjectVisibilityGrant, ProjectVisibilityMode, UserRole};
use crate::{Error, Result};
use rusqlite::{params, TransactionBehavior};
use std::collections::BTreeSet;

/// Row filter over `projects p`; binds `?1` viewer id and `?2` admin flag
const VISIBLE_TO_VIEWER: &str = r#"
    (?2 = 1
     OR p.visibility = 'all'
     OR p.created_by = ?1
     OR p.assigned_manager_id = ?1
     OR EXISTS (SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = ?1)
     OR EXISTS (SELECT 1 FROM project_visibility v WHERE v.project_id = p.id AND v.user_id = ?1))
"#;

fn row_to_grant(row: &rusqlite::Row) -> rusqlite::Result<ProjectVisibilityGrant> {
    Ok(ProjectVisibilityGrant {
        id: row.get(0)?,
        project_id: row.get(1)?,
        user_id: row.get(2)?,
    })
}

impl Store {
    /// Switch visibility mode and replace the grant list in one transaction.
    ///
    /// Grants are only kept for `specific` projects; switching to `all`
    /// clears them.
    pub fn set_project_visibility(
        &mut self,
        project_id: i64,
        mode: ProjectVisibilityMode,
        user_ids: &[i64],
    ) -> Result<Project> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let project = require_project(&tx, project_id)?;

        tx.execute(
            "UPDATE projects SET visibility = ?1, updated_at = ?2 WHERE id = ?3",
            params![mode.as_str(), now(), project_id],
        )?;
        tx.execute(
            "DELETE FROM project_visibility WHERE project_id = ?1",
            [project_id],
        )?;
        if mode == ProjectVisibilityMode::Specific {
            let grantees: BTreeSet<i64> = user_ids.iter().copied().collect();
            for user_id in grantees {
                ensure_user_in_org(&tx, "Visibility grant", user_id, project.organization_id)?;
                tx.execute(
                    "INSERT INTO project_visibility (project_id, user_id) VALUES (?1, ?2)",
                    [project_id, user_id],
                )?;
            }
        }
        let updated = require_project(&tx, project_id)?;
        tx.commit()?;

        tracing::info!("Project {} visibility set to {}", project_id, mode);
        Ok(updated)
    }

    /// Grant one user view access to a `specific` project. Duplicate grants
    /// fail with `Error::Unique`.
    pub fn grant_project_visibility(&self, project_id: i64, user_id: i64) -> Result<ProjectVisibilityGrant> {
        let project = require_project(&self.conn, project_id)?;
        if project.visibility != ProjectVisibilityMode::Specific {
            return Err(Error::Validation(format!(
                "project {} is visible to the whole organization; grants need visibility 'specific'",
                project_id
            )));
        }
        ensure_user_in_org(&self.conn, "Visibility grant", user_id, project.organization_id)?;
        self.conn.execute(
            "INSERT INTO project_visibility (project_id, user_id) VALUES (?1, ?2)",
            [project_id, user_id],
        )?;
        Ok(ProjectVisibilityGrant {
            id: self.conn.last_insert_rowid(),
            project_id,
            user_id,
        })
    }

    pub fn revoke_project_visibility(&self, project_id: i64, user_id: i64) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM project_visibility WHERE project_id = ?1 AND user_id = ?2",
            [project_id, user_id],
        )?;
        Ok(removed > 0)
    }

    pub fn list_visibility_grants(&self, project_id: i64) -> Result<Vec<ProjectVisibilityGrant>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, user_id FROM project_visibility WHERE project_id = ?1 ORDER BY id",
        )?;
        let grants = stmt
            .query_map([project_id], row_to_grant)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(grants)
    }

    /// Whether `user_id` may see the project
    pub fn can_view_project(&self, user_id: i64, project_id: i64) -> Result<bool> {
        let user = require_user(&self.conn, user_id)?;
        let project = require_project(&self.conn, project_id)?;
        if project.organization_id != user.organization_id {
            return Ok(false);
        }
        let visible: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM projects p WHERE p.id = ?3 AND {}",
                VISIBLE_TO_VIEWER
            ),
            params![user_id, user.role == UserRole::Admin, project_id],
            |row| row.get(0),
        )?;
        Ok(visible > 0)
    }

    /// Projects of the viewer's organization the viewer may see, newest first
    pub fn visible_projects(&self, user_id: i64) -> Result<Vec<Project>> {
        let user = require_user(&self.conn, user_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM projects p WHERE p.organization_id = ?3 AND {} ORDER BY p.created_at DESC, p.id DESC",
            PROJECT_COLUMNS, VISIBLE_TO_VIEWER
        ))?;
        let projects = stmt
            .query_map(
                params![user_id, user.role == UserRole::Admin, user.organization_id],
                row_to_project,
            )?
            .collect::<rusqlite::Result<_>>()?;
        Ok(projects)
    }
}
