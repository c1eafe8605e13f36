//! Milestone operations

use super::projects::require_project;
use super::sqlite::{enum_column, ensure_user_in_org, now, Store};
use super::team::ensure_member;
use crate::model::{Milestone, MilestoneStatus, NewMilestone, Project, UpdateMilestone};
use crate::{Error, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

const MILESTONE_COLUMNS: &str = "id, project_id, name, description, due_date, status, completion_date, created_by, created_at, updated_at";

fn row_to_milestone(row: &rusqlite::Row) -> rusqlite::Result<Milestone> {
    Ok(Milestone {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        due_date: row.get(4)?,
        status: enum_column(row, 5)?,
        completion_date: row.get(6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub(crate) fn require_milestone(conn: &Connection, id: i64) -> Result<Milestone> {
    conn.query_row(
        &format!("SELECT {} FROM milestones WHERE id = ?1", MILESTONE_COLUMNS),
        [id],
        row_to_milestone,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("Milestone", id))
}

/// Reject a due date outside the project's start/end range
pub(crate) fn ensure_due_in_project(project: &Project, due: Option<NaiveDate>) -> Result<()> {
    match due {
        Some(date) if !project.covers_date(date) => Err(Error::Validation(format!(
            "due date {} is outside project '{}' dates",
            date, project.name
        ))),
        _ => Ok(()),
    }
}

fn completion_for(status: MilestoneStatus) -> Option<NaiveDate> {
    (status == MilestoneStatus::Completed).then(|| now().date_naive())
}

impl Store {
    pub fn create_milestone(&self, input: &NewMilestone) -> Result<Milestone> {
        if input.name.trim().is_empty() {
            return Err(Error::Validation("milestone name is required".into()));
        }
        let project = require_project(&self.conn, input.project_id)?;
        ensure_user_in_org(&self.conn, "Milestone creator", input.created_by, project.organization_id)?;
        ensure_due_in_project(&project, input.due_date)?;

        let ts = now();
        self.conn.execute(
            r#"
            INSERT INTO milestones (project_id, name, description, due_date, status, completion_date,
                                    created_by, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
            params![
                input.project_id,
                input.name,
                input.description,
                input.due_date,
                input.status.as_str(),
                completion_for(input.status),
                input.created_by,
                ts,
            ],
        )?;
        self.get_milestone(self.conn.last_insert_rowid())
    }

    pub fn get_milestone(&self, id: i64) -> Result<Milestone> {
        require_milestone(&self.conn, id)
    }

    /// Milestones of a project ordered by due date, undated last
    pub fn list_project_milestones(&self, project_id: i64) -> Result<Vec<Milestone>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM milestones WHERE project_id = ?1 ORDER BY due_date IS NULL, due_date, id",
            MILESTONE_COLUMNS
        ))?;
        let milestones = stmt
            .query_map([project_id], row_to_milestone)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(milestones)
    }

    /// Entering `completed` stamps today's completion date; any other
    /// status clears it
    pub fn update_milestone(&self, id: i64, input: &UpdateMilestone) -> Result<Milestone> {
        let current = self.get_milestone(id)?;
        let name = input.name.clone().unwrap_or(current.name);
        if name.trim().is_empty() {
            return Err(Error::Validation("milestone name is required".into()));
        }
        let description = input.description.clone().unwrap_or(current.description);
        let due_date = input.due_date.unwrap_or(current.due_date);
        if input.due_date.is_some() {
            let project = require_project(&self.conn, current.project_id)?;
            ensure_due_in_project(&project, due_date)?;
        }
        let status = input.status.unwrap_or(current.status);
        let completion_date = match input.status {
            Some(next) if next != current.status => completion_for(next),
            _ => current.completion_date,
        };

        self.conn.execute(
            r#"
            UPDATE milestones SET name = ?1, description = ?2, due_date = ?3, status = ?4,
                                  completion_date = ?5, updated_at = ?6
            WHERE id = ?7
            "#,
            params![name, description, due_date, status.as_str(), completion_date, now(), id],
        )?;
        self.get_milestone(id)
    }

    /// Hand every unassigned task of a milestone to one user and tell them
    /// by message. Tasks that already have an assignee keep it.
    ///
    /// The assignee joins the project team unless the project is closed.
    /// Returns the number of tasks assigned.
    pub fn assign_milestone_to_user(&mut self, milestone_id: i64, user_id: i64, assigned_by: i64) -> Result<usize> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let milestone = require_milestone(&tx, milestone_id)?;
        let project = require_project(&tx, milestone.project_id)?;
        ensure_user_in_org(&tx, "Milestone assignee", user_id, project.organization_id)?;
        ensure_user_in_org(&tx, "Milestone assigner", assigned_by, project.organization_id)?;

        let ts = now();
        let assigned = tx.execute(
            "UPDATE tasks SET assigned_to = ?1, updated_at = ?2 WHERE milestone_id = ?3 AND assigned_to IS NULL",
            params![user_id, ts, milestone_id],
        )?;
        if !project.status.is_terminal() && ensure_member(&tx, project.id, user_id)? {
            tracing::debug!("Added assignee {} to project {} team", user_id, project.id);
        }
        tx.execute(
            r#"
            INSERT INTO messages (sender_id, recipient_id, project_id, subject, content, created_at)
            VALUES (?1, ?2, ?3, 'Milestone Assigned', ?4, ?5)
            "#,
            params![
                assigned_by,
                user_id,
                project.id,
                format!(
                    "You have been assigned to milestone '{}' in project '{}' ({} tasks).",
                    milestone.name, project.name, assigned
                ),
                ts,
            ],
        )?;
        tx.commit()?;

        tracing::info!(
            "Assigned milestone {} ({} tasks) to user {}",
            milestone_id,
            assigned,
            user_id
        );
        Ok(assigned)
    }

    /// Delete a milestone; its tasks stay with `milestone_id` cleared
    pub fn delete_milestone(&self, id: i64) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM milestones WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(Error::not_found("Milestone", id));
        }
        tracing::debug!("Deleted milestone {}", id);
        Ok(())
    }
}
