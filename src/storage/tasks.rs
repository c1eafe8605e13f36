//! Task and task comment operations

use super::milestones::{ensure_due_in_project, require_milestone};
use super::projects::require_project;
use super::sqlite::{enum_column, ensure_user_in_org, now, Store};
use super::team::ensure_member;
use crate::model::{NewTask, Project, Task, TaskComment, TaskStatus, UpdateTask};
use crate::{Error, Result};
use chrono::{Days, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

const TASK_COLUMNS: &str = "t.id, t.project_id, t.milestone_id, t.title, t.description, t.status, t.priority, t.assigned_to, t.due_date, t.completion_date, t.created_by, t.created_at, t.updated_at";

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        milestone_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: enum_column(row, 5)?,
        priority: enum_column(row, 6)?,
        assigned_to: row.get(7)?,
        due_date: row.get(8)?,
        completion_date: row.get(9)?,
        created_by: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<TaskComment> {
    Ok(TaskComment {
        id: row.get(0)?,
        task_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) fn require_task(conn: &Connection, id: i64) -> Result<Task> {
    conn.query_row(
        &format!("SELECT {} FROM tasks t WHERE t.id = ?1", TASK_COLUMNS),
        [id],
        row_to_task,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("Task", id))
}

fn ensure_milestone_in_project(conn: &Connection, milestone_id: i64, project: &Project) -> Result<()> {
    let milestone = require_milestone(conn, milestone_id)?;
    if milestone.project_id != project.id {
        return Err(Error::Validation(format!(
            "milestone {} belongs to project {}, not {}",
            milestone_id, milestone.project_id, project.id
        )));
    }
    Ok(())
}

fn completion_for(status: TaskStatus) -> Option<NaiveDate> {
    (status == TaskStatus::Completed).then(|| now().date_naive())
}

impl Store {
    /// Create a task.
    ///
    /// The assignee joins the project team as `member` in the same
    /// transaction, unless the project is completed.
    pub fn create_task(&mut self, input: &NewTask) -> Result<Task> {
        if input.title.trim().is_empty() {
            return Err(Error::Validation("task title is required".into()));
        }
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let project = require_project(&tx, input.project_id)?;
        ensure_user_in_org(&tx, "Task creator", input.created_by, project.organization_id)?;
        if let Some(assignee) = input.assigned_to {
            ensure_user_in_org(&tx, "Task assignee", assignee, project.organization_id)?;
        }
        if let Some(milestone) = input.milestone_id {
            ensure_milestone_in_project(&tx, milestone, &project)?;
        }
        ensure_due_in_project(&project, input.due_date)?;

        let ts = now();
        tx.execute(
            r#"
            INSERT INTO tasks (project_id, milestone_id, title, description, status, priority, assigned_to,
                               due_date, completion_date, created_by, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            "#,
            params![
                input.project_id,
                input.milestone_id,
                input.title,
                input.description,
                input.status.as_str(),
                input.priority.as_str(),
                input.assigned_to,
                input.due_date,
                completion_for(input.status),
                input.created_by,
                ts,
            ],
        )?;
        let id = tx.last_insert_rowid();

        if let Some(assignee) = input.assigned_to {
            if !project.status.is_terminal() && ensure_member(&tx, project.id, assignee)? {
                tracing::debug!("Added assignee {} to project {} team", assignee, project.id);
            }
        }
        let task = require_task(&tx, id)?;
        tx.commit()?;
        Ok(task)
    }

    pub fn get_task(&self, id: i64) -> Result<Task> {
        require_task(&self.conn, id)
    }

    pub fn list_project_tasks(&self, project_id: i64) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tasks t WHERE t.project_id = ?1 ORDER BY t.created_at DESC, t.id DESC",
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map([project_id], row_to_task)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(tasks)
    }

    /// Tasks assigned to a user, soonest due first
    pub fn list_assigned_tasks(&self, user_id: i64) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tasks t WHERE t.assigned_to = ?1 ORDER BY t.due_date IS NULL, t.due_date, t.id",
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map([user_id], row_to_task)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(tasks)
    }

    /// Apply a partial update. Any status may follow any other; entering
    /// `completed` stamps today's completion date and leaving it clears it.
    pub fn update_task(&self, id: i64, input: &UpdateTask) -> Result<Task> {
        let current = self.get_task(id)?;
        if input.is_empty() {
            return Ok(current);
        }
        let project = require_project(&self.conn, current.project_id)?;

        let title = input.title.clone().unwrap_or_else(|| current.title.clone());
        if title.trim().is_empty() {
            return Err(Error::Validation("task title is required".into()));
        }
        let description = input.description.clone().unwrap_or_else(|| current.description.clone());
        let assigned_to = input.assigned_to.unwrap_or(current.assigned_to);
        if let Some(Some(assignee)) = input.assigned_to {
            ensure_user_in_org(&self.conn, "Task assignee", assignee, project.organization_id)?;
        }
        let milestone_id = input.milestone_id.unwrap_or(current.milestone_id);
        if let Some(Some(milestone)) = input.milestone_id {
            ensure_milestone_in_project(&self.conn, milestone, &project)?;
        }
        let due_date = input.due_date.unwrap_or(current.due_date);
        if input.due_date.is_some() {
            ensure_due_in_project(&project, due_date)?;
        }
        let status = input.status.unwrap_or(current.status);
        let completion_date = match input.status {
            Some(next) if next != current.status => completion_for(next),
            _ => current.completion_date,
        };
        let priority = input.priority.unwrap_or(current.priority);

        self.conn.execute(
            r#"
            UPDATE tasks SET title = ?1, description = ?2, status = ?3, priority = ?4, assigned_to = ?5,
                             due_date = ?6, milestone_id = ?7, completion_date = ?8, updated_at = ?9
            WHERE id = ?10
            "#,
            params![
                title,
                description,
                status.as_str(),
                priority.as_str(),
                assigned_to,
                due_date,
                milestone_id,
                completion_date,
                now(),
                id,
            ],
        )?;
        self.get_task(id)
    }

    /// Delete a task together with its comments and notifications
    pub fn delete_task(&self, id: i64) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(Error::not_found("Task", id));
        }
        tracing::debug!("Deleted task {}", id);
        Ok(())
    }

    /// Unfinished tasks of the organization due before `today`, oldest first
    pub fn overdue_tasks(&self, organization_id: i64, today: NaiveDate) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM tasks t JOIN projects p ON p.id = t.project_id
            WHERE p.organization_id = ?1 AND t.due_date < ?2 AND t.status != 'completed'
            ORDER BY t.due_date, t.id
            "#,
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map(params![organization_id, today], row_to_task)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(tasks)
    }

    /// Unfinished tasks due between `today` and `today + days`, inclusive
    pub fn tasks_due_within(&self, organization_id: i64, today: NaiveDate, days: u64) -> Result<Vec<Task>> {
        let until = today
            .checked_add_days(Days::new(days))
            .ok_or_else(|| Error::Validation(format!("due window of {} days is out of range", days)))?;
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM tasks t JOIN projects p ON p.id = t.project_id
            WHERE p.organization_id = ?1 AND t.due_date >= ?2 AND t.due_date <= ?3
              AND t.status != 'completed'
            ORDER BY t.due_date, t.id
            "#,
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map(params![organization_id, today, until], row_to_task)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(tasks)
    }

    pub fn add_task_comment(&self, task_id: i64, user_id: i64, content: &str) -> Result<TaskComment> {
        if content.trim().is_empty() {
            return Err(Error::Validation("comment content is required".into()));
        }
        let task = self.get_task(task_id)?;
        let project = require_project(&self.conn, task.project_id)?;
        ensure_user_in_org(&self.conn, "Comment author", user_id, project.organization_id)?;

        self.conn.execute(
            "INSERT INTO task_comments (task_id, user_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![task_id, user_id, content, now()],
        )?;
        let id = self.conn.last_insert_rowid();
        self.conn
            .query_row(
                "SELECT id, task_id, user_id, content, created_at FROM task_comments WHERE id = ?1",
                [id],
                row_to_comment,
            )
            .map_err(Into::into)
    }

    /// Comments on a task, oldest first
    pub fn list_task_comments(&self, task_id: i64) -> Result<Vec<TaskComment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, user_id, content, created_at FROM task_comments WHERE task_id = ?1 ORDER BY created_at, id",
        )?;
        let comments = stmt
            .query_map([task_id], row_to_comment)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(comments)
    }

    pub fn delete_task_comment(&self, id: i64) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM task_comments WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(Error::not_found("TaskComment", id));
        }
        Ok(())
    }
}
