//! Project operations, including the status state machine.
//!
//! Entering `completed` removes every `project_members` row for the project
//! inside the same immediate transaction as the status update.

use super::sqlite::{enum_column, ensure_user_in_org, now, Store};
use super::users::require_user;
use crate::model::{
    NewProject, Project, ProjectStatus, StatusChange, UpdateProject, UserRole,
};
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

pub(crate) const PROJECT_COLUMNS: &str = "p.id, p.organization_id, p.name, p.description, p.status, p.visibility, p.start_date, p.end_date, p.created_by, p.assigned_manager_id, p.created_at, p.updated_at";

pub(crate) fn row_to_project(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status: enum_column(row, 4)?,
        visibility: enum_column(row, 5)?,
        start_date: row.get(6)?,
        end_date: row.get(7)?,
        created_by: row.get(8)?,
        assigned_manager_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub(crate) fn fetch_project(conn: &Connection, id: i64) -> Result<Option<Project>> {
    conn.query_row(
        &format!("SELECT {} FROM projects p WHERE p.id = ?1", PROJECT_COLUMNS),
        [id],
        row_to_project,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn require_project(conn: &Connection, id: i64) -> Result<Project> {
    fetch_project(conn, id)?.ok_or_else(|| Error::not_found("Project", id))
}

fn validate_dates(
    start: Option<chrono::NaiveDate>,
    end: Option<chrono::NaiveDate>,
) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(Error::Validation(format!(
                "project end date {} is before start date {}",
                end, start
            )));
        }
    }
    Ok(())
}

/// Reject a date range that would leave milestone or task due dates outside
/// the project. Ranges with an open end accept everything.
fn ensure_due_dates_fit(
    conn: &Connection,
    project_id: i64,
    start: Option<chrono::NaiveDate>,
    end: Option<chrono::NaiveDate>,
) -> Result<()> {
    let (Some(start), Some(end)) = (start, end) else {
        return Ok(());
    };
    let outside: i64 = conn.query_row(
        r#"
        SELECT (SELECT COUNT(*) FROM milestones
                WHERE project_id = ?1 AND (due_date < ?2 OR due_date > ?3))
             + (SELECT COUNT(*) FROM tasks
                WHERE project_id = ?1 AND (due_date < ?2 OR due_date > ?3))
        "#,
        params![project_id, start, end],
        |row| row.get(0),
    )?;
    if outside > 0 {
        return Err(Error::Validation(format!(
            "{} milestone or task due date(s) fall outside {} .. {}",
            outside, start, end
        )));
    }
    Ok(())
}

/// A project manager must be a manager or admin of the project's organization
fn ensure_manager_candidate(conn: &Connection, user_id: i64, organization_id: i64) -> Result<()> {
    ensure_user_in_org(conn, "Project manager", user_id, organization_id)?;
    let user = require_user(conn, user_id)?;
    if user.role == UserRole::Member {
        return Err(Error::Validation(format!(
            "user {} has role member and cannot manage a project",
            user_id
        )));
    }
    Ok(())
}

/// Apply a status change on an open transaction.
///
/// Returns the number of memberships removed by auto-unassignment. The
/// caller commits; any error leaves the transaction to roll back.
fn apply_status(conn: &Connection, project: &Project, next: ProjectStatus) -> Result<usize> {
    if !project.status.can_transition_to(next) {
        return Err(Error::InvalidTransition {
            project_id: project.id,
            from: project.status,
            to: next,
        });
    }
    if project.status == next {
        return Ok(0);
    }

    conn.execute(
        "UPDATE projects SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![next.as_str(), now(), project.id],
    )?;

    if next != ProjectStatus::Completed {
        return Ok(0);
    }
    let removed = conn.execute(
        "DELETE FROM project_members WHERE project_id = ?1",
        [project.id],
    )?;
    if removed > 0 {
        tracing::info!(
            "Auto-unassigned {} team members from completed project '{}' ({})",
            removed,
            project.name,
            project.id
        );
    }
    Ok(removed)
}

impl Store {
    /// Create a project. Creator and manager must belong to the project's
    /// organization.
    pub fn create_project(&self, input: &NewProject) -> Result<Project> {
        if input.name.trim().is_empty() {
            return Err(Error::Validation("project name is required".into()));
        }
        validate_dates(input.start_date, input.end_date)?;
        ensure_user_in_org(&self.conn, "Project creator", input.created_by, input.organization_id)?;
        if let Some(manager) = input.assigned_manager_id {
            ensure_manager_candidate(&self.conn, manager, input.organization_id)?;
        }

        let ts = now();
        self.conn.execute(
            r#"
            INSERT INTO projects (organization_id, name, description, status, visibility, start_date, end_date,
                                  created_by, assigned_manager_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            "#,
            params![
                input.organization_id,
                input.name,
                input.description,
                input.status.as_str(),
                input.visibility.as_str(),
                input.start_date,
                input.end_date,
                input.created_by,
                input.assigned_manager_id,
                ts,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!("Created project {} ({}) in organization {}", input.name, id, input.organization_id);
        self.get_project(id)
    }

    pub fn get_project(&self, id: i64) -> Result<Project> {
        require_project(&self.conn, id)
    }

    pub fn list_organization_projects(&self, organization_id: i64) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM projects p WHERE p.organization_id = ?1 ORDER BY p.created_at DESC, p.id DESC",
            PROJECT_COLUMNS
        ))?;
        let projects = stmt
            .query_map([organization_id], row_to_project)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(projects)
    }

    /// Update project fields; a status change goes through the state
    /// machine and commits together with the field changes. New dates must
    /// still cover every milestone and task due date.
    pub fn update_project(&mut self, id: i64, input: &UpdateProject) -> Result<Project> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = require_project(&tx, id)?;

        let name = input.name.clone().unwrap_or_else(|| current.name.clone());
        if name.trim().is_empty() {
            return Err(Error::Validation("project name is required".into()));
        }
        let description = input.description.clone().unwrap_or_else(|| current.description.clone());
        let start_date = input.start_date.unwrap_or(current.start_date);
        let end_date = input.end_date.unwrap_or(current.end_date);
        validate_dates(start_date, end_date)?;
        if start_date != current.start_date || end_date != current.end_date {
            ensure_due_dates_fit(&tx, id, start_date, end_date)?;
        }
        let manager = input.assigned_manager_id.unwrap_or(current.assigned_manager_id);
        if let Some(manager) = manager {
            if Some(manager) != current.assigned_manager_id {
                ensure_manager_candidate(&tx, manager, current.organization_id)?;
            }
        }

        tx.execute(
            r#"
            UPDATE projects SET name = ?1, description = ?2, start_date = ?3, end_date = ?4,
                                assigned_manager_id = ?5, updated_at = ?6
            WHERE id = ?7
            "#,
            params![name, description, start_date, end_date, manager, now(), id],
        )?;
        if let Some(next) = input.status {
            apply_status(&tx, &current, next)?;
        }
        let project = require_project(&tx, id)?;
        tx.commit()?;
        Ok(project)
    }

    /// Move a project to `next`, removing the whole team when it completes.
    ///
    /// Status update and membership cleanup share one transaction: a failed
    /// cleanup leaves the previous status in place.
    pub fn transition_project_status(&mut self, id: i64, next: ProjectStatus) -> Result<StatusChange> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = require_project(&tx, id)?;
        let unassigned = apply_status(&tx, &current, next)?;
        let project = require_project(&tx, id)?;
        tx.commit()?;

        tracing::info!("Project {} status {} -> {}", id, current.status, project.status);
        Ok(StatusChange {
            project,
            previous: current.status,
            unassigned,
        })
    }

    /// Set or clear the assigned manager
    pub fn assign_project_manager(&self, id: i64, manager: Option<i64>) -> Result<Project> {
        let project = self.get_project(id)?;
        if let Some(manager) = manager {
            ensure_manager_candidate(&self.conn, manager, project.organization_id)?;
        }
        self.conn.execute(
            "UPDATE projects SET assigned_manager_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![manager, now(), id],
        )?;
        self.get_project(id)
    }

    /// Hard delete; milestones, tasks, memberships and grants cascade while
    /// messages, reports and documents keep their rows with the project
    /// reference nulled.
    pub fn delete_project(&self, id: i64) -> Result<()> {
        let project = self.get_project(id)?;
        self.conn.execute("DELETE FROM projects WHERE id = ?1", [id])?;
        tracing::info!("Project '{}' ({}) deleted", project.name, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewOrganization, NewUser, ProjectRole};

    struct Fixture {
        store: Store,
        org: i64,
        admin: i64,
        manager: i64,
        member: i64,
    }

    fn fixture() -> Fixture {
        let store = Store::open_in_memory().unwrap();
        let org = store
            .create_organization(&NewOrganization::named("Acme"))
            .unwrap()
            .id;
        let admin = store
            .create_user(&NewUser::new(org, "Admin", "admin@acme.io", UserRole::Admin))
            .unwrap()
            .id;
        let manager = store
            .create_user(&NewUser::new(org, "Manager", "manager@acme.io", UserRole::Manager))
            .unwrap()
            .id;
        let member = store
            .create_user(&NewUser::new(org, "Member", "member@acme.io", UserRole::Member))
            .unwrap()
            .id;
        Fixture { store, org, admin, manager, member }
    }

    #[test]
    fn test_create_project_defaults() {
        let f = fixture();
        let project = f
            .store
            .create_project(&NewProject::new(f.org, "Website", f.admin))
            .unwrap();
        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(project.visibility, crate::model::ProjectVisibilityMode::All);
        assert_eq!(project.created_by, f.admin);
    }

    #[test]
    fn test_creator_from_other_org_rejected() {
        let f = fixture();
        let other = f
            .store
            .create_organization(&NewOrganization::named("Globex"))
            .unwrap()
            .id;
        let err = f
            .store
            .create_project(&NewProject::new(other, "Spy", f.admin))
            .unwrap_err();
        assert!(matches!(err, Error::OrganizationMismatch { .. }));
        assert_eq!(f.store.count_rows("projects").unwrap(), 0);
    }

    #[test]
    fn test_member_cannot_be_assigned_manager() {
        let f = fixture();
        let mut input = NewProject::new(f.org, "Website", f.admin);
        input.assigned_manager_id = Some(f.member);
        assert!(matches!(
            f.store.create_project(&input),
            Err(Error::Validation(_))
        ));

        input.assigned_manager_id = Some(f.manager);
        let project = f.store.create_project(&input).unwrap();
        assert_eq!(project.assigned_manager_id, Some(f.manager));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let f = fixture();
        let mut input = NewProject::new(f.org, "Website", f.admin);
        input.start_date = chrono::NaiveDate::from_ymd_opt(2025, 6, 1);
        input.end_date = chrono::NaiveDate::from_ymd_opt(2025, 1, 1);
        assert!(matches!(
            f.store.create_project(&input),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_completion_unassigns_whole_team() {
        let mut f = fixture();
        let project = f
            .store
            .create_project(&NewProject::new(f.org, "Website", f.admin))
            .unwrap();
        f.store
            .add_project_member(project.id, f.manager, ProjectRole::Manager)
            .unwrap();
        f.store
            .add_project_member(project.id, f.member, ProjectRole::Member)
            .unwrap();

        f.store
            .transition_project_status(project.id, ProjectStatus::Active)
            .unwrap();
        assert_eq!(f.store.list_project_members(project.id).unwrap().len(), 2);

        let change = f
            .store
            .transition_project_status(project.id, ProjectStatus::Completed)
            .unwrap();
        assert_eq!(change.previous, ProjectStatus::Active);
        assert_eq!(change.project.status, ProjectStatus::Completed);
        assert_eq!(change.unassigned, 2);
        assert!(f.store.list_project_members(project.id).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_transition_writes_nothing() {
        let mut f = fixture();
        let project = f
            .store
            .create_project(&NewProject::new(f.org, "Website", f.admin))
            .unwrap();
        f.store
            .transition_project_status(project.id, ProjectStatus::Active)
            .unwrap();

        let err = f
            .store
            .transition_project_status(project.id, ProjectStatus::Planning)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(f.store.get_project(project.id).unwrap().status, ProjectStatus::Active);
    }

    #[test]
    fn test_completed_is_terminal() {
        let mut f = fixture();
        let project = f
            .store
            .create_project(&NewProject::new(f.org, "Website", f.admin))
            .unwrap();
        f.store
            .transition_project_status(project.id, ProjectStatus::Completed)
            .unwrap();
        for next in [ProjectStatus::Active, ProjectStatus::OnHold, ProjectStatus::Planning] {
            assert!(matches!(
                f.store.transition_project_status(project.id, next),
                Err(Error::InvalidTransition { .. })
            ));
        }
        let again = f
            .store
            .transition_project_status(project.id, ProjectStatus::Completed)
            .unwrap();
        assert_eq!(again.unassigned, 0);
    }

    #[test]
    fn test_update_project_with_status_change() {
        let mut f = fixture();
        let project = f
            .store
            .create_project(&NewProject::new(f.org, "Website", f.admin))
            .unwrap();
        f.store
            .add_project_member(project.id, f.member, ProjectRole::Member)
            .unwrap();

        let updated = f
            .store
            .update_project(
                project.id,
                &UpdateProject {
                    name: Some("Website v2".into()),
                    status: Some(ProjectStatus::Completed),
                    assigned_manager_id: Some(Some(f.manager)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Website v2");
        assert_eq!(updated.status, ProjectStatus::Completed);
        assert_eq!(updated.assigned_manager_id, Some(f.manager));
        assert!(f.store.list_project_members(project.id).unwrap().is_empty());
    }

    #[test]
    fn test_failed_update_rolls_back_field_changes() {
        let mut f = fixture();
        let project = f
            .store
            .create_project(&NewProject::new(f.org, "Website", f.admin))
            .unwrap();
        f.store
            .transition_project_status(project.id, ProjectStatus::Completed)
            .unwrap();

        let err = f
            .store
            .update_project(
                project.id,
                &UpdateProject {
                    name: Some("Renamed".into()),
                    status: Some(ProjectStatus::Active),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(f.store.get_project(project.id).unwrap().name, "Website");
    }

    #[test]
    fn test_failed_cleanup_keeps_previous_status() {
        let mut f = fixture();
        let project = f
            .store
            .create_project(&NewProject::new(f.org, "Website", f.admin))
            .unwrap();
        f.store
            .add_project_member(project.id, f.member, ProjectRole::Member)
            .unwrap();
        f.store
            .conn
            .execute_batch(
                "CREATE TRIGGER block_member_delete BEFORE DELETE ON project_members
                 BEGIN SELECT RAISE(ABORT, 'cleanup blocked'); END;",
            )
            .unwrap();

        assert!(f
            .store
            .transition_project_status(project.id, ProjectStatus::Completed)
            .is_err());
        assert_eq!(f.store.get_project(project.id).unwrap().status, ProjectStatus::Planning);
        assert_eq!(f.store.list_project_members(project.id).unwrap().len(), 1);
    }

    #[test]
    fn test_narrowed_dates_must_cover_due_dates() {
        let mut f = fixture();
        let date = |m, d| chrono::NaiveDate::from_ymd_opt(2025, m, d);
        let mut input = NewProject::new(f.org, "Website", f.admin);
        input.start_date = date(1, 1);
        input.end_date = date(12, 31);
        let project = f.store.create_project(&input).unwrap();

        let mut task = crate::model::NewTask::new(project.id, "Launch", f.admin);
        task.due_date = date(9, 15);
        f.store.create_task(&task).unwrap();

        let narrow = UpdateProject {
            end_date: Some(date(6, 30)),
            ..Default::default()
        };
        assert!(matches!(
            f.store.update_project(project.id, &narrow),
            Err(Error::Validation(_))
        ));
        assert_eq!(f.store.get_project(project.id).unwrap().end_date, date(12, 31));

        let widen = UpdateProject {
            end_date: Some(date(9, 30)),
            ..Default::default()
        };
        assert_eq!(f.store.update_project(project.id, &widen).unwrap().end_date, date(9, 30));
    }

    #[test]
    fn test_manager_deletion_nullifies_project_manager() {
        let f = fixture();
        let mut input = NewProject::new(f.org, "Website", f.admin);
        input.assigned_manager_id = Some(f.manager);
        let project = f.store.create_project(&input).unwrap();

        f.store.delete_user(f.manager).unwrap();
        assert_eq!(f.store.get_project(project.id).unwrap().assigned_manager_id, None);
    }

    #[test]
    fn test_creator_deletion_cascades_project() {
        let f = fixture();
        let project = f
            .store
            .create_project(&NewProject::new(f.org, "Website", f.manager))
            .unwrap();
        f.store.delete_user(f.manager).unwrap();
        assert!(matches!(
            f.store.get_project(project.id),
            Err(Error::NotFound { .. })
        ));
    }
}
