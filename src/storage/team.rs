//! Project team membership

use super::projects::require_project;
use super::sqlite::{enum_column, ensure_user_in_org, now, Store};
use super::users::{row_to_user, USER_COLUMNS};
use crate::model::{
    AssignableMember, AssignableRole, AvailableMember, Project, ProjectMember, ProjectRef, ProjectRole, UserRole,
};
use crate::{Error, Result};
use rusqlite::{params, Connection, TransactionBehavior};
use std::collections::BTreeSet;

const MEMBER_COLUMNS: &str = "id, project_id, user_id, role, joined_at";

fn row_to_member(row: &rusqlite::Row) -> rusqlite::Result<ProjectMember> {
    Ok(ProjectMember {
        id: row.get(0)?,
        project_id: row.get(1)?,
        user_id: row.get(2)?,
        role: enum_column(row, 3)?,
        joined_at: row.get(4)?,
    })
}

/// Completed projects keep an empty team
pub(crate) fn ensure_open_for_team(project: &Project) -> Result<()> {
    if project.status.is_terminal() {
        return Err(Error::Validation(format!(
            "project {} is completed and cannot take team members",
            project.id
        )));
    }
    Ok(())
}

pub(crate) fn is_member(conn: &Connection, project_id: i64, user_id: i64) -> Result<bool> {
    let found: i64 = conn.query_row(
        "SELECT COUNT(*) FROM project_members WHERE project_id = ?1 AND user_id = ?2",
        [project_id, user_id],
        |row| row.get(0),
    )?;
    Ok(found > 0)
}

/// Add `user_id` to the team unless already there; returns whether a row
/// was inserted
pub(crate) fn ensure_member(conn: &Connection, project_id: i64, user_id: i64) -> Result<bool> {
    let inserted = conn.execute(
        r#"
        INSERT INTO project_members (project_id, user_id, role, joined_at)
        VALUES (?1, ?2, 'member', ?3)
        ON CONFLICT(project_id, user_id) DO NOTHING
        "#,
        params![project_id, user_id, now()],
    )?;
    Ok(inserted > 0)
}

impl Store {
    /// Add one team member. A second membership for the same pair fails
    /// with `Error::Unique`.
    ///
    /// The completed-status check and the insert share one immediate
    /// transaction, so a concurrent completion either lands first and the
    /// add is rejected, or lands after and removes the new row.
    pub fn add_project_member(&mut self, project_id: i64, user_id: i64, role: ProjectRole) -> Result<ProjectMember> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let project = require_project(&tx, project_id)?;
        ensure_open_for_team(&project)?;
        ensure_user_in_org(&tx, "Project member", user_id, project.organization_id)?;

        tx.execute(
            "INSERT INTO project_members (project_id, user_id, role, joined_at) VALUES (?1, ?2, ?3, ?4)",
            params![project_id, user_id, role.as_str(), now()],
        )?;
        let member = tx.query_row(
            &format!("SELECT {} FROM project_members WHERE id = ?1", MEMBER_COLUMNS),
            [tx.last_insert_rowid()],
            row_to_member,
        )?;
        tx.commit()?;

        tracing::debug!("User {} joined project {} as {}", user_id, project_id, role);
        Ok(member)
    }

    /// Remove a membership; returns whether one existed
    pub fn remove_project_member(&self, project_id: i64, user_id: i64) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM project_members WHERE project_id = ?1 AND user_id = ?2",
            [project_id, user_id],
        )?;
        Ok(removed > 0)
    }

    pub fn list_project_members(&self, project_id: i64) -> Result<Vec<ProjectMember>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM project_members WHERE project_id = ?1 ORDER BY joined_at, id",
            MEMBER_COLUMNS
        ))?;
        let members = stmt
            .query_map([project_id], row_to_member)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(members)
    }

    pub fn is_project_member(&self, project_id: i64, user_id: i64) -> Result<bool> {
        is_member(&self.conn, project_id, user_id)
    }

    /// Replace the `member`-role team with `user_ids`.
    ///
    /// Members holding the `manager` project role are kept. Returns the team
    /// after the change.
    pub fn assign_team_members(&mut self, project_id: i64, user_ids: &[i64]) -> Result<Vec<ProjectMember>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let project = require_project(&tx, project_id)?;
        ensure_open_for_team(&project)?;

        let wanted: BTreeSet<i64> = user_ids.iter().copied().collect();
        for user_id in &wanted {
            ensure_user_in_org(&tx, "Project member", *user_id, project.organization_id)?;
        }

        tx.execute(
            "DELETE FROM project_members WHERE project_id = ?1 AND role = 'member'",
            [project_id],
        )?;
        for user_id in &wanted {
            ensure_member(&tx, project_id, *user_id)?;
        }
        tx.commit()?;

        tracing::info!("Assigned {} team members to project {}", wanted.len(), project_id);
        self.list_project_members(project_id)
    }

    /// Active `member`-role users of an organization, minus the team of
    /// `exclude_project` when given. Each carries the planning or active
    /// projects they are already on.
    pub fn available_team_members(
        &self,
        organization_id: i64,
        exclude_project: Option<i64>,
    ) -> Result<Vec<AvailableMember>> {
        if let Some(project_id) = exclude_project {
            let project = require_project(&self.conn, project_id)?;
            if project.organization_id != organization_id {
                return Err(Error::OrganizationMismatch {
                    entity: "Project",
                    expected: organization_id,
                    found: project.organization_id,
                });
            }
        }

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM users
            WHERE organization_id = ?1 AND is_active = 1 AND role = 'member'
              AND (?2 IS NULL OR id NOT IN (SELECT user_id FROM project_members WHERE project_id = ?2))
            ORDER BY full_name, id
            "#,
            USER_COLUMNS
        ))?;
        let users: Vec<_> = stmt
            .query_map(params![organization_id, exclude_project], row_to_user)?
            .collect::<rusqlite::Result<_>>()?;

        let mut projects = self.conn.prepare(
            r#"
            SELECT p.id, p.name, p.status FROM projects p
            JOIN project_members pm ON pm.project_id = p.id
            WHERE pm.user_id = ?1 AND p.status IN ('planning', 'active')
            ORDER BY p.name, p.id
            "#,
        )?;
        let mut available = Vec::with_capacity(users.len());
        for user in users {
            let current_projects = projects
                .query_map([user.id], |row| {
                    Ok(ProjectRef {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        status: enum_column(row, 2)?,
                    })
                })?
                .collect::<rusqlite::Result<_>>()?;
            available.push(AvailableMember { user, current_projects });
        }
        Ok(available)
    }

    /// Active users who may receive tasks in a project: the assigned
    /// manager, the team, and the organization's admins unless the viewer
    /// is a manager.
    ///
    /// Admins come first, then the manager, then the team, each by name.
    pub fn project_assignable_members(
        &self,
        project_id: i64,
        viewer_role: UserRole,
    ) -> Result<Vec<AssignableMember>> {
        let project = require_project(&self.conn, project_id)?;
        let include_admins = viewer_role != UserRole::Manager;
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM users
            WHERE organization_id = ?1 AND is_active = 1
              AND (id = ?2
                   OR id IN (SELECT user_id FROM project_members WHERE project_id = ?3)
                   OR (?4 AND role = 'admin'))
            ORDER BY full_name, id
            "#,
            USER_COLUMNS
        ))?;
        let mut members: Vec<AssignableMember> = stmt
            .query_map(
                params![project.organization_id, project.assigned_manager_id, project.id, include_admins],
                row_to_user,
            )?
            .map(|user| {
                user.map(|user| {
                    let project_role = if include_admins && user.role == UserRole::Admin {
                        AssignableRole::Administrator
                    } else if Some(user.id) == project.assigned_manager_id {
                        AssignableRole::ProjectManager
                    } else {
                        AssignableRole::TeamMember
                    };
                    AssignableMember { user, project_role }
                })
            })
            .collect::<rusqlite::Result<_>>()?;
        members.sort_by_key(|m| match m.project_role {
            AssignableRole::Administrator => 0,
            AssignableRole::ProjectManager => 1,
            AssignableRole::TeamMember => 2,
        });
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewOrganization, NewProject, NewUser, ProjectStatus};

    fn setup() -> (Store, i64, Vec<i64>, i64) {
        let store = Store::open_in_memory().unwrap();
        let org = store
            .create_organization(&NewOrganization::named("Acme"))
            .unwrap()
            .id;
        let users: Vec<i64> = (0..3)
            .map(|i| {
                store
                    .create_user(&NewUser::new(
                        org,
                        format!("User {}", i),
                        format!("user{}@acme.io", i),
                        UserRole::Member,
                    ))
                    .unwrap()
                    .id
            })
            .collect();
        let project = store
            .create_project(&NewProject::new(org, "Website", users[0]))
            .unwrap()
            .id;
        (store, org, users, project)
    }

    #[test]
    fn test_duplicate_membership_is_unique_violation() {
        let (mut store, _, users, project) = setup();
        store
            .add_project_member(project, users[1], ProjectRole::Member)
            .unwrap();
        let err = store
            .add_project_member(project, users[1], ProjectRole::Manager)
            .unwrap_err();
        assert!(matches!(err, Error::Unique(_)));
        assert_eq!(store.list_project_members(project).unwrap().len(), 1);
    }

    #[test]
    fn test_member_from_other_org_rejected() {
        let (mut store, _, _, project) = setup();
        let other = store
            .create_organization(&NewOrganization::named("Globex"))
            .unwrap()
            .id;
        let outsider = store
            .create_user(&NewUser::new(other, "Out", "out@globex.io", UserRole::Member))
            .unwrap()
            .id;
        assert!(matches!(
            store.add_project_member(project, outsider, ProjectRole::Member),
            Err(Error::OrganizationMismatch { .. })
        ));
    }

    #[test]
    fn test_completed_project_rejects_members() {
        let (mut store, _, users, project) = setup();
        store
            .transition_project_status(project, ProjectStatus::Completed)
            .unwrap();
        assert!(matches!(
            store.add_project_member(project, users[1], ProjectRole::Member),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.assign_team_members(project, &[users[1]]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_assign_team_keeps_managers() {
        let (mut store, _, users, project) = setup();
        store
            .add_project_member(project, users[0], ProjectRole::Manager)
            .unwrap();
        store
            .add_project_member(project, users[1], ProjectRole::Member)
            .unwrap();

        let team = store
            .assign_team_members(project, &[users[2], users[2]])
            .unwrap();
        let ids: Vec<i64> = team.iter().map(|m| m.user_id).collect();
        assert_eq!(ids, vec![users[0], users[2]]);
        assert_eq!(team[0].role, ProjectRole::Manager);
        assert!(!store.is_project_member(project, users[1]).unwrap());
    }

    #[test]
    fn test_remove_member() {
        let (mut store, _, users, project) = setup();
        store
            .add_project_member(project, users[1], ProjectRole::Member)
            .unwrap();
        assert!(store.remove_project_member(project, users[1]).unwrap());
        assert!(!store.remove_project_member(project, users[1]).unwrap());
    }

    #[test]
    fn test_user_deletion_drops_membership() {
        let (mut store, _, users, project) = setup();
        store
            .add_project_member(project, users[1], ProjectRole::Member)
            .unwrap();
        store.delete_user(users[1]).unwrap();
        assert!(store.list_project_members(project).unwrap().is_empty());
    }

    #[test]
    fn test_available_members_exclude_current_team() {
        let (mut store, org, users, project) = setup();
        store.add_project_member(project, users[1], ProjectRole::Member).unwrap();
        store.set_user_active(users[2], false).unwrap();
        store
            .create_user(&NewUser::new(org, "Boss", "boss@acme.io", UserRole::Manager))
            .unwrap();

        let available = store.available_team_members(org, Some(project)).unwrap();
        let ids: Vec<i64> = available.iter().map(|m| m.user.id).collect();
        assert_eq!(ids, vec![users[0]]);
        assert!(available[0].current_projects.is_empty());

        let everyone = store.available_team_members(org, None).unwrap();
        let on_team = everyone.iter().find(|m| m.user.id == users[1]).unwrap();
        assert_eq!(on_team.current_projects.len(), 1);
        assert_eq!(on_team.current_projects[0].id, project);

        store
            .transition_project_status(project, ProjectStatus::Completed)
            .unwrap();
        let everyone = store.available_team_members(org, None).unwrap();
        assert!(everyone.iter().all(|m| m.current_projects.is_empty()));
    }

    #[test]
    fn test_assignable_members_ranked_by_role() {
        let (mut store, org, users, project) = setup();
        let admin = store
            .create_user(&NewUser::new(org, "Zed Admin", "admin@acme.io", UserRole::Admin))
            .unwrap()
            .id;
        let manager = store
            .create_user(&NewUser::new(org, "Mia Lead", "lead@acme.io", UserRole::Manager))
            .unwrap()
            .id;
        store.assign_project_manager(project, Some(manager)).unwrap();
        store.add_project_member(project, users[1], ProjectRole::Member).unwrap();

        let seen = store
            .project_assignable_members(project, UserRole::Admin)
            .unwrap();
        let ranked: Vec<(i64, AssignableRole)> =
            seen.iter().map(|m| (m.user.id, m.project_role)).collect();
        assert_eq!(
            ranked,
            vec![
                (admin, AssignableRole::Administrator),
                (manager, AssignableRole::ProjectManager),
                (users[1], AssignableRole::TeamMember),
            ]
        );

        let seen = store
            .project_assignable_members(project, UserRole::Manager)
            .unwrap();
        assert!(seen.iter().all(|m| m.user.id != admin));
        assert_eq!(seen.len(), 2);
    }
}
