//! Dashboards and reports
//!
//! Every figure is computed on read from the live tables. `today` is passed
//! in so overdue counts are reproducible; a task is overdue when its due
//! date is before `today` and it is not completed.

use super::projects::require_project;
use super::sqlite::{enum_column, Store};
use super::users::require_user;
use crate::model::{
    DailyCompletion, DashboardStats, DateRange, MemberPerformance, MilestoneProgress,
    OrganizationReport, OrganizationStats, ProjectInvolvement, ProjectReport, TaskStats,
    TopPerformer, UserReport, UserTaskStats,
};
use crate::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::params;

/// Bounds of an optional range as two nullable parameters
fn range_bounds(range: Option<DateRange>) -> (Option<NaiveDate>, Option<NaiveDate>) {
    (range.map(|r| r.start), range.map(|r| r.end))
}

fn count(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<usize> {
    let value: Option<i64> = row.get(idx)?;
    Ok(value.unwrap_or(0) as usize)
}

impl Store {
    /// Headline counts for one organization
    pub fn dashboard_stats(&self, organization_id: i64, today: NaiveDate) -> Result<DashboardStats> {
        self.get_organization(organization_id)?;
        let stats = self.conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM projects WHERE organization_id = ?1),
                (SELECT COUNT(*) FROM projects WHERE organization_id = ?1 AND status = 'active'),
                (SELECT COUNT(*) FROM projects WHERE organization_id = ?1 AND status = 'completed'),
                (SELECT COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id
                 WHERE p.organization_id = ?1),
                (SELECT COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id
                 WHERE p.organization_id = ?1 AND t.status = 'completed'),
                (SELECT COUNT(*) FROM users WHERE organization_id = ?1),
                (SELECT COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id
                 WHERE p.organization_id = ?1 AND t.due_date < ?2 AND t.status != 'completed')
            "#,
            params![organization_id, today],
            |row| {
                Ok(DashboardStats {
                    projects_total: count(row, 0)?,
                    projects_active: count(row, 1)?,
                    projects_completed: count(row, 2)?,
                    tasks_total: count(row, 3)?,
                    tasks_completed: count(row, 4)?,
                    users_total: count(row, 5)?,
                    overdue_tasks: count(row, 6)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Headline counts over the projects a manager is assigned to.
    /// `users_total` counts distinct task assignees in those projects.
    pub fn manager_dashboard_stats(&self, manager_id: i64, today: NaiveDate) -> Result<DashboardStats> {
        require_user(&self.conn, manager_id)?;
        let stats = self.conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM projects WHERE assigned_manager_id = ?1),
                (SELECT COUNT(*) FROM projects WHERE assigned_manager_id = ?1 AND status = 'active'),
                (SELECT COUNT(*) FROM projects WHERE assigned_manager_id = ?1 AND status = 'completed'),
                (SELECT COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id
                 WHERE p.assigned_manager_id = ?1),
                (SELECT COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id
                 WHERE p.assigned_manager_id = ?1 AND t.status = 'completed'),
                (SELECT COUNT(DISTINCT t.assigned_to) FROM tasks t JOIN projects p ON p.id = t.project_id
                 WHERE p.assigned_manager_id = ?1),
                (SELECT COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id
                 WHERE p.assigned_manager_id = ?1 AND t.due_date < ?2 AND t.status != 'completed')
            "#,
            params![manager_id, today],
            |row| {
                Ok(DashboardStats {
                    projects_total: count(row, 0)?,
                    projects_active: count(row, 1)?,
                    projects_completed: count(row, 2)?,
                    tasks_total: count(row, 3)?,
                    tasks_completed: count(row, 4)?,
                    users_total: count(row, 5)?,
                    overdue_tasks: count(row, 6)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Task totals, per-member performance and milestone progress for a
    /// project. `completions` limits the per-day completion series.
    pub fn project_report(
        &self,
        project_id: i64,
        today: NaiveDate,
        completions: Option<DateRange>,
    ) -> Result<ProjectReport> {
        let project = require_project(&self.conn, project_id)?;
        let created_by_name = require_user(&self.conn, project.created_by)?.full_name;

        let task_stats = self.conn.query_row(
            r#"
            SELECT COUNT(*),
                   SUM(status = 'completed'),
                   SUM(status = 'in_progress'),
                   SUM(status = 'pending'),
                   SUM(due_date < ?2 AND status != 'completed')
            FROM tasks WHERE project_id = ?1
            "#,
            params![project_id, today],
            |row| {
                Ok(TaskStats {
                    total: count(row, 0)?,
                    completed: count(row, 1)?,
                    in_progress: count(row, 2)?,
                    pending: count(row, 3)?,
                    overdue: count(row, 4)?,
                })
            },
        )?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT u.id, u.full_name, u.email,
                   COUNT(t.id),
                   SUM(t.status = 'completed'),
                   SUM(t.due_date < ?2 AND t.status != 'completed')
            FROM project_members pm
            JOIN users u ON u.id = pm.user_id
            LEFT JOIN tasks t ON t.assigned_to = u.id AND t.project_id = pm.project_id
            WHERE pm.project_id = ?1
            GROUP BY u.id, u.full_name, u.email
            ORDER BY COUNT(t.id) DESC, u.full_name
            "#,
        )?;
        let team_performance = stmt
            .query_map(params![project_id, today], |row| {
                Ok(MemberPerformance {
                    user_id: row.get(0)?,
                    full_name: row.get(1)?,
                    email: row.get(2)?,
                    assigned_tasks: count(row, 3)?,
                    completed_tasks: count(row, 4)?,
                    overdue_tasks: count(row, 5)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT m.id, m.name, m.due_date, m.status, COUNT(t.id), SUM(t.status = 'completed')
            FROM milestones m
            LEFT JOIN tasks t ON t.milestone_id = m.id
            WHERE m.project_id = ?1
            GROUP BY m.id, m.name, m.due_date, m.status
            ORDER BY m.due_date IS NULL, m.due_date, m.id
            "#,
        )?;
        let milestones = stmt
            .query_map([project_id], |row| {
                Ok(MilestoneProgress {
                    milestone_id: row.get(0)?,
                    name: row.get(1)?,
                    due_date: row.get(2)?,
                    status: enum_column(row, 3)?,
                    total_tasks: count(row, 4)?,
                    completed_tasks: count(row, 5)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        let (start, end) = range_bounds(completions);
        let mut stmt = self.conn.prepare(
            r#"
            SELECT completion_date, COUNT(*)
            FROM tasks
            WHERE project_id = ?1 AND status = 'completed' AND completion_date IS NOT NULL
              AND (?2 IS NULL OR completion_date BETWEEN ?2 AND ?3)
            GROUP BY completion_date
            ORDER BY completion_date
            "#,
        )?;
        let daily_completions = stmt
            .query_map(params![project_id, start, end], |row| {
                Ok(DailyCompletion {
                    date: row.get(0)?,
                    tasks_completed: count(row, 1)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        tracing::debug!("Built report for project {}", project_id);
        Ok(ProjectReport {
            project,
            created_by_name,
            task_stats,
            team_performance,
            milestones,
            daily_completions,
            generated_at: Utc::now(),
        })
    }

    /// Task statistics and project involvement of one user over the tasks
    /// assigned to them, optionally limited to tasks created in `created`
    pub fn user_report(
        &self,
        user_id: i64,
        today: NaiveDate,
        created: Option<DateRange>,
    ) -> Result<UserReport> {
        let user = require_user(&self.conn, user_id)?;
        let organization_name = self.get_organization(user.organization_id)?.name;
        let (start, end) = range_bounds(created);

        let task_stats = self.conn.query_row(
            r#"
            SELECT COUNT(*),
                   SUM(status = 'completed'),
                   SUM(status = 'in_progress'),
                   SUM(due_date < ?2 AND status != 'completed'),
                   AVG(CASE WHEN status = 'completed' AND completion_date IS NOT NULL AND due_date IS NOT NULL
                            THEN julianday(completion_date) - julianday(due_date) END)
            FROM tasks
            WHERE assigned_to = ?1
              AND (?3 IS NULL OR substr(created_at, 1, 10) BETWEEN ?3 AND ?4)
            "#,
            params![user_id, today, start, end],
            |row| {
                Ok(UserTaskStats {
                    total_assigned: count(row, 0)?,
                    completed: count(row, 1)?,
                    in_progress: count(row, 2)?,
                    overdue: count(row, 3)?,
                    avg_delay_days: row.get(4)?,
                })
            },
        )?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.name, p.status, COUNT(t.id), SUM(t.status = 'completed')
            FROM tasks t
            JOIN projects p ON p.id = t.project_id
            WHERE t.assigned_to = ?1
              AND (?2 IS NULL OR substr(t.created_at, 1, 10) BETWEEN ?2 AND ?3)
            GROUP BY p.id, p.name, p.status
            ORDER BY COUNT(t.id) DESC, p.name
            "#,
        )?;
        let projects = stmt
            .query_map(params![user_id, start, end], |row| {
                Ok(ProjectInvolvement {
                    project_id: row.get(0)?,
                    name: row.get(1)?,
                    status: enum_column(row, 2)?,
                    assigned_tasks: count(row, 3)?,
                    completed_tasks: count(row, 4)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        Ok(UserReport {
            user,
            organization_name,
            task_stats,
            projects,
            generated_at: Utc::now(),
        })
    }

    /// Organization totals and its ten best performers. `created` limits
    /// the task figures to tasks created in that window.
    pub fn organization_report(
        &self,
        organization_id: i64,
        today: NaiveDate,
        created: Option<DateRange>,
    ) -> Result<OrganizationReport> {
        let organization = self.get_organization(organization_id)?;
        let (start, end) = range_bounds(created);

        let stats = self.conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM projects WHERE organization_id = ?1),
                (SELECT COUNT(*) FROM projects WHERE organization_id = ?1 AND status = 'active'),
                (SELECT COUNT(*) FROM projects WHERE organization_id = ?1 AND status = 'completed'),
                (SELECT COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id
                 WHERE p.organization_id = ?1
                   AND (?2 IS NULL OR substr(t.created_at, 1, 10) BETWEEN ?2 AND ?3)),
                (SELECT COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id
                 WHERE p.organization_id = ?1 AND t.status = 'completed'
                   AND (?2 IS NULL OR substr(t.created_at, 1, 10) BETWEEN ?2 AND ?3)),
                (SELECT COUNT(*) FROM users WHERE organization_id = ?1)
            "#,
            params![organization_id, start, end],
            |row| {
                Ok(OrganizationStats {
                    total_projects: count(row, 0)?,
                    active_projects: count(row, 1)?,
                    completed_projects: count(row, 2)?,
                    total_tasks: count(row, 3)?,
                    completed_tasks: count(row, 4)?,
                    total_users: count(row, 5)?,
                })
            },
        )?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT u.id, u.full_name, u.role,
                   COUNT(t.id),
                   SUM(t.status = 'completed') AS completed,
                   SUM(t.due_date < ?2 AND t.status != 'completed') AS overdue
            FROM users u
            JOIN tasks t ON t.assigned_to = u.id
              AND (?3 IS NULL OR substr(t.created_at, 1, 10) BETWEEN ?3 AND ?4)
            WHERE u.organization_id = ?1
            GROUP BY u.id, u.full_name, u.role
            ORDER BY completed DESC, overdue ASC, u.full_name
            LIMIT 10
            "#,
        )?;
        let top_performers = stmt
            .query_map(params![organization_id, today, start, end], |row| {
                Ok(TopPerformer {
                    user_id: row.get(0)?,
                    full_name: row.get(1)?,
                    role: enum_column(row, 2)?,
                    assigned_tasks: count(row, 3)?,
                    completed_tasks: count(row, 4)?,
                    overdue_tasks: count(row, 5)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        tracing::debug!("Built report for organization {}", organization_id);
        Ok(OrganizationReport {
            organization,
            stats,
            top_performers,
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        NewMilestone, NewOrganization, NewProject, NewTask, NewUser, ProjectRole, ProjectStatus,
        TaskStatus, UserRole,
    };
    use crate::storage::sqlite::now;

    struct Fixture {
        store: Store,
        org: i64,
        manager: i64,
        dev: i64,
        tester: i64,
        project: i64,
        milestone: i64,
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// One managed project with four tasks: dev has a completed task that
    /// was due 2025-03-01 and an overdue pending one, tester has one in
    /// progress, one task is unassigned.
    fn fixture() -> Fixture {
        let mut store = Store::open_in_memory().unwrap();
        let org = store
            .create_organization(&NewOrganization::named("Acme"))
            .unwrap()
            .id;
        let manager = store
            .create_user(&NewUser::new(org, "Mia Lead", "lead@acme.io", UserRole::Manager))
            .unwrap()
            .id;
        let dev = store
            .create_user(&NewUser::new(org, "Dan Dev", "dev@acme.io", UserRole::Member))
            .unwrap()
            .id;
        let tester = store
            .create_user(&NewUser::new(org, "Tia Test", "test@acme.io", UserRole::Member))
            .unwrap()
            .id;
        let mut project = NewProject::new(org, "Website", manager);
        project.assigned_manager_id = Some(manager);
        project.status = ProjectStatus::Active;
        let project = store.create_project(&project).unwrap().id;
        store
            .add_project_member(project, manager, ProjectRole::Manager)
            .unwrap();
        let milestone = store
            .create_milestone(&NewMilestone::new(project, "Launch", manager))
            .unwrap()
            .id;

        let tasks = [
            ("Checkout", Some(dev), TaskStatus::Completed, Some(date(2025, 3, 1)), true),
            ("Search", Some(dev), TaskStatus::Pending, Some(date(2025, 4, 1)), true),
            ("Load test", Some(tester), TaskStatus::InProgress, Some(date(2025, 9, 1)), false),
            ("Docs", None, TaskStatus::Pending, None, false),
        ];
        for (title, assignee, status, due, in_milestone) in tasks {
            let mut task = NewTask::new(project, title, manager);
            task.assigned_to = assignee;
            task.status = status;
            task.due_date = due;
            task.milestone_id = in_milestone.then_some(milestone);
            store.create_task(&task).unwrap();
        }
        Fixture { store, org, manager, dev, tester, project, milestone }
    }

    fn today() -> NaiveDate {
        date(2025, 6, 1)
    }

    #[test]
    fn test_dashboard_counts() {
        let f = fixture();
        let stats = f.store.dashboard_stats(f.org, today()).unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                projects_total: 1,
                projects_active: 1,
                projects_completed: 0,
                tasks_total: 4,
                tasks_completed: 1,
                users_total: 3,
                overdue_tasks: 1,
            }
        );

        let empty = f
            .store
            .create_organization(&NewOrganization::named("Globex"))
            .unwrap()
            .id;
        assert_eq!(
            f.store.dashboard_stats(empty, today()).unwrap(),
            DashboardStats::default()
        );
    }

    #[test]
    fn test_manager_dashboard_counts_assignees() {
        let f = fixture();
        let stats = f.store.manager_dashboard_stats(f.manager, today()).unwrap();
        assert_eq!(stats.projects_total, 1);
        assert_eq!(stats.tasks_total, 4);
        assert_eq!(stats.users_total, 2);
        assert_eq!(stats.overdue_tasks, 1);

        let stats = f.store.manager_dashboard_stats(f.dev, today()).unwrap();
        assert_eq!(stats, DashboardStats::default());
    }

    #[test]
    fn test_project_report() {
        let f = fixture();
        let report = f.store.project_report(f.project, today(), None).unwrap();

        assert_eq!(report.created_by_name, "Mia Lead");
        assert_eq!(
            report.task_stats,
            TaskStats { total: 4, completed: 1, in_progress: 1, pending: 2, overdue: 1 }
        );

        let team: Vec<(i64, usize, usize, usize)> = report
            .team_performance
            .iter()
            .map(|m| (m.user_id, m.assigned_tasks, m.completed_tasks, m.overdue_tasks))
            .collect();
        assert_eq!(
            team,
            vec![(f.dev, 2, 1, 1), (f.tester, 1, 0, 0), (f.manager, 0, 0, 0)]
        );

        assert_eq!(report.milestones.len(), 1);
        assert_eq!(report.milestones[0].milestone_id, f.milestone);
        assert_eq!(report.milestones[0].total_tasks, 2);
        assert_eq!(report.milestones[0].completed_tasks, 1);

        let completed_on = now().date_naive();
        assert_eq!(
            report.daily_completions,
            vec![DailyCompletion { date: completed_on, tasks_completed: 1 }]
        );
        let long_ago = DateRange::new(date(2000, 1, 1), date(2000, 12, 31)).unwrap();
        let report = f.store.project_report(f.project, today(), Some(long_ago)).unwrap();
        assert!(report.daily_completions.is_empty());
    }

    #[test]
    fn test_user_report() {
        let f = fixture();
        let report = f.store.user_report(f.dev, today(), None).unwrap();

        assert_eq!(report.organization_name, "Acme");
        assert_eq!(report.task_stats.total_assigned, 2);
        assert_eq!(report.task_stats.completed, 1);
        assert_eq!(report.task_stats.overdue, 1);
        let expected_delay = (now().date_naive() - date(2025, 3, 1)).num_days() as f64;
        assert_eq!(report.task_stats.avg_delay_days, Some(expected_delay));
        assert_eq!(report.projects.len(), 1);
        assert_eq!(report.projects[0].project_id, f.project);
        assert_eq!(report.projects[0].assigned_tasks, 2);

        let long_ago = DateRange::new(date(2000, 1, 1), date(2000, 12, 31)).unwrap();
        let report = f.store.user_report(f.dev, today(), Some(long_ago)).unwrap();
        assert_eq!(report.task_stats, UserTaskStats::default());
        assert!(report.projects.is_empty());
    }

    #[test]
    fn test_organization_report_ranks_performers() {
        let f = fixture();
        let report = f.store.organization_report(f.org, today(), None).unwrap();

        assert_eq!(report.organization.name, "Acme");
        assert_eq!(report.stats.total_projects, 1);
        assert_eq!(report.stats.total_tasks, 4);
        assert_eq!(report.stats.completed_tasks, 1);
        assert_eq!(report.stats.total_users, 3);

        let ranked: Vec<i64> = report.top_performers.iter().map(|p| p.user_id).collect();
        assert_eq!(ranked, vec![f.dev, f.tester]);
        assert_eq!(report.top_performers[0].role, UserRole::Member);
    }
}
