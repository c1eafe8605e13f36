//! Daily work reports with per-module hour entries
//!
//! A report is always readable by its author. Other users of the same
//! organization read it only through the matching flag: admins need
//! `visible_to_admin`, managers need `visible_to_manager`, members never.

use super::projects::require_project;
use super::sqlite::{enum_column, ensure_user_in_org, now, Store};
use super::users::require_user;
use crate::model::{
    DailyReport, DailyReportDetail, DailyReportModule, DailyReportTask, DateRange, ModuleWithTasks,
    NewDailyReport, NewReportTask, UserRole,
};
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

const REPORT_COLUMNS: &str = "id, user_id, organization_id, project_id, report_date, work_title, work_description, status, discussion, visible_to_manager, visible_to_admin, created_at, updated_at";

/// Row filter over `daily_reports`; binds `?1` viewer id, `?2` viewer
/// organization and `?3` viewer role
const READABLE_BY_VIEWER: &str = r#"
    (user_id = ?1
     OR (organization_id = ?2
         AND ((?3 = 'admin' AND visible_to_admin = 1)
              OR (?3 = 'manager' AND visible_to_manager = 1))))
"#;

fn row_to_report(row: &rusqlite::Row) -> rusqlite::Result<DailyReport> {
    Ok(DailyReport {
        id: row.get(0)?,
        user_id: row.get(1)?,
        organization_id: row.get(2)?,
        project_id: row.get(3)?,
        report_date: row.get(4)?,
        work_title: row.get(5)?,
        work_description: row.get(6)?,
        status: enum_column(row, 7)?,
        discussion: row.get(8)?,
        visible_to_manager: row.get(9)?,
        visible_to_admin: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn row_to_report_task(row: &rusqlite::Row) -> rusqlite::Result<DailyReportTask> {
    Ok(DailyReportTask {
        id: row.get(0)?,
        report_id: row.get(1)?,
        module_id: row.get(2)?,
        task_name: row.get(3)?,
        task_hours: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn require_report(conn: &Connection, id: i64) -> Result<DailyReport> {
    conn.query_row(
        &format!("SELECT {} FROM daily_reports WHERE id = ?1", REPORT_COLUMNS),
        [id],
        row_to_report,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("DailyReport", id))
}

fn load_detail(conn: &Connection, report: DailyReport) -> Result<DailyReportDetail> {
    let mut stmt = conn.prepare(
        "SELECT id, report_id, module_name, total_hours, created_at, updated_at
         FROM daily_report_modules WHERE report_id = ?1 ORDER BY id",
    )?;
    let modules: Vec<DailyReportModule> = stmt
        .query_map([report.id], |row| {
            Ok(DailyReportModule {
                id: row.get(0)?,
                report_id: row.get(1)?,
                module_name: row.get(2)?,
                total_hours: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<_>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, report_id, module_id, task_name, task_hours, created_at, updated_at
         FROM daily_report_tasks WHERE report_id = ?1 ORDER BY id",
    )?;
    let mut tasks: Vec<DailyReportTask> = stmt
        .query_map([report.id], row_to_report_task)?
        .collect::<rusqlite::Result<_>>()?;

    let modules = modules
        .into_iter()
        .map(|module| {
            let (mine, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut tasks)
                .into_iter()
                .partition(|t| t.module_id == Some(module.id));
            tasks = rest;
            ModuleWithTasks { module, tasks: mine }
        })
        .collect();

    Ok(DailyReportDetail {
        report,
        modules,
        loose_tasks: tasks,
    })
}

fn validate_hours(entries: &[NewReportTask]) -> Result<()> {
    for entry in entries {
        if entry.task_name.trim().is_empty() {
            return Err(Error::Validation("report task name is required".into()));
        }
        if !entry.task_hours.is_finite() || entry.task_hours < 0.0 {
            return Err(Error::Validation(format!(
                "invalid hours {} for '{}'",
                entry.task_hours, entry.task_name
            )));
        }
    }
    Ok(())
}

fn insert_task(
    conn: &Connection,
    report_id: i64,
    module_id: Option<i64>,
    entry: &NewReportTask,
) -> Result<()> {
    let ts = now();
    conn.execute(
        r#"
        INSERT INTO daily_report_tasks (report_id, module_id, task_name, task_hours, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        "#,
        params![report_id, module_id, entry.task_name, entry.task_hours, ts],
    )?;
    Ok(())
}

impl Store {
    /// File a report with its modules and hour entries in one transaction.
    /// Each module's total is the sum of its entries.
    pub fn create_daily_report(&mut self, input: &NewDailyReport) -> Result<DailyReportDetail> {
        if input.work_title.trim().is_empty() {
            return Err(Error::Validation("work title is required".into()));
        }
        for module in &input.modules {
            if module.module_name.trim().is_empty() {
                return Err(Error::Validation("module name is required".into()));
            }
            validate_hours(&module.tasks)?;
        }
        validate_hours(&input.loose_tasks)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_user_in_org(&tx, "Report author", input.user_id, input.organization_id)?;
        if let Some(project_id) = input.project_id {
            let project = require_project(&tx, project_id)?;
            if project.organization_id != input.organization_id {
                return Err(Error::OrganizationMismatch {
                    entity: "Report project",
                    expected: input.organization_id,
                    found: project.organization_id,
                });
            }
        }

        let ts = now();
        tx.execute(
            r#"
            INSERT INTO daily_reports (user_id, organization_id, project_id, report_date, work_title, work_description,
                                       status, discussion, visible_to_manager, visible_to_admin, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            "#,
            params![
                input.user_id,
                input.organization_id,
                input.project_id,
                input.report_date,
                input.work_title,
                input.work_description,
                input.status.as_str(),
                input.discussion,
                input.visible_to_manager,
                input.visible_to_admin,
                ts,
            ],
        )?;
        let report_id = tx.last_insert_rowid();

        for module in &input.modules {
            tx.execute(
                r#"
                INSERT INTO daily_report_modules (report_id, module_name, total_hours, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?4)
                "#,
                params![report_id, module.module_name, module.total_hours(), ts],
            )?;
            let module_id = tx.last_insert_rowid();
            for entry in &module.tasks {
                insert_task(&tx, report_id, Some(module_id), entry)?;
            }
        }
        for entry in &input.loose_tasks {
            insert_task(&tx, report_id, None, entry)?;
        }

        let detail = load_detail(&tx, require_report(&tx, report_id)?)?;
        tx.commit()?;
        tracing::debug!(
            "User {} filed report {} for {} ({:.1}h)",
            input.user_id,
            report_id,
            input.report_date,
            detail.total_hours()
        );
        Ok(detail)
    }

    pub fn get_daily_report(&self, id: i64) -> Result<DailyReportDetail> {
        load_detail(&self.conn, require_report(&self.conn, id)?)
    }

    pub fn can_view_daily_report(&self, viewer_id: i64, report_id: i64) -> Result<bool> {
        let viewer = require_user(&self.conn, viewer_id)?;
        let report = require_report(&self.conn, report_id)?;
        if report.user_id == viewer.id {
            return Ok(true);
        }
        if report.organization_id != viewer.organization_id {
            return Ok(false);
        }
        Ok(match viewer.role {
            UserRole::Admin => report.visible_to_admin,
            UserRole::Manager => report.visible_to_manager,
            UserRole::Member => false,
        })
    }

    /// Reports the viewer may read, newest report date first
    pub fn list_visible_daily_reports(&self, viewer_id: i64) -> Result<Vec<DailyReport>> {
        let viewer = require_user(&self.conn, viewer_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM daily_reports WHERE {} ORDER BY report_date DESC, id DESC",
            REPORT_COLUMNS, READABLE_BY_VIEWER
        ))?;
        let reports = stmt
            .query_map(
                params![viewer.id, viewer.organization_id, viewer.role.as_str()],
                row_to_report,
            )?
            .collect::<rusqlite::Result<_>>()?;
        Ok(reports)
    }

    /// Readable reports dated inside `range`, oldest first
    pub fn list_daily_reports_in_range(&self, viewer_id: i64, range: DateRange) -> Result<Vec<DailyReport>> {
        let viewer = require_user(&self.conn, viewer_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM daily_reports WHERE {} AND report_date BETWEEN ?4 AND ?5 ORDER BY report_date, id",
            REPORT_COLUMNS, READABLE_BY_VIEWER
        ))?;
        let reports = stmt
            .query_map(
                params![
                    viewer.id,
                    viewer.organization_id,
                    viewer.role.as_str(),
                    range.start,
                    range.end
                ],
                row_to_report,
            )?
            .collect::<rusqlite::Result<_>>()?;
        Ok(reports)
    }

    /// Delete a report with its modules and entries
    pub fn delete_daily_report(&self, id: i64) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM daily_reports WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(Error::not_found("DailyReport", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewOrganization, NewProject, NewReportModule, NewUser};
    use chrono::{Datelike, NaiveDate};

    struct Fixture {
        store: Store,
        org: i64,
        admin: i64,
        manager: i64,
        author: i64,
        peer: i64,
    }

    fn fixture() -> Fixture {
        let store = Store::open_in_memory().unwrap();
        let org = store
            .create_organization(&NewOrganization::named("Acme"))
            .unwrap()
            .id;
        let mk = |email: &str, role: UserRole| {
            store
                .create_user(&NewUser::new(org, email, email, role))
                .unwrap()
                .id
        };
        let admin = mk("admin@acme.io", UserRole::Admin);
        let manager = mk("manager@acme.io", UserRole::Manager);
        let author = mk("author@acme.io", UserRole::Member);
        let peer = mk("peer@acme.io", UserRole::Member);
        Fixture { store, org, admin, manager, author, peer }
    }

    fn entry(name: &str, hours: f64) -> NewReportTask {
        NewReportTask {
            task_name: name.into(),
            task_hours: hours,
        }
    }

    fn report(f: &Fixture) -> NewDailyReport {
        let mut input = NewDailyReport::new(
            f.author,
            f.org,
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            "Checkout work",
        );
        input.modules = vec![NewReportModule {
            module_name: "Payments".into(),
            tasks: vec![entry("Stripe webhook", 2.5), entry("Refunds", 1.5)],
        }];
        input.loose_tasks = vec![entry("Standup", 0.25)];
        input
    }

    #[test]
    fn test_create_report_with_modules() {
        let mut f = fixture();
        let input = report(&f);
        let detail = f.store.create_daily_report(&input).unwrap();

        assert_eq!(detail.modules.len(), 1);
        assert_eq!(detail.modules[0].module.total_hours, 4.0);
        assert_eq!(detail.modules[0].tasks.len(), 2);
        assert_eq!(detail.loose_tasks.len(), 1);
        assert_eq!(detail.total_hours(), 4.25);

        let loaded = f.store.get_daily_report(detail.report.id).unwrap();
        assert_eq!(loaded.modules[0].tasks[1].task_name, "Refunds");
    }

    #[test]
    fn test_negative_hours_write_nothing() {
        let mut f = fixture();
        let mut input = report(&f);
        input.loose_tasks.push(entry("Oops", -1.0));
        assert!(matches!(
            f.store.create_daily_report(&input),
            Err(Error::Validation(_))
        ));
        assert_eq!(f.store.count_rows("daily_reports").unwrap(), 0);
    }

    #[test]
    fn test_visibility_flags_gate_readers() {
        let mut f = fixture();
        let id = f.store.create_daily_report(&report(&f)).unwrap().report.id;

        assert!(f.store.can_view_daily_report(f.author, id).unwrap());
        assert!(!f.store.can_view_daily_report(f.admin, id).unwrap());
        assert!(!f.store.can_view_daily_report(f.manager, id).unwrap());
        assert!(!f.store.can_view_daily_report(f.peer, id).unwrap());

        let mut shared = report(&f);
        shared.visible_to_manager = true;
        let shared = f.store.create_daily_report(&shared).unwrap().report.id;
        assert!(f.store.can_view_daily_report(f.manager, shared).unwrap());
        assert!(!f.store.can_view_daily_report(f.admin, shared).unwrap());
        assert!(!f.store.can_view_daily_report(f.peer, shared).unwrap());

        assert_eq!(f.store.list_visible_daily_reports(f.author).unwrap().len(), 2);
        assert_eq!(f.store.list_visible_daily_reports(f.manager).unwrap().len(), 1);
        assert!(f.store.list_visible_daily_reports(f.admin).unwrap().is_empty());
    }

    #[test]
    fn test_foreign_admin_cannot_read() {
        let mut f = fixture();
        let mut input = report(&f);
        input.visible_to_admin = true;
        let id = f.store.create_daily_report(&input).unwrap().report.id;

        let other = f
            .store
            .create_organization(&NewOrganization::named("Globex"))
            .unwrap()
            .id;
        let outsider = f
            .store
            .create_user(&NewUser::new(other, "Root", "root@globex.io", UserRole::Admin))
            .unwrap()
            .id;
        assert!(f.store.can_view_daily_report(f.admin, id).unwrap());
        assert!(!f.store.can_view_daily_report(outsider, id).unwrap());
        assert!(f.store.list_visible_daily_reports(outsider).unwrap().is_empty());
    }

    #[test]
    fn test_project_deletion_keeps_report() {
        let mut f = fixture();
        let project = f
            .store
            .create_project(&NewProject::new(f.org, "Website", f.author))
            .unwrap()
            .id;
        let mut input = report(&f);
        input.project_id = Some(project);
        let id = f.store.create_daily_report(&input).unwrap().report.id;

        f.store.delete_project(project).unwrap();
        assert_eq!(f.store.get_daily_report(id).unwrap().report.project_id, None);

        f.store.delete_daily_report(id).unwrap();
        assert_eq!(f.store.count_rows("daily_report_modules").unwrap(), 0);
        assert_eq!(f.store.count_rows("daily_report_tasks").unwrap(), 0);
    }

    #[test]
    fn test_range_listing_respects_visibility() {
        let mut f = fixture();
        for day in [3, 10, 24] {
            let mut input = report(&f);
            input.report_date = NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
            input.visible_to_manager = day != 24;
            f.store.create_daily_report(&input).unwrap();
        }
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        )
        .unwrap();

        let dates = |viewer: i64| -> Vec<u32> {
            f.store
                .list_daily_reports_in_range(viewer, range)
                .unwrap()
                .iter()
                .map(|r| r.report_date.day())
                .collect()
        };
        assert_eq!(dates(f.author), vec![10, 24]);
        assert_eq!(dates(f.manager), vec![10]);
        assert!(dates(f.peer).is_empty());
    }
}
