//! Notifications and due-date reminders

use super::sqlite::{enum_column, now, Store};
use crate::model::{due_soon_text, NewNotification, Notification, NotificationType};
use crate::{Error, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};

const NOTIFICATION_COLUMNS: &str = "id, user_id, task_id, project_id, type, title, message, days_until_due, is_read, created_at";

fn row_to_notification(row: &rusqlite::Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        task_id: row.get(2)?,
        project_id: row.get(3)?,
        kind: enum_column(row, 4)?,
        title: row.get(5)?,
        message: row.get(6)?,
        days_until_due: row.get(7)?,
        is_read: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

struct DueTask {
    task_id: i64,
    title: String,
    due_date: NaiveDate,
    assignee: i64,
    project_id: i64,
    project_name: String,
}

impl Store {
    pub fn create_notification(&self, input: &NewNotification) -> Result<Notification> {
        if input.title.trim().is_empty() {
            return Err(Error::Validation("notification title is required".into()));
        }
        self.conn.execute(
            r#"
            INSERT INTO notifications (user_id, task_id, project_id, type, title, message, days_until_due, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                input.user_id,
                input.task_id,
                input.project_id,
                input.kind.as_str(),
                input.title,
                input.message,
                input.days_until_due,
                now(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.conn
            .query_row(
                &format!("SELECT {} FROM notifications WHERE id = ?1", NOTIFICATION_COLUMNS),
                [id],
                row_to_notification,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Notification", id))
    }

    /// Newest notifications for a user, at most `limit`
    pub fn list_notifications(&self, user_id: i64, limit: usize, unread_only: bool) -> Result<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM notifications
            WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0)
            ORDER BY created_at DESC, id DESC
            LIMIT ?3
            "#,
            NOTIFICATION_COLUMNS
        ))?;
        let notifications = stmt
            .query_map(params![user_id, unread_only, limit as i64], row_to_notification)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(notifications)
    }

    /// Mark one notification read. Only the owning user can; returns whether
    /// a row changed.
    pub fn mark_notification_read(&self, id: i64, user_id: i64) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
            [id, user_id],
        )?;
        Ok(updated > 0)
    }

    /// Returns how many notifications were unread
    pub fn mark_all_notifications_read(&self, user_id: i64) -> Result<usize> {
        let updated = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
            [user_id],
        )?;
        Ok(updated)
    }

    pub fn unread_notification_count(&self, user_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Delete notifications created before the start of the day `days_old`
    /// days ago
    pub fn cleanup_notifications(&self, days_old: u64) -> Result<usize> {
        let cutoff = now()
            .date_naive()
            .checked_sub_days(Days::new(days_old))
            .ok_or_else(|| Error::Validation(format!("cleanup age of {} days is out of range", days_old)))?;
        let removed = self.conn.execute(
            "DELETE FROM notifications WHERE created_at < ?1",
            [start_of_day(cutoff)],
        )?;
        tracing::info!("Cleaned up {} notifications older than {} days", removed, days_old);
        Ok(removed)
    }

    /// Create `task_due_soon` reminders for assigned, unfinished tasks of the
    /// organization due between `today` and `today + days`.
    ///
    /// A task's assignee gets at most one reminder per calendar day of
    /// creation. Returns the number created.
    pub fn generate_due_notifications(&mut self, organization_id: i64, today: NaiveDate, days: u64) -> Result<usize> {
        let until = today
            .checked_add_days(Days::new(days))
            .ok_or_else(|| Error::Validation(format!("due window of {} days is out of range", days)))?;
        let created_on = now().date_naive();
        let day_start = start_of_day(created_on);
        let day_end = start_of_day(created_on + Days::new(1));

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let due: Vec<DueTask> = {
            let mut stmt = tx.prepare(
                r#"
                SELECT t.id, t.title, t.due_date, t.assigned_to, p.id, p.name
                FROM tasks t JOIN projects p ON p.id = t.project_id
                WHERE p.organization_id = ?1
                  AND t.assigned_to IS NOT NULL
                  AND t.due_date >= ?2 AND t.due_date <= ?3
                  AND t.status != 'completed'
                ORDER BY t.due_date, t.id
                "#,
            )?;
            stmt.query_map(params![organization_id, today, until], |row| {
                Ok(DueTask {
                    task_id: row.get(0)?,
                    title: row.get(1)?,
                    due_date: row.get(2)?,
                    assignee: row.get(3)?,
                    project_id: row.get(4)?,
                    project_name: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?
        };

        let mut created = 0;
        for task in due {
            let existing: i64 = tx.query_row(
                r#"
                SELECT COUNT(*) FROM notifications
                WHERE user_id = ?1 AND task_id = ?2 AND type = ?3
                  AND created_at >= ?4 AND created_at < ?5
                "#,
                params![
                    task.assignee,
                    task.task_id,
                    NotificationType::TaskDueSoon.as_str(),
                    day_start,
                    day_end,
                ],
                |row| row.get(0),
            )?;
            if existing > 0 {
                continue;
            }

            let days_until_due = (task.due_date - today).num_days();
            let (title, message) = due_soon_text(&task.title, &task.project_name, days_until_due);
            tx.execute(
                r#"
                INSERT INTO notifications (user_id, task_id, project_id, type, title, message, days_until_due, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    task.assignee,
                    task.task_id,
                    task.project_id,
                    NotificationType::TaskDueSoon.as_str(),
                    title,
                    message,
                    days_until_due,
                    now(),
                ],
            )?;
            created += 1;
        }
        tx.commit()?;

        tracing::info!(
            "Created {} due date notifications for organization {}",
            created,
            organization_id
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewOrganization, NewProject, NewTask, NewUser, TaskStatus, UserRole};

    struct Fixture {
        store: Store,
        org: i64,
        user: i64,
        project: i64,
    }

    fn fixture() -> Fixture {
        let store = Store::open_in_memory().unwrap();
        let org = store
            .create_organization(&NewOrganization::named("Acme"))
            .unwrap()
            .id;
        let user = store
            .create_user(&NewUser::new(org, "Dev", "dev@acme.io", UserRole::Member))
            .unwrap()
            .id;
        let project = store
            .create_project(&NewProject::new(org, "Website", user))
            .unwrap()
            .id;
        Fixture { store, org, user, project }
    }

    fn reminder(user: i64, title: &str) -> NewNotification {
        NewNotification {
            user_id: user,
            task_id: None,
            project_id: None,
            kind: NotificationType::ProjectUpdate,
            title: title.into(),
            message: "details".into(),
            days_until_due: None,
        }
    }

    #[test]
    fn test_list_and_mark_read() {
        let f = fixture();
        let first = f.store.create_notification(&reminder(f.user, "one")).unwrap();
        f.store.create_notification(&reminder(f.user, "two")).unwrap();
        f.store.create_notification(&reminder(f.user, "three")).unwrap();

        assert_eq!(f.store.list_notifications(f.user, 2, false).unwrap().len(), 2);
        assert_eq!(f.store.unread_notification_count(f.user).unwrap(), 3);

        assert!(f.store.mark_notification_read(first.id, f.user).unwrap());
        let unread = f.store.list_notifications(f.user, 10, true).unwrap();
        assert_eq!(unread.len(), 2);
        assert!(unread.iter().all(|n| !n.is_read));

        assert_eq!(f.store.mark_all_notifications_read(f.user).unwrap(), 2);
        assert_eq!(f.store.unread_notification_count(f.user).unwrap(), 0);
    }

    #[test]
    fn test_mark_read_is_scoped_to_owner() {
        let f = fixture();
        let other = f
            .store
            .create_user(&NewUser::new(f.org, "Other", "other@acme.io", UserRole::Member))
            .unwrap()
            .id;
        let note = f.store.create_notification(&reminder(f.user, "mine")).unwrap();
        assert!(!f.store.mark_notification_read(note.id, other).unwrap());
        assert_eq!(f.store.unread_notification_count(f.user).unwrap(), 1);
    }

    #[test]
    fn test_cleanup_keeps_recent() {
        let f = fixture();
        f.store.create_notification(&reminder(f.user, "fresh")).unwrap();
        f.store
            .conn
            .execute(
                "INSERT INTO notifications (user_id, type, title, message, created_at)
                 VALUES (?1, 'project_update', 'stale', 'old', '2020-01-01 00:00:00')",
                [f.user],
            )
            .unwrap();

        assert_eq!(f.store.cleanup_notifications(30).unwrap(), 1);
        let left = f.store.list_notifications(f.user, 10, false).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].title, "fresh");
    }

    #[test]
    fn test_generate_due_notifications_once_per_day() {
        let mut f = fixture();
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        for (title, offset, status, assigned) in [
            ("Ship", 0, TaskStatus::Pending, true),
            ("Review", 1, TaskStatus::InProgress, true),
            ("Plan", 5, TaskStatus::Pending, true),
            ("Done", 1, TaskStatus::Completed, true),
            ("Nobody", 1, TaskStatus::Pending, false),
            ("Later", 9, TaskStatus::Pending, true),
        ] {
            let mut input = NewTask::new(f.project, title, f.user);
            input.due_date = today.checked_add_days(Days::new(offset));
            input.status = status;
            input.assigned_to = assigned.then_some(f.user);
            f.store.create_task(&input).unwrap();
        }

        assert_eq!(f.store.generate_due_notifications(f.org, today, 7).unwrap(), 3);
        assert_eq!(f.store.generate_due_notifications(f.org, today, 7).unwrap(), 0);

        let mut titles: Vec<String> = f
            .store
            .list_notifications(f.user, 10, false)
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        titles.sort();
        assert_eq!(
            titles,
            vec!["Task Due Today: Ship", "Task Due Tomorrow: Review", "Task Due in 5 Days: Plan"]
        );
    }

    #[test]
    fn test_task_deletion_removes_its_notifications() {
        let mut f = fixture();
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut input = NewTask::new(f.project, "Ship", f.user);
        input.due_date = Some(today);
        input.assigned_to = Some(f.user);
        let task = f.store.create_task(&input).unwrap();
        f.store.generate_due_notifications(f.org, today, 3).unwrap();

        f.store.delete_task(task.id).unwrap();
        assert_eq!(f.store.count_rows("notifications").unwrap(), 0);
    }
}
