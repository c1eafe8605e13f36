use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    #[default]
    TaskDueSoon,
    TaskOverdue,
    TaskAssigned,
    ProjectUpdate,
    MilestoneDue,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::TaskDueSoon => "task_due_soon",
            NotificationType::TaskOverdue => "task_overdue",
            NotificationType::TaskAssigned => "task_assigned",
            NotificationType::ProjectUpdate => "project_update",
            NotificationType::MilestoneDue => "milestone_due",
        }
    }
}

impl FromStr for NotificationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "task_due_soon" => Ok(NotificationType::TaskDueSoon),
            "task_overdue" => Ok(NotificationType::TaskOverdue),
            "task_assigned" => Ok(NotificationType::TaskAssigned),
            "project_update" => Ok(NotificationType::ProjectUpdate),
            "milestone_due" => Ok(NotificationType::MilestoneDue),
            _ => Err(Error::InvalidValue(format!("Unknown notification type: {}", s))),
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub task_id: Option<i64>,
    pub project_id: Option<i64>,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub days_until_due: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: i64,
    pub task_id: Option<i64>,
    pub project_id: Option<i64>,
    #[serde(default)]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub days_until_due: Option<i64>,
}

/// Title and body for a due-soon reminder `days` days before the due date
pub fn due_soon_text(task_title: &str, project_name: &str, days: i64) -> (String, String) {
    match days {
        0 => (
            format!("Task Due Today: {}", task_title),
            format!(
                "Your task '{}' in project '{}' is due today!",
                task_title, project_name
            ),
        ),
        1 => (
            format!("Task Due Tomorrow: {}", task_title),
            format!(
                "Your task '{}' in project '{}' is due tomorrow.",
                task_title, project_name
            ),
        ),
        n => (
            format!("Task Due in {} Days: {}", n, task_title),
            format!(
                "Your task '{}' in project '{}' is due in {} days.",
                task_title, project_name, n
            ),
        ),
    }
}
