use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Work status recorded on a daily report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Completed,
    InProgress,
    Pending,
    Blocked,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Completed => "completed",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Pending => "pending",
            ReportStatus::Blocked => "blocked",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "completed" => Ok(ReportStatus::Completed),
            "in_progress" => Ok(ReportStatus::InProgress),
            "pending" => Ok(ReportStatus::Pending),
            "blocked" => Ok(ReportStatus::Blocked),
            _ => Err(Error::InvalidValue(format!("Unknown report status: {}", s))),
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub id: i64,
    pub user_id: i64,
    pub organization_id: i64,
    pub project_id: Option<i64>,
    pub report_date: NaiveDate,
    pub work_title: String,
    pub work_description: Option<String>,
    pub status: ReportStatus,
    pub discussion: Option<String>,
    pub visible_to_manager: bool,
    pub visible_to_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReportModule {
    pub id: i64,
    pub report_id: i64,
    pub module_name: String,
    pub total_hours: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReportTask {
    pub id: i64,
    pub report_id: i64,
    pub module_id: Option<i64>,
    pub task_name: String,
    pub task_hours: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A module together with the hour entries filed under it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleWithTasks {
    #[serde(flatten)]
    pub module: DailyReportModule,
    pub tasks: Vec<DailyReportTask>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReportDetail {
    #[serde(flatten)]
    pub report: DailyReport,
    pub modules: Vec<ModuleWithTasks>,
    /// Hour entries not filed under any module
    pub loose_tasks: Vec<DailyReportTask>,
}

impl DailyReportDetail {
    pub fn total_hours(&self) -> f64 {
        let in_modules: f64 = self.modules.iter().map(|m| m.module.total_hours).sum();
        let loose: f64 = self.loose_tasks.iter().map(|t| t.task_hours).sum();
        in_modules + loose
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReportTask {
    pub task_name: String,
    pub task_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReportModule {
    pub module_name: String,
    #[serde(default)]
    pub tasks: Vec<NewReportTask>,
}

impl NewReportModule {
    /// Module total is the sum of its task entries
    pub fn total_hours(&self) -> f64 {
        self.tasks.iter().map(|t| t.task_hours).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDailyReport {
    pub user_id: i64,
    pub organization_id: i64,
    pub project_id: Option<i64>,
    pub report_date: NaiveDate,
    pub work_title: String,
    pub work_description: Option<String>,
    #[serde(default)]
    pub status: ReportStatus,
    pub discussion: Option<String>,
    #[serde(default)]
    pub visible_to_manager: bool,
    #[serde(default)]
    pub visible_to_admin: bool,
    #[serde(default)]
    pub modules: Vec<NewReportModule>,
    #[serde(default)]
    pub loose_tasks: Vec<NewReportTask>,
}

impl NewDailyReport {
    pub fn new(
        user_id: i64,
        organization_id: i64,
        report_date: NaiveDate,
        work_title: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            organization_id,
            project_id: None,
            report_date,
            work_title: work_title.into(),
            work_description: None,
            status: ReportStatus::default(),
            discussion: None,
            visible_to_manager: false,
            visible_to_admin: false,
            modules: Vec::new(),
            loose_tasks: Vec::new(),
        }
    }
}
