//! Read-only summaries: dashboards and project, user and organization reports

use super::{MilestoneStatus, Organization, Project, ProjectStatus, User, UserRole};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive date window for report filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::Validation(format!(
                "date range ends ({}) before it starts ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Headline counts for an organization, or for the projects one manager runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub projects_total: usize,
    pub projects_active: usize,
    pub projects_completed: usize,
    pub tasks_total: usize,
    pub tasks_completed: usize,
    /// Organization users, or distinct assignees on a manager dashboard
    pub users_total: usize,
    pub overdue_tasks: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub overdue: usize,
}

impl TaskStats {
    /// Completed share in percent; 0 for an empty project
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 * 100.0 / self.total as f64
    }
}

/// Task counts for one team member within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPerformance {
    pub user_id: i64,
    pub full_name: String,
    pub email: String,
    pub assigned_tasks: usize,
    pub completed_tasks: usize,
    pub overdue_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneProgress {
    pub milestone_id: i64,
    pub name: String,
    pub due_date: Option<NaiveDate>,
    pub status: MilestoneStatus,
    pub total_tasks: usize,
    pub completed_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCompletion {
    pub date: NaiveDate,
    pub tasks_completed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectReport {
    pub project: Project,
    pub created_by_name: String,
    pub task_stats: TaskStats,
    pub team_performance: Vec<MemberPerformance>,
    pub milestones: Vec<MilestoneProgress>,
    /// Completions per day, restricted to the requested range if any
    pub daily_completions: Vec<DailyCompletion>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserTaskStats {
    pub total_assigned: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub overdue: usize,
    /// Mean of completion minus due date over completed, dated tasks.
    /// Negative means early.
    pub avg_delay_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInvolvement {
    pub project_id: i64,
    pub name: String,
    pub status: ProjectStatus,
    pub assigned_tasks: usize,
    pub completed_tasks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReport {
    pub user: User,
    pub organization_name: String,
    pub task_stats: UserTaskStats,
    pub projects: Vec<ProjectInvolvement>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationStats {
    pub total_projects: usize,
    pub active_projects: usize,
    pub completed_projects: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub total_users: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopPerformer {
    pub user_id: i64,
    pub full_name: String,
    pub role: UserRole,
    pub assigned_tasks: usize,
    pub completed_tasks: usize,
    pub overdue_tasks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationReport {
    pub organization: Organization,
    pub stats: OrganizationStats,
    /// Up to ten users with assigned tasks, most completions first
    pub top_performers: Vec<TopPerformer>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_range_rejected() {
        let a = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert!(matches!(DateRange::new(b, a), Err(Error::Validation(_))));
        let range = DateRange::new(a, b).unwrap();
        assert!(range.contains(a) && range.contains(b));
        assert!(!range.contains(b.succ_opt().unwrap()));
    }

    #[test]
    fn test_completion_rate() {
        assert_eq!(TaskStats::default().completion_rate(), 0.0);
        let stats = TaskStats {
            total: 4,
            completed: 1,
            ..Default::default()
        };
        assert_eq!(stats.completion_rate(), 25.0);
    }
}
