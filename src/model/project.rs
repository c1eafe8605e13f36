use super::User;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Project lifecycle status.
///
/// ```text
/// planning ──► active ──► completed
///    │          ▲  │          ▲
///    │          │  ▼          │
///    │        on_hold ────────┘
///    └────────────────────────┘
/// ```
///
/// `completed` is terminal. Entering it removes every team membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::OnHold => "on_hold",
        }
    }

    pub fn all() -> &'static [ProjectStatus] {
        &[
            ProjectStatus::Planning,
            ProjectStatus::Active,
            ProjectStatus::Completed,
            ProjectStatus::OnHold,
        ]
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed)
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Re-applying the current status is always allowed (and is a no-op).
    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;

        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Planning, Active)
                | (Planning, Completed)
                | (Active, Completed)
                | (Active, OnHold)
                | (OnHold, Active)
                | (OnHold, Completed)
        )
    }
}

impl FromStr for ProjectStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "planning" => Ok(ProjectStatus::Planning),
            "active" => Ok(ProjectStatus::Active),
            "completed" => Ok(ProjectStatus::Completed),
            "on_hold" | "on-hold" => Ok(ProjectStatus::OnHold),
            _ => Err(Error::InvalidValue(format!("Unknown project status: {}", s))),
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who may see a project: the whole organization, or explicit grantees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectVisibilityMode {
    #[default]
    All,
    Specific,
}

impl ProjectVisibilityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectVisibilityMode::All => "all",
            ProjectVisibilityMode::Specific => "specific",
        }
    }
}

impl FromStr for ProjectVisibilityMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ProjectVisibilityMode::All),
            "specific" => Ok(ProjectVisibilityMode::Specific),
            _ => Err(Error::InvalidValue(format!("Unknown project visibility: {}", s))),
        }
    }
}

impl std::fmt::Display for ProjectVisibilityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-project role of a team member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Manager,
    #[default]
    Member,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Manager => "manager",
            ProjectRole::Member => "member",
        }
    }
}

impl FromStr for ProjectRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "manager" => Ok(ProjectRole::Manager),
            "member" => Ok(ProjectRole::Member),
            _ => Err(Error::InvalidValue(format!("Unknown project role: {}", s))),
        }
    }
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub visibility: ProjectVisibilityMode,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_by: i64,
    pub assigned_manager_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Whether `date` lies within the project's date range.
    ///
    /// Projects without both bounds accept any date.
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    pub organization_id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub visibility: ProjectVisibilityMode,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_by: i64,
    pub assigned_manager_id: Option<i64>,
}

impl NewProject {
    pub fn new(organization_id: i64, name: impl Into<String>, created_by: i64) -> Self {
        Self {
            organization_id,
            name: name.into(),
            description: None,
            status: ProjectStatus::default(),
            visibility: ProjectVisibilityMode::default(),
            start_date: None,
            end_date: None,
            created_by,
            assigned_manager_id: None,
        }
    }
}

/// Partial project update. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub assigned_manager_id: Option<Option<i64>>,
}

/// Outcome of a status change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub project: Project,
    pub previous: ProjectStatus,
    /// Team memberships removed by auto-unassignment
    pub unassigned: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
}

/// Explicit view grant for a project with `specific` visibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectVisibilityGrant {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
}

/// Project summary attached to a member candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: i64,
    pub name: String,
    pub status: ProjectStatus,
}

/// An active `member`-role user who could join a team, with the open
/// (planning or active) projects they already work on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableMember {
    pub user: User,
    pub current_projects: Vec<ProjectRef>,
}

/// Why a user may receive task assignments in a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignableRole {
    Administrator,
    ProjectManager,
    TeamMember,
}

impl AssignableRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignableRole::Administrator => "administrator",
            AssignableRole::ProjectManager => "project_manager",
            AssignableRole::TeamMember => "team_member",
        }
    }
}

impl std::fmt::Display for AssignableRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignableMember {
    pub user: User,
    pub project_role: AssignableRole,
}
