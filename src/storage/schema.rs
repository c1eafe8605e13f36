//! Database schema definitions
//!
//! Enum domains are `CHECK` constraints; the literals and defaults are part of
//! the on-disk contract. Creator columns on `milestones` and `tasks` carry no
//! `ON DELETE` action: SQLite checks them at the end of the deleting
//! statement, so a user who still authors rows cannot be deleted, while
//! deleting the owning project or organization removes both in one go.

/// SQL to create the organizations table
pub const CREATE_ORGANIZATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS organizations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the users table
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    phone TEXT,
    role TEXT NOT NULL DEFAULT 'member' CHECK (role IN ('admin', 'manager', 'member')),
    is_active INTEGER NOT NULL DEFAULT 1,
    avatar_url TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the projects table
pub const CREATE_PROJECTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'planning' CHECK (status IN ('planning', 'active', 'completed', 'on_hold')),
    visibility TEXT NOT NULL DEFAULT 'all' CHECK (visibility IN ('all', 'specific')),
    start_date TEXT,
    end_date TEXT,
    created_by INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    assigned_manager_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the project_members table (team membership)
pub const CREATE_PROJECT_MEMBERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS project_members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL DEFAULT 'member' CHECK (role IN ('manager', 'member')),
    joined_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(project_id, user_id)
)
"#;

/// SQL to create the project_visibility table (grants for `specific` projects)
pub const CREATE_PROJECT_VISIBILITY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS project_visibility (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    UNIQUE(project_id, user_id)
)
"#;

/// SQL to create the milestones table
pub const CREATE_MILESTONES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS milestones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT,
    due_date TEXT,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'in_progress', 'completed', 'overdue')),
    completion_date TEXT,
    created_by INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the tasks table
pub const CREATE_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    milestone_id INTEGER REFERENCES milestones(id) ON DELETE SET NULL,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'in_progress', 'completed')),
    priority TEXT NOT NULL DEFAULT 'medium' CHECK (priority IN ('low', 'medium', 'high')),
    assigned_to INTEGER REFERENCES users(id) ON DELETE SET NULL,
    due_date TEXT,
    completion_date TEXT,
    created_by INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the task_comments table
pub const CREATE_TASK_COMMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS task_comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the messages table
pub const CREATE_MESSAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    recipient_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    project_id INTEGER REFERENCES projects(id) ON DELETE SET NULL,
    subject TEXT NOT NULL,
    content TEXT NOT NULL,
    read_at TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the notifications table
pub const CREATE_NOTIFICATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    task_id INTEGER REFERENCES tasks(id) ON DELETE CASCADE,
    project_id INTEGER REFERENCES projects(id) ON DELETE CASCADE,
    type TEXT NOT NULL DEFAULT 'task_due_soon' CHECK (type IN ('task_due_soon', 'task_overdue', 'task_assigned', 'project_update', 'milestone_due')),
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    days_until_due INTEGER,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the daily_reports table
pub const CREATE_DAILY_REPORTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS daily_reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    project_id INTEGER REFERENCES projects(id) ON DELETE SET NULL,
    report_date TEXT NOT NULL,
    work_title TEXT NOT NULL,
    work_description TEXT,
    status TEXT NOT NULL DEFAULT 'completed' CHECK (status IN ('completed', 'in_progress', 'pending', 'blocked')),
    discussion TEXT,
    visible_to_manager INTEGER NOT NULL DEFAULT 0,
    visible_to_admin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the daily_report_modules table
pub const CREATE_DAILY_REPORT_MODULES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS daily_report_modules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id INTEGER NOT NULL REFERENCES daily_reports(id) ON DELETE CASCADE,
    module_name TEXT NOT NULL,
    total_hours REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the daily_report_tasks table
pub const CREATE_DAILY_REPORT_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS daily_report_tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id INTEGER NOT NULL REFERENCES daily_reports(id) ON DELETE CASCADE,
    module_id INTEGER REFERENCES daily_report_modules(id) ON DELETE SET NULL,
    task_name TEXT NOT NULL,
    task_hours REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the documents table
pub const CREATE_DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    project_id INTEGER REFERENCES projects(id) ON DELETE SET NULL,
    uploaded_by INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    parent_document_id INTEGER REFERENCES documents(id) ON DELETE SET NULL,
    title TEXT NOT NULL,
    description TEXT,
    filename TEXT NOT NULL,
    file_path TEXT NOT NULL,
    file_size INTEGER,
    file_type TEXT,
    file_extension TEXT,
    tags TEXT,
    version INTEGER NOT NULL DEFAULT 1,
    is_active INTEGER NOT NULL DEFAULT 1,
    download_count INTEGER NOT NULL DEFAULT 0,
    last_downloaded_at TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the document_permissions table
pub const CREATE_DOCUMENT_PERMISSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS document_permissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    role TEXT CHECK (role IS NULL OR role IN ('admin', 'manager', 'member')),
    permission_type TEXT NOT NULL CHECK (permission_type IN ('view', 'download', 'edit', 'delete')),
    granted_by INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_users_organization ON users(organization_id)",
    "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role)",
    "CREATE INDEX IF NOT EXISTS idx_projects_organization ON projects(organization_id)",
    "CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status)",
    "CREATE INDEX IF NOT EXISTS idx_projects_creator ON projects(created_by)",
    "CREATE INDEX IF NOT EXISTS idx_projects_manager ON projects(assigned_manager_id)",
    "CREATE INDEX IF NOT EXISTS idx_project_members_user ON project_members(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_project_visibility_user ON project_visibility(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_milestones_project ON milestones(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_milestones_created_by ON milestones(created_by)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_milestone ON tasks(milestone_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks(assigned_to)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_created_by ON tasks(created_by)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(due_date)",
    "CREATE INDEX IF NOT EXISTS idx_task_comments_task ON task_comments(task_id)",
    "CREATE INDEX IF NOT EXISTS idx_task_comments_user ON task_comments(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_recipient ON messages(recipient_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_project ON messages(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_task ON notifications(task_id)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_project ON notifications(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_daily_reports_user ON daily_reports(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_daily_reports_organization ON daily_reports(organization_id)",
    "CREATE INDEX IF NOT EXISTS idx_daily_reports_project ON daily_reports(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_daily_report_modules_report ON daily_report_modules(report_id)",
    "CREATE INDEX IF NOT EXISTS idx_daily_report_tasks_report ON daily_report_tasks(report_id)",
    "CREATE INDEX IF NOT EXISTS idx_daily_report_tasks_module ON daily_report_tasks(module_id)",
    "CREATE INDEX IF NOT EXISTS idx_documents_org ON documents(organization_id)",
    "CREATE INDEX IF NOT EXISTS idx_documents_project ON documents(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_documents_user ON documents(uploaded_by)",
    "CREATE INDEX IF NOT EXISTS idx_documents_parent ON documents(parent_document_id)",
    "CREATE INDEX IF NOT EXISTS idx_document_permissions_document ON document_permissions(document_id)",
    "CREATE INDEX IF NOT EXISTS idx_document_permissions_user ON document_permissions(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_document_permissions_granted_by ON document_permissions(granted_by)",
];

/// Every table, in creation (dependency) order
pub const TABLES: &[&str] = &[
    "organizations",
    "users",
    "projects",
    "project_members",
    "project_visibility",
    "milestones",
    "tasks",
    "task_comments",
    "messages",
    "notifications",
    "daily_reports",
    "daily_report_modules",
    "daily_report_tasks",
    "documents",
    "document_permissions",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_ORGANIZATIONS_TABLE,
        CREATE_USERS_TABLE,
        CREATE_PROJECTS_TABLE,
        CREATE_PROJECT_MEMBERS_TABLE,
        CREATE_PROJECT_VISIBILITY_TABLE,
        CREATE_MILESTONES_TABLE,
        CREATE_TASKS_TABLE,
        CREATE_TASK_COMMENTS_TABLE,
        CREATE_MESSAGES_TABLE,
        CREATE_NOTIFICATIONS_TABLE,
        CREATE_DAILY_REPORTS_TABLE,
        CREATE_DAILY_REPORT_MODULES_TABLE,
        CREATE_DAILY_REPORT_TASKS_TABLE,
        CREATE_DOCUMENTS_TABLE,
        CREATE_DOCUMENT_PERMISSIONS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
