use crate::{Error, Result};
use crate::model::UserRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Uploaded file metadata. Documents are soft-deleted via `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub organization_id: i64,
    pub project_id: Option<i64>,
    pub uploaded_by: i64,
    /// Previous version this document supersedes
    pub parent_document_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub filename: String,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub file_extension: Option<String>,
    pub tags: Option<String>,
    pub version: i64,
    pub is_active: bool,
    pub download_count: i64,
    pub last_downloaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub organization_id: i64,
    pub project_id: Option<i64>,
    pub uploaded_by: i64,
    pub title: String,
    pub description: Option<String>,
    pub filename: String,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub tags: Option<String>,
}

impl NewDocument {
    pub fn new(
        organization_id: i64,
        uploaded_by: i64,
        title: impl Into<String>,
        filename: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            organization_id,
            project_id: None,
            uploaded_by,
            title: title.into(),
            description: None,
            filename: filename.into(),
            file_path: file_path.into(),
            file_size: None,
            file_type: None,
            tags: None,
        }
    }

    /// Lower-cased extension of the title (the original file name), with dot
    pub fn file_extension(&self) -> Option<String> {
        std::path::Path::new(&self.title)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    View,
    Download,
    Edit,
    Delete,
}

impl PermissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionType::View => "view",
            PermissionType::Download => "download",
            PermissionType::Edit => "edit",
            PermissionType::Delete => "delete",
        }
    }

    /// Edit and delete require management rights; view and download do not
    pub fn is_management(&self) -> bool {
        matches!(self, PermissionType::Edit | PermissionType::Delete)
    }
}

impl FromStr for PermissionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "view" => Ok(PermissionType::View),
            "download" => Ok(PermissionType::Download),
            "edit" => Ok(PermissionType::Edit),
            "delete" => Ok(PermissionType::Delete),
            _ => Err(Error::InvalidValue(format!("Unknown permission type: {}", s))),
        }
    }
}

impl std::fmt::Display for PermissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recipient of a document permission: one user, or everyone with a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grantee {
    User(i64),
    Role(UserRole),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPermission {
    pub id: i64,
    pub document_id: i64,
    /// Null for role grants, and after the grantee user is deleted
    pub user_id: Option<i64>,
    pub role: Option<UserRole>,
    pub permission: PermissionType,
    pub granted_by: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension_from_title() {
        let doc = NewDocument::new(1, 1, "Spec.PDF", "abc123.pdf", "/uploads/abc123.pdf");
        assert_eq!(doc.file_extension().as_deref(), Some(".pdf"));

        let doc = NewDocument::new(1, 1, "README", "abc", "/uploads/abc");
        assert_eq!(doc.file_extension(), None);
    }
}
