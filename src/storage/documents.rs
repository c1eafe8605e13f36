//! Documents, versions and per-document permissions
//!
//! Documents are never hard-deleted through the store: `deactivate_document`
//! clears `is_active` and the row stays readable by id. Inactive documents
//! deny every permission.

use super::projects::require_project;
use super::sqlite::{enum_column, ensure_user_in_org, now, optional_enum_column, Store};
use super::team::is_member;
use super::users::require_user;
use crate::model::{Document, DocumentPermission, Grantee, NewDocument, PermissionType};
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

const DOCUMENT_COLUMNS: &str = "id, organization_id, project_id, uploaded_by, parent_document_id, title, description, filename, file_path, file_size, file_type, file_extension, tags, version, is_active, download_count, last_downloaded_at, created_at, updated_at";

const PERMISSION_COLUMNS: &str = "id, document_id, user_id, role, permission_type, granted_by, created_at";

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        project_id: row.get(2)?,
        uploaded_by: row.get(3)?,
        parent_document_id: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        filename: row.get(7)?,
        file_path: row.get(8)?,
        file_size: row.get(9)?,
        file_type: row.get(10)?,
        file_extension: row.get(11)?,
        tags: row.get(12)?,
        version: row.get(13)?,
        is_active: row.get(14)?,
        download_count: row.get(15)?,
        last_downloaded_at: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn row_to_permission(row: &rusqlite::Row) -> rusqlite::Result<DocumentPermission> {
    Ok(DocumentPermission {
        id: row.get(0)?,
        document_id: row.get(1)?,
        user_id: row.get(2)?,
        role: optional_enum_column(row, 3)?,
        permission: enum_column(row, 4)?,
        granted_by: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn require_document(conn: &Connection, id: i64) -> Result<Document> {
    conn.query_row(
        &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
        [id],
        row_to_document,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("Document", id))
}

/// Validate tenant references and insert; `version`/`parent` come from the
/// caller
fn insert_document(conn: &Connection, input: &NewDocument, version: i64, parent: Option<i64>) -> Result<i64> {
    if input.title.trim().is_empty() || input.filename.trim().is_empty() {
        return Err(Error::Validation("document title and filename are required".into()));
    }
    ensure_user_in_org(conn, "Document uploader", input.uploaded_by, input.organization_id)?;
    if let Some(project_id) = input.project_id {
        let project = require_project(conn, project_id)?;
        if project.organization_id != input.organization_id {
            return Err(Error::OrganizationMismatch {
                entity: "Document project",
                expected: input.organization_id,
                found: project.organization_id,
            });
        }
    }

    let ts = now();
    conn.execute(
        r#"
        INSERT INTO documents (organization_id, project_id, uploaded_by, parent_document_id, title, description,
                               filename, file_path, file_size, file_type, file_extension, tags, version,
                               created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
        "#,
        params![
            input.organization_id,
            input.project_id,
            input.uploaded_by,
            parent,
            input.title,
            input.description,
            input.filename,
            input.file_path,
            input.file_size,
            input.file_type,
            input.file_extension(),
            input.tags,
            version,
            ts,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn has_explicit_grant(conn: &Connection, document_id: i64, user_id: i64, role: &str, permission: PermissionType) -> Result<bool> {
    let found: i64 = conn.query_row(
        r#"
        SELECT COUNT(*) FROM document_permissions
        WHERE document_id = ?1 AND permission_type = ?2 AND (user_id = ?3 OR role = ?4)
        "#,
        params![document_id, permission.as_str(), user_id, role],
        |row| row.get(0),
    )?;
    Ok(found > 0)
}

impl Store {
    pub fn create_document(&self, input: &NewDocument) -> Result<Document> {
        let id = insert_document(&self.conn, input, 1, None)?;
        tracing::debug!("Stored document '{}' ({}) for organization {}", input.title, id, input.organization_id);
        self.get_document(id)
    }

    /// Store a new version of `parent_id`: one version higher, linked to the
    /// parent, in the parent's organization
    pub fn create_document_version(&mut self, parent_id: i64, input: &NewDocument) -> Result<Document> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let parent = require_document(&tx, parent_id)?;
        if !parent.is_active {
            return Err(Error::Validation(format!("document {} is inactive", parent_id)));
        }
        if input.organization_id != parent.organization_id {
            return Err(Error::OrganizationMismatch {
                entity: "Document version",
                expected: parent.organization_id,
                found: input.organization_id,
            });
        }
        let id = insert_document(&tx, input, parent.version + 1, Some(parent.id))?;
        let document = require_document(&tx, id)?;
        tx.commit()?;
        Ok(document)
    }

    /// Fetch by id, active or not
    pub fn get_document(&self, id: i64) -> Result<Document> {
        require_document(&self.conn, id)
    }

    /// Active documents of an organization, newest first
    pub fn list_organization_documents(&self, organization_id: i64) -> Result<Vec<Document>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM documents WHERE organization_id = ?1 AND is_active = 1 ORDER BY created_at DESC, id DESC",
            DOCUMENT_COLUMNS
        ))?;
        let documents = stmt
            .query_map([organization_id], row_to_document)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(documents)
    }

    /// Active documents the user may view
    pub fn list_viewable_documents(&self, user_id: i64) -> Result<Vec<Document>> {
        let user = require_user(&self.conn, user_id)?;
        let mut viewable = Vec::new();
        for document in self.list_organization_documents(user.organization_id)? {
            if self.can_access_document(user_id, document.id, PermissionType::View)? {
                viewable.push(document);
            }
        }
        Ok(viewable)
    }

    /// Soft delete. Returns whether the document was active.
    pub fn deactivate_document(&self, id: i64) -> Result<bool> {
        require_document(&self.conn, id)?;
        let updated = self.conn.execute(
            "UPDATE documents SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
            params![now(), id],
        )?;
        if updated > 0 {
            tracing::info!("Document {} deactivated", id);
        }
        Ok(updated > 0)
    }

    /// Count a download of an active document
    pub fn record_download(&self, id: i64) -> Result<Document> {
        let document = self.get_document(id)?;
        if !document.is_active {
            return Err(Error::Validation(format!("document {} is inactive", id)));
        }
        self.conn.execute(
            r#"
            UPDATE documents SET download_count = download_count + 1, last_downloaded_at = ?1
            WHERE id = ?2
            "#,
            params![now(), id],
        )?;
        self.get_document(id)
    }

    /// Grant a permission to one user or to every user with a role.
    ///
    /// The granter needs management rights on the document; a user grantee
    /// must belong to the document's organization.
    pub fn grant_document_permission(
        &self,
        document_id: i64,
        grantee: Grantee,
        permission: PermissionType,
        granted_by: i64,
    ) -> Result<DocumentPermission> {
        let document = self.get_document(document_id)?;
        ensure_user_in_org(&self.conn, "Permission granter", granted_by, document.organization_id)?;
        if !self.can_access_document(granted_by, document_id, PermissionType::Edit)? {
            return Err(Error::Validation(format!(
                "user {} cannot manage document {}",
                granted_by, document_id
            )));
        }
        let (user_id, role) = match grantee {
            Grantee::User(user_id) => {
                ensure_user_in_org(&self.conn, "Permission grantee", user_id, document.organization_id)?;
                (Some(user_id), None)
            }
            Grantee::Role(role) => (None, Some(role.as_str())),
        };

        self.conn.execute(
            r#"
            INSERT INTO document_permissions (document_id, user_id, role, permission_type, granted_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![document_id, user_id, role, permission.as_str(), granted_by, now()],
        )?;
        let id = self.conn.last_insert_rowid();
        self.conn
            .query_row(
                &format!("SELECT {} FROM document_permissions WHERE id = ?1", PERMISSION_COLUMNS),
                [id],
                row_to_permission,
            )
            .map_err(Into::into)
    }

    pub fn revoke_document_permission(&self, permission_id: i64) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM document_permissions WHERE id = ?1",
            [permission_id],
        )?;
        Ok(removed > 0)
    }

    pub fn list_document_permissions(&self, document_id: i64) -> Result<Vec<DocumentPermission>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM document_permissions WHERE document_id = ?1 ORDER BY id",
            PERMISSION_COLUMNS
        ))?;
        let permissions = stmt
            .query_map([document_id], row_to_permission)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(permissions)
    }

    /// Whether `user_id` holds `permission` on the document.
    ///
    /// Admins and the uploader hold every permission, as does anyone with an
    /// explicit grant (for the user or the user's role). View and download
    /// also extend to org-wide documents and to the project's manager and
    /// team; edit and delete also extend to the project's manager.
    pub fn can_access_document(&self, user_id: i64, document_id: i64, permission: PermissionType) -> Result<bool> {
        let user = require_user(&self.conn, user_id)?;
        let document = self.get_document(document_id)?;
        if !document.is_active || document.organization_id != user.organization_id {
            return Ok(false);
        }
        if user.is_admin() || document.uploaded_by == user.id {
            return Ok(true);
        }
        if has_explicit_grant(&self.conn, document.id, user.id, user.role.as_str(), permission)? {
            return Ok(true);
        }

        let Some(project_id) = document.project_id else {
            return Ok(!permission.is_management());
        };
        let project = require_project(&self.conn, project_id)?;
        if project.assigned_manager_id == Some(user.id) {
            return Ok(true);
        }
        if permission.is_management() {
            return Ok(false);
        }
        is_member(&self.conn, project_id, user.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewOrganization, NewProject, NewUser, ProjectRole, UserRole};

    struct Fixture {
        store: Store,
        org: i64,
        admin: i64,
        manager: i64,
        uploader: i64,
        member: i64,
        outsider: i64,
        project: i64,
    }

    fn fixture() -> Fixture {
        let mut store = Store::open_in_memory().unwrap();
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
        let uploader = mk("uploader@acme.io", UserRole::Member);
        let member = mk("member@acme.io", UserRole::Member);
        let outsider = mk("outsider@acme.io", UserRole::Member);

        let mut project = NewProject::new(org, "Website", admin);
        project.assigned_manager_id = Some(manager);
        let project = store.create_project(&project).unwrap().id;
        store
            .add_project_member(project, member, ProjectRole::Member)
            .unwrap();
        Fixture { store, org, admin, manager, uploader, member, outsider, project }
    }

    fn project_doc(f: &Fixture) -> Document {
        let mut input = NewDocument::new(f.org, f.uploader, "Brief.PDF", "a1b2.pdf", "/uploads/a1b2.pdf");
        input.project_id = Some(f.project);
        f.store.create_document(&input).unwrap()
    }

    #[test]
    fn test_create_sets_extension_and_version() {
        let f = fixture();
        let doc = project_doc(&f);
        assert_eq!(doc.version, 1);
        assert_eq!(doc.file_extension.as_deref(), Some(".pdf"));
        assert!(doc.is_active);
        assert_eq!(doc.download_count, 0);
    }

    #[test]
    fn test_project_document_access() {
        let f = fixture();
        let doc = project_doc(&f).id;
        let can = |user, perm| f.store.can_access_document(user, doc, perm).unwrap();

        assert!(can(f.admin, PermissionType::Delete));
        assert!(can(f.uploader, PermissionType::Delete));
        assert!(can(f.manager, PermissionType::Edit));
        assert!(can(f.member, PermissionType::Download));
        assert!(!can(f.member, PermissionType::Edit));
        assert!(!can(f.outsider, PermissionType::View));
    }

    #[test]
    fn test_org_wide_document_is_viewable() {
        let f = fixture();
        let doc = f
            .store
            .create_document(&NewDocument::new(f.org, f.uploader, "Handbook.md", "h.md", "/uploads/h.md"))
            .unwrap()
            .id;
        assert!(f.store.can_access_document(f.outsider, doc, PermissionType::View).unwrap());
        assert!(!f.store.can_access_document(f.outsider, doc, PermissionType::Delete).unwrap());
        assert_eq!(f.store.list_viewable_documents(f.outsider).unwrap().len(), 1);
    }

    #[test]
    fn test_explicit_grants() {
        let f = fixture();
        let doc = project_doc(&f).id;

        let grant = f
            .store
            .grant_document_permission(doc, Grantee::User(f.outsider), PermissionType::View, f.uploader)
            .unwrap();
        assert_eq!(grant.user_id, Some(f.outsider));
        assert_eq!(grant.role, None);
        assert!(f.store.can_access_document(f.outsider, doc, PermissionType::View).unwrap());
        assert!(!f.store.can_access_document(f.outsider, doc, PermissionType::Download).unwrap());

        f.store
            .grant_document_permission(doc, Grantee::Role(UserRole::Member), PermissionType::Edit, f.manager)
            .unwrap();
        assert!(f.store.can_access_document(f.member, doc, PermissionType::Edit).unwrap());

        assert!(f.store.revoke_document_permission(grant.id).unwrap());
        assert!(!f.store.can_access_document(f.outsider, doc, PermissionType::View).unwrap());
        assert_eq!(f.store.list_document_permissions(doc).unwrap().len(), 1);
    }

    #[test]
    fn test_grant_requires_management_rights() {
        let f = fixture();
        let doc = project_doc(&f).id;
        assert!(matches!(
            f.store
                .grant_document_permission(doc, Grantee::User(f.outsider), PermissionType::View, f.member),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_grantee_deletion_nullifies_grant() {
        let f = fixture();
        let doc = project_doc(&f).id;
        f.store
            .grant_document_permission(doc, Grantee::User(f.outsider), PermissionType::View, f.admin)
            .unwrap();
        f.store.delete_user(f.outsider).unwrap();

        let grants = f.store.list_document_permissions(doc).unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].user_id, None);
    }

    #[test]
    fn test_soft_delete_denies_everything() {
        let f = fixture();
        let doc = project_doc(&f).id;
        assert!(f.store.deactivate_document(doc).unwrap());
        assert!(!f.store.deactivate_document(doc).unwrap());

        let stored = f.store.get_document(doc).unwrap();
        assert!(!stored.is_active);
        assert!(!f.store.can_access_document(f.admin, doc, PermissionType::View).unwrap());
        assert!(matches!(f.store.record_download(doc), Err(Error::Validation(_))));
        assert!(f.store.list_organization_documents(f.org).unwrap().is_empty());
    }

    #[test]
    fn test_versions_chain_to_parent() {
        let mut f = fixture();
        let first = project_doc(&f);
        let mut next = NewDocument::new(f.org, f.manager, "Brief.pdf", "c3d4.pdf", "/uploads/c3d4.pdf");
        next.project_id = Some(f.project);
        let second = f.store.create_document_version(first.id, &next).unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.parent_document_id, Some(first.id));

        let third = f.store.create_document_version(second.id, &next).unwrap();
        assert_eq!(third.version, 3);
    }

    #[test]
    fn test_record_download() {
        let f = fixture();
        let doc = project_doc(&f).id;
        f.store.record_download(doc).unwrap();
        let doc = f.store.record_download(doc).unwrap();
        assert_eq!(doc.download_count, 2);
        assert!(doc.last_downloaded_at.is_some());
    }

    #[test]
    fn test_project_deletion_keeps_document() {
        let f = fixture();
        let doc = project_doc(&f).id;
        f.store.delete_project(f.project).unwrap();
        let doc = f.store.get_document(doc).unwrap();
        assert_eq!(doc.project_id, None);
        assert!(doc.is_active);
    }
}
