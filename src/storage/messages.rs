//! Direct messages

use super::projects::require_project;
use super::sqlite::{ensure_user_in_org, now, user_organization, Store};
use crate::model::{Message, NewMessage};
use crate::{Error, Result};
use rusqlite::{params, OptionalExtension};

const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, project_id, subject, content, read_at, created_at";

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        recipient_id: row.get(2)?,
        project_id: row.get(3)?,
        subject: row.get(4)?,
        content: row.get(5)?,
        read_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl Store {
    /// Send a message within the sender's organization
    pub fn send_message(&self, input: &NewMessage) -> Result<Message> {
        if input.subject.trim().is_empty() || input.content.trim().is_empty() {
            return Err(Error::Validation("message subject and content are required".into()));
        }
        let organization_id = user_organization(&self.conn, input.sender_id)?;
        ensure_user_in_org(&self.conn, "Message recipient", input.recipient_id, organization_id)?;
        if let Some(project_id) = input.project_id {
            let project = require_project(&self.conn, project_id)?;
            if project.organization_id != organization_id {
                return Err(Error::OrganizationMismatch {
                    entity: "Message project",
                    expected: organization_id,
                    found: project.organization_id,
                });
            }
        }

        self.conn.execute(
            r#"
            INSERT INTO messages (sender_id, recipient_id, project_id, subject, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                input.sender_id,
                input.recipient_id,
                input.project_id,
                input.subject,
                input.content,
                now(),
            ],
        )?;
        self.get_message(self.conn.last_insert_rowid())
    }

    pub fn get_message(&self, id: i64) -> Result<Message> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS),
                [id],
                row_to_message,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Message", id))
    }

    /// Received messages, newest first
    pub fn inbox(&self, user_id: i64) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM messages WHERE recipient_id = ?1 ORDER BY created_at DESC, id DESC",
            MESSAGE_COLUMNS
        ))?;
        let messages = stmt
            .query_map([user_id], row_to_message)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(messages)
    }

    /// Sent messages, newest first
    pub fn sent_messages(&self, user_id: i64) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM messages WHERE sender_id = ?1 ORDER BY created_at DESC, id DESC",
            MESSAGE_COLUMNS
        ))?;
        let messages = stmt
            .query_map([user_id], row_to_message)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(messages)
    }

    /// Mark a message read by its recipient. The first read time is kept;
    /// returns whether this call set it.
    pub fn mark_message_read(&self, id: i64, recipient_id: i64) -> Result<bool> {
        let message = self.get_message(id)?;
        if message.recipient_id != recipient_id {
            return Err(Error::Validation(format!(
                "user {} is not the recipient of message {}",
                recipient_id, id
            )));
        }
        let updated = self.conn.execute(
            "UPDATE messages SET read_at = ?1 WHERE id = ?2 AND read_at IS NULL",
            params![now(), id],
        )?;
        Ok(updated > 0)
    }

    pub fn unread_message_count(&self, user_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE recipient_id = ?1 AND read_at IS NULL",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewOrganization, NewProject, NewUser, UserRole};

    fn setup() -> (Store, i64, i64, i64) {
        let store = Store::open_in_memory().unwrap();
        let org = store
            .create_organization(&NewOrganization::named("Acme"))
            .unwrap()
            .id;
        let alice = store
            .create_user(&NewUser::new(org, "Alice", "alice@acme.io", UserRole::Manager))
            .unwrap()
            .id;
        let bob = store
            .create_user(&NewUser::new(org, "Bob", "bob@acme.io", UserRole::Member))
            .unwrap()
            .id;
        (store, org, alice, bob)
    }

    fn note(from: i64, to: i64, project_id: Option<i64>) -> NewMessage {
        NewMessage {
            sender_id: from,
            recipient_id: to,
            project_id,
            subject: "Standup".into(),
            content: "Moved to 10am".into(),
        }
    }

    #[test]
    fn test_first_read_wins() {
        let (store, _, alice, bob) = setup();
        let message = store.send_message(&note(alice, bob, None)).unwrap();
        assert!(!message.is_read());
        assert_eq!(store.unread_message_count(bob).unwrap(), 1);

        assert!(store.mark_message_read(message.id, bob).unwrap());
        let first = store.get_message(message.id).unwrap().read_at;
        assert!(!store.mark_message_read(message.id, bob).unwrap());
        assert_eq!(store.get_message(message.id).unwrap().read_at, first);
        assert_eq!(store.unread_message_count(bob).unwrap(), 0);

        assert!(matches!(
            store.mark_message_read(message.id, alice),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_cross_org_message_rejected() {
        let (store, _, alice, _) = setup();
        let other = store
            .create_organization(&NewOrganization::named("Globex"))
            .unwrap()
            .id;
        let eve = store
            .create_user(&NewUser::new(other, "Eve", "eve@globex.io", UserRole::Member))
            .unwrap()
            .id;
        assert!(matches!(
            store.send_message(&note(alice, eve, None)),
            Err(Error::OrganizationMismatch { .. })
        ));
    }

    #[test]
    fn test_project_deletion_keeps_message() {
        let (store, org, alice, bob) = setup();
        let project = store
            .create_project(&NewProject::new(org, "Website", alice))
            .unwrap()
            .id;
        let message = store.send_message(&note(bob, alice, Some(project))).unwrap();

        store.delete_project(project).unwrap();
        let message = store.get_message(message.id).unwrap();
        assert_eq!(message.project_id, None);
        assert_eq!(store.inbox(alice).unwrap().len(), 1);
        assert_eq!(store.sent_messages(bob).unwrap().len(), 1);
    }

    #[test]
    fn test_sender_deletion_removes_message() {
        let (store, _, alice, bob) = setup();
        store.send_message(&note(alice, bob, None)).unwrap();
        store.delete_user(alice).unwrap();
        assert!(store.inbox(bob).unwrap().is_empty());
    }
}
