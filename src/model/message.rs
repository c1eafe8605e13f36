use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direct message between two users of the same organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub project_id: Option<i64>,
    pub subject: String,
    pub content: String,
    /// Null until the recipient reads the message
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub sender_id: i64,
    pub recipient_id: i64,
    pub project_id: Option<i64>,
    pub subject: String,
    pub content: String,
}
