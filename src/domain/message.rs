use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A chat message as stored. The original `content` is retained verbatim;
/// `filtered_content` is present exactly when `is_filtered` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub filtered_content: Option<String>,
    pub is_filtered: bool,
    pub created_at: OffsetDateTime,
}

impl Message {
    /// Text shown to every viewer, sender included: the redacted variant
    /// when the message was filtered, the original otherwise.
    #[must_use]
    pub fn display_text(&self) -> &str {
        if self.is_filtered {
            self.filtered_content.as_deref().unwrap_or(&self.content)
        } else {
            &self.content
        }
    }
}

/// Fields of a message before the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub filtered_content: Option<String>,
    pub is_filtered: bool,
}
