use time::OffsetDateTime;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct MessageRecord {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub filtered_content: Option<String>,
    pub is_filtered: bool,
    pub created_at: OffsetDateTime,
}

impl From<MessageRecord> for crate::domain::message::Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            conversation_id: record.conversation_id,
            sender_id: record.sender_id,
            content: record.content,
            filtered_content: record.filtered_content,
            is_filtered: record.is_filtered,
            created_at: record.created_at,
        }
    }
}
