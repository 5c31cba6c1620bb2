use crate::domain::message::{Message, NewMessage};
use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::records::message::MessageRecord;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct MessageRepository {
    pool: DbPool,
}

impl MessageRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts a message and returns the stored row. Ids are UUIDv7 so the
    /// id order matches assignment order within equal timestamps.
    pub async fn create(&self, new: &NewMessage) -> Result<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, filtered_content, is_filtered)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, conversation_id, sender_id, content, filtered_content, is_filtered, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(new.conversation_id)
        .bind(new.sender_id)
        .bind(&new.content)
        .bind(&new.filtered_content)
        .bind(new.is_filtered)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    pub async fn list(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, conversation_id, sender_id, content, filtered_content, is_filtered, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
