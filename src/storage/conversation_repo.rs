use crate::domain::conversation::Conversation;
use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::records::conversation::ConversationRecord;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ConversationRepository {
    pool: DbPool,
}

impl ConversationRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fetches the conversation for `(listing, buyer)` or creates it. The
    /// no-op `ON CONFLICT` update makes `RETURNING` yield the existing row,
    /// so repeated opens always resolve to the same conversation.
    pub async fn get_or_create(&self, listing_id: Uuid, buyer_id: Uuid, seller_id: Uuid) -> Result<Conversation> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            r#"
            INSERT INTO conversations (id, listing_id, buyer_id, seller_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (listing_id, buyer_id)
            DO UPDATE SET listing_id = EXCLUDED.listing_id
            RETURNING id, listing_id, buyer_id, seller_id, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(listing_id)
        .bind(buyer_id)
        .bind(seller_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Conversation>> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            r#"
            SELECT id, listing_id, buyer_id, seller_id, created_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Into::into))
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        let records = sqlx::query_as::<_, ConversationRecord>(
            r#"
            SELECT id, listing_id, buyer_id, seller_id, created_at
            FROM conversations
            WHERE buyer_id = $1 OR seller_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
