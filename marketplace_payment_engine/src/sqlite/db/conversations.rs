use sqlx::SqliteConnection;

use crate::{db_types::Message, traits::StoreError};

/// Appends a system-authored message (null sender) to a conversation and returns the stored row.
pub async fn append_system_message(
    conversation_id: i64,
    content: &str,
    conn: &mut SqliteConnection,
) -> Result<Message, StoreError> {
    let message = sqlx::query_as::<_, Message>(
        r#"
            INSERT INTO messages (conversation_id, sender_company_id, content)
            VALUES ($1, NULL, $2)
            RETURNING id, conversation_id, sender_company_id, content, created_at
        "#,
    )
    .bind(conversation_id)
    .bind(content)
    .fetch_one(conn)
    .await?;
    Ok(message)
}

/// All messages in the conversation, in insertion order.
pub async fn fetch_messages(conversation_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Message>, StoreError> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
            SELECT id, conversation_id, sender_company_id, content, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY id ASC
        "#,
    )
    .bind(conversation_id)
    .fetch_all(conn)
    .await?;
    Ok(messages)
}
