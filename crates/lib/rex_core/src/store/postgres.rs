//! PostgreSQL-backed repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{ChatRepository, EventLogRepository, RoomDeletion, UserRepository};
use crate::auth::AuthError;
use crate::error::{ChatError, ChatResult};
use crate::models::auth::{Identity, IdentityWithPassword};
use crate::models::chat::{ChatRoom, Message};
use crate::models::log::EventLog;
use crate::uuid::uuidv7;

const ROOM_COLUMNS: &str = "id, user_id::text AS user_id, name, created_at, is_active, \
                            most_recent_message, total_messages";

const MESSAGE_COLUMNS: &str = "id, chat_room_id, sender_id, text, created_at AS timestamp, seq";

/// Repository over a PostgreSQL pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ChatRepository for PgRepository {
    async fn create_room(&self, user_id: &str, name: &str) -> ChatResult<ChatRoom> {
        let room = sqlx::query_as::<_, ChatRoom>(&format!(
            r#"
            INSERT INTO chat_rooms (id, user_id, name)
            VALUES ($1, $2::uuid, $3)
            RETURNING {ROOM_COLUMNS}
            "#
        ))
        .bind(uuidv7())
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(room)
    }

    async fn list_rooms(&self, user_id: &str) -> ChatResult<Vec<ChatRoom>> {
        let rooms = sqlx::query_as::<_, ChatRoom>(&format!(
            "SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE user_id = $1::uuid ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rooms)
    }

    async fn get_room(&self, user_id: &str, room_id: Uuid) -> ChatResult<Option<ChatRoom>> {
        let room = sqlx::query_as::<_, ChatRoom>(&format!(
            "SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE id = $1 AND user_id = $2::uuid"
        ))
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(room)
    }

    async fn set_room_active(
        &self,
        user_id: &str,
        room_id: Uuid,
        is_active: bool,
    ) -> ChatResult<Option<ChatRoom>> {
        let room = sqlx::query_as::<_, ChatRoom>(&format!(
            r#"
            UPDATE chat_rooms SET is_active = $1
            WHERE id = $2 AND user_id = $3::uuid
            RETURNING {ROOM_COLUMNS}
            "#
        ))
        .bind(is_active)
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(room)
    }

    async fn delete_room(&self, user_id: &str, room_id: Uuid) -> ChatResult<RoomDeletion> {
        let mut tx = self.pool.begin().await?;

        // Ownership check before touching messages, which carry no user id.
        let owned = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM chat_rooms WHERE id = $1 AND user_id = $2::uuid FOR UPDATE",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let messages_deleted = if owned.is_some() {
            sqlx::query("DELETE FROM messages WHERE chat_room_id = $1")
                .bind(room_id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            0
        };

        let room_deleted = sqlx::query("DELETE FROM chat_rooms WHERE id = $1 AND user_id = $2::uuid")
            .bind(room_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        tx.commit().await?;
        debug!(%room_id, messages_deleted, room_deleted, "room delete committed");

        Ok(RoomDeletion {
            messages_deleted,
            room_deleted,
        })
    }

    async fn append_message(
        &self,
        user_id: &str,
        room_id: Uuid,
        sender_id: &str,
        text: &str,
    ) -> ChatResult<Message> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes summary updates for the room.
        let exists = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM chat_rooms WHERE id = $1 AND user_id = $2::uuid FOR UPDATE",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(ChatError::NotFound(format!("Chat room {room_id}")));
        }

        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (id, chat_room_id, sender_id, text)
            VALUES ($1, $2, $3, $4)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(uuidv7())
        .bind(room_id)
        .bind(sender_id)
        .bind(text)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE chat_rooms
            SET most_recent_message = $1, total_messages = total_messages + 1
            WHERE id = $2
            "#,
        )
        .bind(text)
        .bind(room_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    async fn list_messages(&self, user_id: &str, room_id: Uuid) -> ChatResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE chat_room_id = $1
              AND EXISTS (SELECT 1 FROM chat_rooms WHERE id = $1 AND user_id = $2::uuid)
            ORDER BY created_at ASC, seq ASC
            "#
        ))
        .bind(room_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn get_message(
        &self,
        user_id: &str,
        room_id: Uuid,
        message_id: Uuid,
    ) -> ChatResult<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE id = $1 AND chat_room_id = $2
              AND EXISTS (SELECT 1 FROM chat_rooms WHERE id = $2 AND user_id = $3::uuid)
            "#
        ))
        .bind(message_id)
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(message)
    }

    async fn reconcile_room(&self, user_id: &str, room_id: Uuid) -> ChatResult<Option<ChatRoom>> {
        let room = sqlx::query_as::<_, ChatRoom>(&format!(
            r#"
            UPDATE chat_rooms r
            SET total_messages = (SELECT COUNT(*) FROM messages m WHERE m.chat_room_id = r.id),
                most_recent_message = (
                    SELECT m.text FROM messages m
                    WHERE m.chat_room_id = r.id
                    ORDER BY m.created_at DESC, m.seq DESC
                    LIMIT 1
                )
            WHERE r.id = $1 AND r.user_id = $2::uuid
            RETURNING {ROOM_COLUMNS}
            "#
        ))
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(room)
    }
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityWithPassword>, AuthError> {
        let row = sqlx::query_as::<_, (String, Option<String>, Option<String>)>(
            "SELECT id::text, name, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, password_hash)| IdentityWithPassword {
            identity: Identity {
                id,
                email: email.to_string(),
                display_name: name,
            },
            password_hash,
        }))
    }

    async fn create_user(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<Identity, AuthError> {
        let id = sqlx::query_scalar::<_, String>(
            "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) RETURNING id::text",
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(Identity {
            id,
            email: email.to_string(),
            display_name: name.map(str::to_string),
        })
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<Identity>, AuthError> {
        let row = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT email, name FROM users WHERE id = $1::uuid",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(email, name)| Identity {
            id: user_id.to_string(),
            email,
            display_name: name,
        }))
    }

    async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2::uuid")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, token_hash, user_id, expires_at) VALUES ($1, $2, $3::uuid, $4)",
        )
        .bind(uuidv7())
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_valid_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<(String, String)>, AuthError> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT rt.id::text, rt.user_id::text \
             FROM refresh_tokens rt \
             WHERE rt.token_hash = $1 \
               AND rt.revoked_at IS NULL \
               AND rt.expires_at > now()",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn revoke_refresh_token(&self, token_id: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE refresh_tokens SET revoked_at = now() WHERE id = $1::uuid")
            .bind(token_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> Result<(), AuthError> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() \
             WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_all_refresh_tokens(&self, user_id: &str) -> Result<(), AuthError> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() \
             WHERE user_id = $1::uuid AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn store_reset_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (id, token_hash, user_id, expires_at) \
             VALUES ($1, $2, $3::uuid, $4)",
        )
        .bind(uuidv7())
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_reset_token(&self, token_hash: &str) -> Result<Option<String>, AuthError> {
        let user_id = sqlx::query_scalar::<_, String>(
            "UPDATE password_reset_tokens SET used_at = now() \
             WHERE token_hash = $1 AND used_at IS NULL AND expires_at > now() \
             RETURNING user_id::text",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user_id)
    }
}

#[async_trait]
impl EventLogRepository for PgRepository {
    async fn post_log(&self, description: &str) -> ChatResult<EventLog> {
        let log = sqlx::query_as::<_, EventLog>(
            r#"
            INSERT INTO event_logs (id, event_description)
            VALUES ($1, $2)
            RETURNING id, event_description, timestamp
            "#,
        )
        .bind(uuidv7())
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(log)
    }

    async fn get_log(&self, log_id: Uuid) -> ChatResult<Option<EventLog>> {
        let log = sqlx::query_as::<_, EventLog>(
            "SELECT id, event_description, timestamp FROM event_logs WHERE id = $1",
        )
        .bind(log_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(log)
    }

    async fn update_log(&self, log_id: Uuid, description: &str) -> ChatResult<Option<EventLog>> {
        let log = sqlx::query_as::<_, EventLog>(
            r#"
            UPDATE event_logs SET event_description = $1, timestamp = now()
            WHERE id = $2
            RETURNING id, event_description, timestamp
            "#,
        )
        .bind(description)
        .bind(log_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(log)
    }

    async fn delete_log(&self, log_id: Uuid) -> ChatResult<bool> {
        let result = sqlx::query("DELETE FROM event_logs WHERE id = $1")
            .bind(log_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
