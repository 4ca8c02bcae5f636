use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{CreationStore, LikeOutcome};
use crate::models::creation::{CreationRow, NewCreation};

#[derive(Clone)]
pub struct PgCreationStore {
    pool: PgPool,
}

impl PgCreationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreationStore for PgCreationStore {
    async fn insert(&self, creation: NewCreation) -> Result<CreationRow, sqlx::Error> {
        let row = sqlx::query_as::<_, CreationRow>(
            r#"
            INSERT INTO creations (user_id, prompt, content, type, publish)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&creation.user_id)
        .bind(&creation.prompt)
        .bind(&creation.content)
        .bind(creation.creation_type.as_str())
        .bind(creation.publish)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "Inserted creation {} ({}) for user {}",
            row.id, row.creation_type, row.user_id
        );
        Ok(row)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<CreationRow>, sqlx::Error> {
        sqlx::query_as::<_, CreationRow>(
            "SELECT * FROM creations WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_published(&self) -> Result<Vec<CreationRow>, sqlx::Error> {
        sqlx::query_as::<_, CreationRow>(
            "SELECT * FROM creations WHERE publish = TRUE ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn toggle_like(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<LikeOutcome>, sqlx::Error> {
        // Single statement: the membership test and the write see the same row version.
        let liked: Option<bool> = sqlx::query_scalar(
            r#"
            UPDATE creations
            SET likes = CASE
                    WHEN $2 = ANY(likes) THEN array_remove(likes, $2)
                    ELSE array_append(likes, $2)
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING $2 = ANY(likes)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(liked.map(|liked| {
            if liked {
                LikeOutcome::Liked
            } else {
                LikeOutcome::Unliked
            }
        }))
    }
}
