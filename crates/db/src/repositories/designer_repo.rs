//! Repository for the `designers` table.

use sqlx::PgPool;

use proofdesk_core::types::DbId;

use crate::models::designer::{CreateDesigner, Designer};

const COLUMNS: &str =
    "id, user_id, display_name, email, reply_to_email, is_active, created_at, updated_at";

/// Provides CRUD operations for designer profiles.
pub struct DesignerRepo;

impl DesignerRepo {
    /// Insert a new designer profile, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateDesigner) -> Result<Designer, sqlx::Error> {
        let query = format!(
            "INSERT INTO designers (user_id, display_name, email, reply_to_email)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Designer>(&query)
            .bind(input.user_id)
            .bind(&input.display_name)
            .bind(&input.email)
            .bind(&input.reply_to_email)
            .fetch_one(pool)
            .await
    }

    /// Find a designer by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Designer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM designers WHERE id = $1");
        sqlx::query_as::<_, Designer>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the designer profile owned by a staff user.
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Designer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM designers WHERE user_id = $1");
        sqlx::query_as::<_, Designer>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List all active designers ordered by display name.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Designer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM designers WHERE is_active = TRUE ORDER BY display_name ASC"
        );
        sqlx::query_as::<_, Designer>(&query).fetch_all(pool).await
    }
}
