//! Repository for the `customer_login_events` table.

use sqlx::PgPool;

use proofdesk_core::types::DbId;

use crate::models::login_event::CustomerLoginEvent;

const COLUMNS: &str = "id, customer_id, ip_address, user_agent, successful, occurred_at";

/// Provides append/read operations for the login audit trail.
pub struct LoginEventRepo;

impl LoginEventRepo {
    /// Append a login attempt record.
    pub async fn record(
        pool: &PgPool,
        customer_id: DbId,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        successful: bool,
    ) -> Result<CustomerLoginEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO customer_login_events (customer_id, ip_address, user_agent, successful)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CustomerLoginEvent>(&query)
            .bind(customer_id)
            .bind(ip_address)
            // Cap the stored user agent; some clients send kilobytes.
            .bind(user_agent.map(|ua| ua.chars().take(512).collect::<String>()))
            .bind(successful)
            .fetch_one(pool)
            .await
    }

    /// List a customer's login events, newest first.
    pub async fn list_for_customer(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<Vec<CustomerLoginEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM customer_login_events
             WHERE customer_id = $1
             ORDER BY occurred_at DESC, id DESC"
        );
        sqlx::query_as::<_, CustomerLoginEvent>(&query)
            .bind(customer_id)
            .fetch_all(pool)
            .await
    }
}
