//! Repository for the `customers` and `customer_credentials` tables.

use sqlx::PgPool;

use proofdesk_core::types::DbId;

use crate::models::customer::{CreateCustomer, Customer, CustomerCredential};

const CUSTOMER_COLUMNS: &str = "id, name, company_name, email, created_at, updated_at";

const CREDENTIAL_COLUMNS: &str =
    "customer_id, password_hash, last_login_at, is_active, created_at, updated_at";

/// Provides CRUD operations for customers and their portal credentials.
pub struct CustomerRepo;

impl CustomerRepo {
    /// Insert a new customer, returning the created row.
    ///
    /// A duplicate email violates `uq_customers_email` and surfaces as a
    /// database error the caller classifies as a conflict.
    pub async fn create(pool: &PgPool, input: &CreateCustomer) -> Result<Customer, sqlx::Error> {
        let query = format!(
            "INSERT INTO customers (name, company_name, email)
             VALUES ($1, $2, $3)
             RETURNING {CUSTOMER_COLUMNS}"
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(&input.name)
            .bind(&input.company_name)
            .bind(&input.email)
            .fetch_one(pool)
            .await
    }

    /// Find a customer by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Customer>, sqlx::Error> {
        let query = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a customer by email (case-insensitive).
    pub async fn find_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<Customer>, sqlx::Error> {
        let query =
            format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, Customer>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// List all customers ordered by name.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Customer>, sqlx::Error> {
        let query = format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name ASC");
        sqlx::query_as::<_, Customer>(&query).fetch_all(pool).await
    }

    /// Fetch the portal credential for a customer, if one exists.
    pub async fn find_credential(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<Option<CustomerCredential>, sqlx::Error> {
        let query =
            format!("SELECT {CREDENTIAL_COLUMNS} FROM customer_credentials WHERE customer_id = $1");
        sqlx::query_as::<_, CustomerCredential>(&query)
            .bind(customer_id)
            .fetch_optional(pool)
            .await
    }

    /// Create or replace the portal credential for a customer.
    ///
    /// Used by invite-accept and reset completion: the credential becomes
    /// active and any previous last-login marker is cleared.
    pub async fn upsert_credential<'e, E>(
        executor: E,
        customer_id: DbId,
        password_hash: &str,
    ) -> Result<CustomerCredential, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO customer_credentials (customer_id, password_hash, is_active)
             VALUES ($1, $2, TRUE)
             ON CONFLICT (customer_id) DO UPDATE
                SET password_hash = EXCLUDED.password_hash,
                    is_active = TRUE,
                    last_login_at = NULL,
                    updated_at = NOW()
             RETURNING {CREDENTIAL_COLUMNS}"
        );
        sqlx::query_as::<_, CustomerCredential>(&query)
            .bind(customer_id)
            .bind(password_hash)
            .fetch_one(executor)
            .await
    }

    /// Stamp a successful portal login.
    pub async fn record_successful_login(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE customer_credentials
             SET last_login_at = NOW(), updated_at = NOW()
             WHERE customer_id = $1",
        )
        .bind(customer_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
