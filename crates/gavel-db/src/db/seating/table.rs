use gavel_core::models::{Table, TableStatus, TableType};
use gavel_core::{generate_reference_code, AppError, MAX_REFERENCE_CODE_ATTEMPTS};
use sqlx::{Acquire, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::violated_constraint;

const ORG_REFERENCE_CODE_CONSTRAINT: &str = "tables_org_reference_code_key";
const EVENT_SLUG_CONSTRAINT: &str = "tables_event_slug_key";

/// URL-safe slug from a table name: lowercase alphanumerics with dashes.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "table".to_string()
    } else {
        slug
    }
}

/// Repository for tables
#[derive(Clone)]
pub struct TableRepository {
    pool: PgPool,
}

impl TableRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a table inside an enclosing transaction.
    ///
    /// The reference code and slug are generated here and retried on
    /// uniqueness collision up to [`MAX_REFERENCE_CODE_ATTEMPTS`] times, then
    /// the operation fails loudly. Other constraint violations surface
    /// unchanged.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        organization_id: Uuid,
        event_id: Uuid,
        name: &str,
        table_type: TableType,
        capacity: i32,
        primary_owner_id: Uuid,
    ) -> Result<Table, AppError> {
        let base_slug = slugify(name);

        for _attempt in 0..MAX_REFERENCE_CODE_ATTEMPTS {
            let reference_code = generate_reference_code();
            // Suffix keeps slugs unique when two tables share a name.
            let slug = format!("{}-{}", base_slug, reference_code[..4].to_lowercase());

            // Savepoint per attempt so a collision aborts only the savepoint,
            // not the enclosing transaction.
            let mut attempt = (&mut *tx).begin().await?;

            let result = sqlx::query_as::<Postgres, Table>(
                r#"
                INSERT INTO tables
                    (id, organization_id, event_id, name, slug, reference_code,
                     table_type, capacity, status, primary_owner_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(organization_id)
            .bind(event_id)
            .bind(name)
            .bind(&slug)
            .bind(&reference_code)
            .bind(table_type)
            .bind(capacity)
            .bind(TableStatus::Active)
            .bind(primary_owner_id)
            .fetch_one(&mut *attempt)
            .await;

            match result {
                Ok(table) => {
                    attempt.commit().await?;
                    return Ok(table);
                }
                Err(err) => {
                    attempt.rollback().await?;
                    match violated_constraint(&err).as_deref() {
                        Some(ORG_REFERENCE_CODE_CONSTRAINT) | Some(EVENT_SLUG_CONSTRAINT) => {
                            tracing::warn!(constraint = ?violated_constraint(&err), "Reference code collision, retrying");
                            continue;
                        }
                        _ => return Err(err.into()),
                    }
                }
            }
        }

        Err(AppError::Internal(format!(
            "Failed to generate a unique table reference code after {} attempts",
            MAX_REFERENCE_CODE_ATTEMPTS
        )))
    }

    #[tracing::instrument(skip(self), fields(db.table = "tables", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Table>, AppError> {
        let table = sqlx::query_as::<Postgres, Table>("SELECT * FROM tables WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(table)
    }

    /// Lock the table row for the remainder of the transaction. Seat claims
    /// and completions take this lock before re-checking capacity so two
    /// concurrent requests for the last seat serialize.
    pub async fn get_for_update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Table>, AppError> {
        let table =
            sqlx::query_as::<Postgres, Table>("SELECT * FROM tables WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;

        Ok(table)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tables", db.operation = "select"))]
    pub async fn get_by_reference_code(
        &self,
        organization_id: Uuid,
        reference_code: &str,
    ) -> Result<Option<Table>, AppError> {
        let table = sqlx::query_as::<Postgres, Table>(
            "SELECT * FROM tables WHERE organization_id = $1 AND reference_code = $2",
        )
        .bind(organization_id)
        .bind(reference_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(table)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tables", db.operation = "select"))]
    pub async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<Table>, AppError> {
        let tables = sqlx::query_as::<Postgres, Table>(
            "SELECT * FROM tables WHERE event_id = $1 ORDER BY created_at ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("The Patrons' Table"), "the-patrons-table");
        assert_eq!(slugify("  VIP #1  "), "vip-1");
        assert_eq!(slugify("---"), "table");
    }
}
