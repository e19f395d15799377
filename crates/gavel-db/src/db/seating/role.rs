use gavel_core::models::{TableRole, TableUserRole};
use gavel_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Repository for explicit (table, user, role) rows. The table's primary
/// owner is an implicit OWNER and is not materialized here.
#[derive(Clone)]
pub struct TableRoleRepository {
    pool: PgPool,
}

impl TableRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All roles the user holds on the table. A user may hold several; the
    /// caller resolves the highest-privilege one.
    #[tracing::instrument(skip(self), fields(db.table = "table_user_roles", db.operation = "select"))]
    pub async fn roles_for_user(
        &self,
        table_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<TableRole>, AppError> {
        let roles: Vec<TableRole> = sqlx::query_scalar(
            "SELECT role FROM table_user_roles WHERE table_id = $1 AND user_id = $2",
        )
        .bind(table_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    #[tracing::instrument(skip(self), fields(db.table = "table_user_roles", db.operation = "select"))]
    pub async fn list_by_table(&self, table_id: Uuid) -> Result<Vec<TableUserRole>, AppError> {
        let roles = sqlx::query_as::<Postgres, TableUserRole>(
            "SELECT * FROM table_user_roles WHERE table_id = $1 ORDER BY created_at ASC",
        )
        .bind(table_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    /// Grant a role. Granting a role the user already holds is a no-op.
    pub async fn add_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        table_id: Uuid,
        user_id: Uuid,
        role: TableRole,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO table_user_roles (id, table_id, user_id, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (table_id, user_id, role) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(table_id)
        .bind(user_id)
        .bind(role)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn remove_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        table_id: Uuid,
        user_id: Uuid,
        role: TableRole,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM table_user_roles WHERE table_id = $1 AND user_id = $2 AND role = $3",
        )
        .bind(table_id)
        .bind(user_id)
        .bind(role)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
