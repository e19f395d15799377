use gavel_core::models::{normalize_email, User};
use gavel_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Repository for users
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by email, creating one if absent. The upsert keeps the
    /// existing name when the row already exists; a concurrent creation of
    /// the same email resolves through the unique index rather than racing.
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "upsert"))]
    pub async fn find_or_create_by_email(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            r#"
            INSERT INTO users (id, email, name, is_super_admin)
            VALUES ($1, $2, $3, false)
            ON CONFLICT (email) DO UPDATE SET name = COALESCE(users.name, EXCLUDED.name)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(normalize_email(email))
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Transaction-scoped variant of [`find_or_create_by_email`], for flows
    /// that create the user together with other rows.
    ///
    /// [`find_or_create_by_email`]: UserRepository::find_or_create_by_email
    pub async fn find_or_create_by_email_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        email: &str,
        name: Option<&str>,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            r#"
            INSERT INTO users (id, email, name, is_super_admin)
            VALUES ($1, $2, $3, false)
            ON CONFLICT (email) DO UPDATE SET name = COALESCE(users.name, EXCLUDED.name)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(normalize_email(email))
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;

        Ok(user)
    }
}
