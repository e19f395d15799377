use gavel_core::models::Organization;
use gavel_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for organizations and admin membership
#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "organizations", db.operation = "select", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Organization>, AppError> {
        let organization = sqlx::query_as::<Postgres, Organization>(
            "SELECT * FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(organization)
    }

    /// Whether the user is an admin of the organization.
    #[tracing::instrument(skip(self), fields(db.table = "organization_admins", db.operation = "select"))]
    pub async fn is_admin(&self, organization_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM organization_admins
                WHERE organization_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
