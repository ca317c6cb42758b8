//! Schema migrations embedded from `rex_core/migrations/`.

use sqlx::PgPool;
use tracing::info;

/// Apply every pending migration.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    let migrator = sqlx::migrate!("./migrations");
    info!(count = migrator.iter().count(), "applying migrations");
    migrator.run(pool).await
}
