//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! mauve migrate
//! ```
//!
//! # Environment Variables
//!
//! - `MAUVE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Supabase projects apply the same files from `crates/storefront/migrations/`
//! through their own migration tooling.

use mauve_storefront::config::database_url_from_env;
use mauve_storefront::db::{RepositoryError, create_pool};
use mauve_storefront::error::AppError;

use crate::output;

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns error if the database URL is missing, the connection fails, or a
/// migration fails.
pub async fn run() -> Result<(), AppError> {
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to storefront database...");
    let pool = create_pool(&database_url)
        .await
        .map_err(RepositoryError::from)?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    output::line("Migrations applied");
    Ok(())
}
