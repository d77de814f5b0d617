//! Database connection and initialization.

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

/// Database connection wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Open (creating if needed) the SQLite file and apply migrations.
pub async fn init_database(db_path: &str, max_connections: u32) -> Result<Database> {
    if let Some(parent) = Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path);
    info!("Connecting to database: {}", db_path);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(&db_url)
        .await?;

    run_migrations(&pool).await?;

    Ok(Database { pool })
}

/// Schema files in apply order. Every statement is idempotent
/// (`IF NOT EXISTS`), so the full list runs on each start.
const MIGRATIONS: &[(&str, &str)] = &[("001_init.sql", include_str!("../../migrations/001_init.sql"))];

/// Statements of one migration file, with `--` comment lines removed.
fn migration_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    for (name, sql) in MIGRATIONS {
        let statements = migration_statements(sql);
        debug!("Applying migration {} ({} statements)", name, statements.len());
        for (index, statement) in statements.iter().enumerate() {
            sqlx::query(statement)
                .execute(pool)
                .await
                .with_context(|| format!("migration {} statement {} failed", name, index + 1))?;
        }
    }

    info!("Schema up to date ({} migrations)", MIGRATIONS.len());
    Ok(())
}
