//! Schema migrations compiled into the binary.
//!
//! Applied versions are recorded in `_sqlx_migrations`, so running them on
//! every startup only applies what is new.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

struct Embedded {
    version: i64,
    description: &'static str,
    sql: &'static str,
}

/// Oldest first. Add new files under `migrations/` here as well.
const EMBEDDED: &[Embedded] = &[
    Embedded {
        version: 20250301000001,
        description: "students",
        sql: include_str!("../../migrations/20250301000001_students.sql"),
    },
    Embedded {
        version: 20250301000002,
        description: "identity",
        sql: include_str!("../../migrations/20250301000002_identity.sql"),
    },
];

fn migrator() -> Migrator {
    let migrations = EMBEDDED
        .iter()
        .map(|m| Migration {
            version: m.version,
            description: Cow::Borrowed(m.description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(m.sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect::<Vec<_>>();

    Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    }
}

pub fn count() -> usize {
    EMBEDDED.len()
}

/// Applies pending migrations under the advisory lock.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<()> {
    info!(embedded = count(), "Applying schema migrations");

    migrator()
        .run(pool)
        .await
        .map_err(|e| PostgresError::Migration(e.to_string()))?;

    info!("Schema is up to date");
    Ok(())
}
