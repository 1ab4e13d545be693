use std::path::PathBuf;

use tracing::info;
use workshop_core::RepositoryError;

use crate::repository::SqliteRepository;

pub const SEEDS_DIR_ENV: &str = "WORKSHOP_DB_SQLITE_SEEDS_DIR";

/// Seeds directory, resolved at runtime:
///
/// 1. `WORKSHOP_DB_SQLITE_SEEDS_DIR` when set.
/// 2. `./seeds` when it exists in the working directory.
/// 3. `$CARGO_MANIFEST_DIR/seeds` otherwise.
pub fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(SEEDS_DIR_ENV) {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

impl SqliteRepository {
    /// Opens `connection_string` (a file path, a `sqlite:` URL or
    /// `:memory:`), runs migrations and applies the demo workshop seeds.
    ///
    /// Seeds use `INSERT OR IGNORE`, so reopening an existing file keeps
    /// whatever the workshop has recorded since.
    pub async fn open_seeded(connection_string: &str) -> Result<Self, RepositoryError> {
        let repo = Self::new(connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;

        let seeds = seeds_dir();
        repo.run_seeds(&seeds)
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        info!(
            connection = %connection_string,
            seeds = %seeds.display(),
            "sqlite repository ready"
        );
        Ok(repo)
    }
}
