// src/db.rs

use anyhow::{Context, Result};
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use log::{debug, info, warn};
use std::path::Path;
use std::time::Duration;
use tokio_postgres::{Config, NoTls};

use crate::config::{DB_POOL_MAX_SIZE, DB_POOL_MIN_IDLE};

pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// PostgreSQL settings from `POSTGRES_HOST`, `POSTGRES_PORT`, `POSTGRES_DB`,
/// `POSTGRES_USER` and `POSTGRES_PASSWORD`. An unparsable port falls back to 5432.
fn build_pg_config() -> Config {
    let host = env_or("POSTGRES_HOST", "127.0.0.1");
    let port = env_or("POSTGRES_PORT", "5432").parse::<u16>().unwrap_or(5432);
    let dbname = env_or("POSTGRES_DB", "jobtracker");
    let user = env_or("POSTGRES_USER", "postgres");

    debug!("Postgres target: {}@{}:{}/{}", user, host, port, dbname);
    let mut config = Config::new();
    config
        .host(&host)
        .port(port)
        .dbname(&dbname)
        .user(&user)
        .password(env_or("POSTGRES_PASSWORD", ""))
        .application_name("job_matching")
        .connect_timeout(Duration::from_secs(10));
    config
}

async fn ping(pool: &PgPool) -> Result<()> {
    let conn = pool
        .get()
        .await
        .context("No connection available for the startup check")?;
    conn.query_one("SELECT 1", &[])
        .await
        .context("Startup check query failed")?;
    Ok(())
}

/// Builds the job store pool and checks that the server answers.
pub async fn connect() -> Result<PgPool> {
    let manager = PostgresConnectionManager::new(build_pg_config(), NoTls);
    let pool = Pool::builder()
        .max_size(DB_POOL_MAX_SIZE)
        .min_idle(Some(DB_POOL_MIN_IDLE))
        .idle_timeout(Some(Duration::from_secs(180)))
        .connection_timeout(Duration::from_secs(15))
        .build(manager)
        .await
        .context("Failed to build database connection pool")?;
    ping(&pool).await?;
    info!("Connected to PostgreSQL (pool max {})", DB_POOL_MAX_SIZE);
    Ok(pool)
}

/// Loads the first `.env` style file found among `paths`.
///
/// Variables already present in the environment win. Missing files are not an
/// error; returns whether a file was loaded.
pub fn load_env(paths: &[&str]) -> bool {
    for path in paths {
        if !Path::new(path).exists() {
            continue;
        }
        match dotenv::from_path(path) {
            Ok(()) => {
                info!("Loaded environment variables from {}", path);
                return true;
            }
            Err(e) => warn!("Failed to load environment from {}: {}", path, e),
        }
    }
    info!("No .env file found, using environment variables from system");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pg_config_from_env_with_bad_port() {
        std::env::set_var("POSTGRES_PORT", "not-a-port");
        std::env::set_var("POSTGRES_DB", "jobtracker_test");
        let config = build_pg_config();
        std::env::remove_var("POSTGRES_PORT");
        std::env::remove_var("POSTGRES_DB");

        assert_eq!(config.get_ports(), &[5432]);
        assert_eq!(config.get_dbname(), Some("jobtracker_test"));
        assert_eq!(config.get_application_name(), Some("job_matching"));
    }
}
