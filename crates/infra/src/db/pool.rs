//! Postgres connection pool with startup retries.
//!
//! sqlx's pool covers sizing and idle timeouts directly. Lifetime jitter and
//! the periodic health check are layered on top:
//!
//! - lifetime: a `before_acquire` hook discards connections older than
//!   `max_conn_lifetime + random(0..=max_conn_lifetime_jitter)`, so a burst of
//!   connections opened together does not expire together;
//! - health check: a background task pings the pool every
//!   `health_check_period` and logs failures until the pool is closed.

use std::time::Duration;

use rand::Rng;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info, warn};

use catalog_core::{CatalogError, CatalogResult, ErrorKind};

use crate::config::StorageConfig;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pool options derived from the storage configuration.
pub fn pool_options(cfg: &StorageConfig) -> PgPoolOptions {
    let lifetime = cfg.max_conn_lifetime;
    let jitter = cfg.max_conn_lifetime_jitter;

    let idle_timeout = (!cfg.max_conn_idle_time.is_zero()).then_some(cfg.max_conn_idle_time);

    PgPoolOptions::new()
        .max_connections(cfg.max_conns)
        .min_connections(cfg.min_conns)
        .idle_timeout(idle_timeout)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        // Lifetime is enforced with jitter in before_acquire instead.
        .max_lifetime(None)
        .before_acquire(move |_conn, meta| {
            Box::pin(async move {
                let sample = sample_jitter(jitter);
                let keep = !lifetime_exceeded(meta.age, lifetime, sample);
                if !keep {
                    debug!(age = ?meta.age, "retiring pooled connection past its lifetime");
                }
                Ok(keep)
            })
        })
}

/// Open the pool, retrying up to `max_attempts` times with a fixed delay.
///
/// Each attempt runs a liveness query before the pool is handed out. After
/// the last failed attempt the most recent cause is returned as `Internal`.
pub async fn connect_with_retry(cfg: &StorageConfig) -> CatalogResult<PgPool> {
    let attempts = cfg.max_attempts.max(1);
    let mut last_err: Option<sqlx::Error> = None;

    for attempt in 1..=attempts {
        match try_connect(cfg).await {
            Ok(pool) => {
                info!(
                    attempt,
                    host = %cfg.host,
                    port = cfg.port,
                    database = %cfg.database,
                    "connected to storage"
                );
                spawn_health_check(pool.clone(), cfg.health_check_period);
                return Ok(pool);
            }
            Err(e) => {
                warn!(attempt, max_attempts = attempts, error = %e, "storage connection attempt failed");
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(cfg.attempt_delay).await;
                }
            }
        }
    }

    let message = format!("could not connect to storage after {attempts} attempts");
    Err(CatalogError::wrap(last_err, ErrorKind::Internal, message.clone())
        .unwrap_or_else(|| CatalogError::internal(message))
        .with_context("host", &cfg.host)
        .with_context("database", &cfg.database))
}

async fn try_connect(cfg: &StorageConfig) -> Result<PgPool, sqlx::Error> {
    let pool = pool_options(cfg).connect_with(cfg.connect_options()).await?;
    ping(&pool).await?;
    Ok(pool)
}

async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

fn spawn_health_check(pool: PgPool, period: Duration) {
    if period.is_zero() {
        return;
    }
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick fires immediately; the pool was just checked.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if pool.is_closed() {
                debug!("pool closed; stopping health check");
                break;
            }
            match ping(&pool).await {
                Ok(()) => debug!(size = pool.size(), idle = pool.num_idle(), "storage health check ok"),
                Err(e) => warn!(error = %e, "storage health check failed"),
            }
        }
    });
}

fn sample_jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    rand::thread_rng().gen_range(Duration::ZERO..=max)
}

/// A zero `lifetime` disables expiry.
fn lifetime_exceeded(age: Duration, lifetime: Duration, jitter: Duration) -> bool {
    !lifetime.is_zero() && age > lifetime.saturating_add(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_lifetime_never_expires() {
        assert!(!lifetime_exceeded(Duration::from_secs(86_400), Duration::ZERO, Duration::ZERO));
    }

    #[test]
    fn jitter_extends_the_lifetime() {
        let lifetime = Duration::from_secs(60);
        let age = Duration::from_secs(90);
        assert!(lifetime_exceeded(age, lifetime, Duration::ZERO));
        assert!(!lifetime_exceeded(age, lifetime, Duration::from_secs(30)));
    }

    proptest! {
        #[test]
        fn sampled_jitter_stays_in_range(max_ms in 0u64..10_000) {
            let max = Duration::from_millis(max_ms);
            let sample = sample_jitter(max);
            prop_assert!(sample <= max);
        }
    }

    #[tokio::test]
    async fn gives_up_after_configured_attempts() {
        let cfg = StorageConfig {
            host: "127.0.0.1".into(),
            // Reserved port; nothing listens there.
            port: 1,
            max_attempts: 2,
            attempt_delay: Duration::from_millis(10),
            ..StorageConfig::default()
        };
        let err = connect_with_retry(&cfg).await.unwrap_err();
        assert!(err.is(ErrorKind::Internal));
        assert!(err.message().contains("2 attempts"));
        assert!(err.chain().len() > err.message().len());
    }
}
