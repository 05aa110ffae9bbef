use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};
use log::debug;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::time::Instant;

use crate::exchange_rate::ExchangeRate;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cotacoes (
    id BLOB PRIMARY KEY NOT NULL,
    rate TEXT NOT NULL,
    captured_at TEXT NOT NULL
)";

#[derive(Clone)]
pub struct RateStore {
    pool: SqlitePool,
}

impl RateStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database url {}", database_url))?;

        Self::connect_with(options).await
    }

    pub async fn connect_with(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .connect_with(options.create_if_missing(true))
            .await
            .context("Can't open the rate database")?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .context("Can't create the cotacoes table")?;

        Ok(Self { pool })
    }

    /// Inserts `rate` in its own transaction. The row is committed only if the
    /// insert finished before `timeout`; otherwise it is rolled back, so an
    /// `Err` always means nothing was stored.
    pub async fn save(&self, rate: &ExchangeRate, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let too_slow = || anyhow!("Saving rate {} took longer than {:?}", rate.id, timeout);

        let mut conn = tokio::time::timeout_at(deadline, self.pool.acquire())
            .await
            .map_err(|_| too_slow())?
            .context("Can't get a database connection")?;
        let mut tx = sqlx::Connection::begin(&mut *conn)
            .await
            .context("Can't start a transaction")?;

        let insert = sqlx::query("INSERT INTO cotacoes (id, rate, captured_at) VALUES (?, ?, ?)")
            .bind(rate.id)
            .bind(&rate.rate)
            .bind(rate.captured_at)
            .execute(&mut *tx);

        // ROLLBACK is queued behind the abandoned INSERT on the same connection.
        let inserted = tokio::time::timeout_at(deadline, insert).await;
        match inserted {
            Ok(Ok(_)) if Instant::now() < deadline => {}
            Ok(Ok(_)) | Err(_) => {
                tx.rollback().await.context("Can't roll back a late insert")?;
                return Err(too_slow());
            }
            Ok(Err(e)) => {
                tx.rollback().await.ok();
                return Err(e).with_context(|| format!("Can't save rate {}", rate.id));
            }
        }

        tx.commit()
            .await
            .with_context(|| format!("Can't commit rate {}", rate.id))?;
        debug!("Saved rate {} ({})", rate.id, rate.rate);

        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cotacoes")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn latest(&self) -> Result<Option<ExchangeRate>> {
        let rate = sqlx::query_as::<_, ExchangeRate>(
            "SELECT id, rate, captured_at FROM cotacoes ORDER BY captured_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(rate)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
