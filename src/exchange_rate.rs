use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A single captured bid, as stored in the `cotacoes` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ExchangeRate {
    pub id: Uuid,
    pub rate: String,
    pub captured_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new(rate: impl Into<String>) -> Result<Self> {
        let rate = rate.into();
        if rate.trim().is_empty() {
            anyhow::bail!("Exchange rate must not be empty");
        }

        Ok(Self {
            id: Uuid::new_v4(),
            rate,
            captured_at: Utc::now(),
        })
    }
}
