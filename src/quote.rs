use std::{collections::HashMap, str::FromStr};

use anyhow::{Result, anyhow};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const USD_BRL: &str = "USDBRL";

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct PairQuote {
    pub bid: String,
}

/// Body of `/json/last/<pair>`: one entry per requested pair, keyed like `USDBRL`.
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Quote {
    pub pairs: HashMap<String, PairQuote>,
}

impl Quote {
    /// Returns the bid for `pair` exactly as the API sent it, once it is known
    /// to parse as a decimal.
    pub fn bid_for(&self, pair: &str) -> Result<String> {
        let quote = self
            .pairs
            .get(pair)
            .ok_or_else(|| anyhow!("Invalid response format: no {} entry", pair))?;

        let bid = &quote.bid;
        Decimal::from_str(bid).map_err(|e| anyhow!("Invalid bid {:?} for {}: {}", bid, pair, e))?;

        Ok(bid.clone())
    }
}

/// What `GET /cotacao` answers with.
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct BidResponse {
    pub bid: String,
}
