use std::{io::Write, path::Path, time::Duration};

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use reqwest::Client;
use tempfile::NamedTempFile;

use crate::{config::ClientConfig, quote::BidResponse};

pub async fn get_bid(client: &Client, server_url: &str, timeout: Duration) -> Result<String> {
    tokio::time::timeout(timeout, load_bid(client, server_url))
        .await
        .map_err(|_| anyhow!("No answer from {} within {:?}", server_url, timeout))?
}

async fn load_bid(client: &Client, server_url: &str) -> Result<String> {
    debug!("Requesting cotacao from {}", server_url);

    let resp = client.get(server_url).send().await?;
    if !resp.status().is_success() {
        anyhow::bail!("Server answered {}", resp.status());
    }

    let body: BidResponse = resp.json().await?;

    Ok(body.bid)
}

/// Replaces whatever is at `path` with `Dólar: <bid>`.
///
/// The text goes to a temporary file next to `path` which is then renamed over
/// it, so a failed write never leaves a partial or truncated file behind.
pub fn write_quote(path: &Path, bid: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Can't create a temporary file in {}", dir.display()))?;
    write!(file, "Dólar: {}", bid)
        .and_then(|_| file.as_file().sync_all())
        .with_context(|| format!("Can't write {}", file.path().display()))?;
    file.persist(path)
        .with_context(|| format!("Can't write {}", path.display()))?;

    Ok(())
}

pub async fn run(config: &ClientConfig) -> Result<String> {
    let client = Client::new();
    let bid = get_bid(&client, &config.server_url, config.timeout).await?;
    write_quote(Path::new(&config.output), &bid)?;
    info!("Wrote {} to {}", bid, config.output);

    Ok(bid)
}
