use anyhow::Result;
use cotacao::{client, config::ClientConfig};
use env_logger::Env;
use log::error;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = ClientConfig::from_env()?;
    if let Err(e) = client::run(&config).await {
        error!("Error fetching cotacao: {:#}", e);
    }

    Ok(())
}
