use anyhow::Result;
use cotacao::{config::ServerConfig, server};
use env_logger::Env;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env()?;
    server::run(config).await
}
