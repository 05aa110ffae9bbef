use std::{fmt, time::Duration};

use actix_web::{
    App, HttpResponse, HttpServer, ResponseError, get,
    http::{StatusCode, header::ContentType},
    middleware::Logger,
    web,
};
use anyhow::{Context, Result};
use log::{error, info};
use reqwest::Client;
use tokio::time::Instant;

use crate::{
    config::ServerConfig, exchange_rate::ExchangeRate, fetcher::RateFetcher, quote::BidResponse,
    store::RateStore,
};

pub struct AppState {
    fetcher: RateFetcher,
    store: RateStore,
    total_timeout: Duration,
    persist_timeout: Duration,
}

impl AppState {
    pub fn new(
        fetcher: RateFetcher,
        store: RateStore,
        total_timeout: Duration,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            store,
            total_timeout,
            persist_timeout,
        }
    }
}

/// Why `/cotacao` failed. Callers only ever see a 500 with the short message.
#[derive(Debug)]
pub enum QuoteError {
    Fetch(anyhow::Error),
    Storage(anyhow::Error),
    Deadline(Duration),
}

impl fmt::Display for QuoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteError::Fetch(_) => write!(f, "failed to fetch dollar rate"),
            QuoteError::Storage(_) => write!(f, "failed to save rate to database"),
            QuoteError::Deadline(_) => write!(f, "request deadline exceeded"),
        }
    }
}

impl ResponseError for QuoteError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type(ContentType::plaintext())
            .body(self.to_string())
    }
}

impl QuoteError {
    fn log(&self) {
        match self {
            QuoteError::Fetch(e) => error!("Error fetching dollar rate: {:#}", e),
            QuoteError::Storage(e) => error!("Error saving rate to database: {:#}", e),
            QuoteError::Deadline(d) => error!("Request to /cotacao exceeded {:?}", d),
        }
    }
}

#[get("/cotacao")]
async fn cotacao(state: web::Data<AppState>) -> Result<web::Json<BidResponse>, QuoteError> {
    match fetch_and_store(&state).await {
        Ok(bid) => Ok(web::Json(BidResponse { bid })),
        Err(e) => {
            e.log();
            Err(e)
        }
    }
}

/// The save is never cut short from outside; its own deadline is clipped to
/// what is left of the total so it can roll back instead of half-finishing.
async fn fetch_and_store(state: &AppState) -> Result<String, QuoteError> {
    let deadline = Instant::now() + state.total_timeout;

    let bid = tokio::time::timeout_at(deadline, state.fetcher.fetch_bid())
        .await
        .map_err(|_| QuoteError::Deadline(state.total_timeout))?
        .map_err(QuoteError::Fetch)?;
    let rate = ExchangeRate::new(bid).map_err(QuoteError::Fetch)?;

    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(QuoteError::Deadline(state.total_timeout));
    }

    state
        .store
        .save(&rate, state.persist_timeout.min(remaining))
        .await
        .map_err(QuoteError::Storage)?;
    info!("Served rate {} captured at {}", rate.rate, rate.captured_at);

    Ok(rate.rate)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(cotacao);
}

pub async fn run(config: ServerConfig) -> Result<()> {
    let store = RateStore::connect(&config.database_url).await?;
    let client = Client::builder()
        .user_agent(concat!("cotacao/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let fetcher = RateFetcher::new(client, &config.api_url, config.fetch_timeout);
    let state = web::Data::new(AppState::new(
        fetcher,
        store.clone(),
        config.total_timeout,
        config.persist_timeout,
    ));

    info!("Server running on {}", config.bind);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(&config.bind)
    .with_context(|| format!("Can't bind {}", config.bind))?
    .run()
    .await?;

    store.close().await;

    Ok(())
}
