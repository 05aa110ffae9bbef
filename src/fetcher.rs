use std::time::Duration;

use anyhow::{Result, anyhow};
use log::debug;
use reqwest::Client;

use crate::quote::{Quote, USD_BRL};

pub struct RateFetcher {
    client: Client,
    api_url: String,
    timeout: Duration,
}

impl RateFetcher {
    pub fn new(client: Client, api_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
            timeout,
        }
    }

    /// Fetches the current USD-BRL bid, giving up once `timeout` elapses.
    pub async fn fetch_bid(&self) -> Result<String> {
        tokio::time::timeout(self.timeout, self.load_bid())
            .await
            .map_err(|_| anyhow!("No answer from {} within {:?}", self.api_url, self.timeout))?
    }

    async fn load_bid(&self) -> Result<String> {
        debug!("Requesting exchange rate from {}", self.api_url);

        let resp = self.client.get(&self.api_url).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("Can't fetch the exchange rate: {}", resp.status());
        }

        let quote: Quote = resp.json().await?;

        quote.bid_for(USD_BRL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_PATH: &str = "/json/last/USD-BRL";

    async fn create_mock_server(response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(API_PATH))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn fetcher(mock_server: &MockServer, timeout: Duration) -> RateFetcher {
        let url = format!("{}{}", mock_server.uri(), API_PATH);
        RateFetcher::new(Client::new(), &url, timeout)
    }

    #[tokio::test]
    async fn fetches_bid() {
        let body = r#"{"USDBRL": {"code": "USD", "codein": "BRL", "bid": "5.4321"}}"#;
        let mock_server = create_mock_server(ResponseTemplate::new(200).set_body_string(body)).await;

        let bid = fetcher(&mock_server, Duration::from_secs(2))
            .fetch_bid()
            .await
            .unwrap();
        assert_eq!(bid, "5.4321");
    }

    #[tokio::test]
    async fn slow_api_times_out() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"USDBRL": {"bid": "5.4321"}}"#)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let err = fetcher(&mock_server, Duration::from_millis(50))
            .fetch_bid()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No answer"));
    }

    #[tokio::test]
    async fn error_status_fails() {
        let mock_server = create_mock_server(ResponseTemplate::new(503)).await;

        let result = fetcher(&mock_server, Duration::from_secs(2)).fetch_bid().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unexpected_shape_fails() {
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string(r#"{"status": 404}"#))
                .await;

        let result = fetcher(&mock_server, Duration::from_secs(2)).fetch_bid().await;
        assert!(result.is_err());
    }
}
