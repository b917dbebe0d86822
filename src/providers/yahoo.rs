//! NSE price lookups via the Yahoo Finance chart API

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::price::{PriceProvider, PriceQuote};

pub struct YahooProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent("nidx/0.1").build()?;
        Ok(YahooProvider {
            base_url: base_url.to_string(),
            client,
        })
    }

    // Yahoo lists NSE equities under a .NS suffix
    fn ticker_for(symbol: &str) -> String {
        if symbol.ends_with(".NS") {
            symbol.to_string()
        } else {
            format!("{symbol}.NS")
        }
    }
}

#[derive(Deserialize, Debug)]
struct YahooPriceResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Vec<PriceChartItem>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: PriceChartMeta,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
    currency: String,
}

#[async_trait]
impl PriceProvider for YahooProvider {
    #[instrument(
        name = "YahooPriceFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_price(&self, symbol: &str) -> Result<PriceQuote> {
        let ticker = Self::ticker_for(symbol);
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=5d",
            self.base_url, ticker
        );
        debug!("Requesting price data from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: YahooPriceResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let item = data
            .chart
            .result
            .first()
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

        Ok(PriceQuote {
            price: item.meta.regular_market_price,
            currency: item.meta.currency.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(ticker: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{ticker}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_price_fetch() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 2450.75,
                        "currency": "INR"
                    }
                }]
            }
        }"#;

        let mock_server = create_mock_server("RELIANCE.NS", mock_response).await;

        let provider = YahooProvider::new(&mock_server.uri()).unwrap();
        let result = provider.fetch_price("RELIANCE").await.unwrap();
        assert_eq!(result.price, 2450.75);
        assert_eq!(result.currency, "INR");
    }

    #[tokio::test]
    async fn test_suffixed_symbol_is_not_doubled() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 3890.25,
                        "currency": "INR"
                    }
                }]
            }
        }"#;

        let mock_server = create_mock_server("TCS.NS", mock_response).await;

        let provider = YahooProvider::new(&mock_server.uri()).unwrap();
        let result = provider.fetch_price("TCS.NS").await.unwrap();
        assert_eq!(result.price, 3890.25);
    }

    #[tokio::test]
    async fn test_no_price_result_data() {
        let mock_response = r#"{"chart": {"result": []}}"#;
        let mock_server = create_mock_server("INVALID.NS", mock_response).await;

        let provider = YahooProvider::new(&mock_server.uri()).unwrap();
        let result = provider.fetch_price("INVALID").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "No price data found for symbol: INVALID"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_response = r#"{"chart": {"results": []}}"#; // "results" instead of "result"
        let mock_server = create_mock_server("RELIANCE.NS", mock_response).await;

        let provider = YahooProvider::new(&mock_server.uri()).unwrap();
        let result = provider.fetch_price("RELIANCE").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for RELIANCE")
        );
    }

    #[tokio::test]
    async fn test_http_error_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/RELIANCE.NS"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let provider = YahooProvider::new(&mock_server.uri()).unwrap();
        let result = provider.fetch_price("RELIANCE").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for symbol: RELIANCE"
        );
    }
}
