// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stock market data from the Yahoo Finance chart endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Url;
use sable_config::model::YFinanceConfig;
use sable_core::SableError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tool::{Tool, ToolOutput, ToolRegistry, optional_str, required_str};

const PERIODS: &[&str] = &[
    "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max",
];
const INTERVALS: &[&str] = &[
    "1m", "2m", "5m", "15m", "30m", "60m", "90m", "1h", "1d", "5d", "1wk", "1mo", "3mo",
];

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub full_exchange_name: Option<String>,
    #[serde(default)]
    pub regular_market_price: Option<f64>,
    #[serde(default)]
    pub regular_market_day_high: Option<f64>,
    #[serde(default)]
    pub regular_market_day_low: Option<f64>,
    #[serde(default)]
    pub regular_market_volume: Option<u64>,
    #[serde(default)]
    pub fifty_two_week_high: Option<f64>,
    #[serde(default)]
    pub fifty_two_week_low: Option<f64>,
    #[serde(default)]
    pub chart_previous_close: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// One OHLCV row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

#[derive(Debug)]
pub struct YFinanceClient {
    client: reqwest::Client,
    base_url: String,
}

impl YFinanceClient {
    pub fn new(config: &YFinanceConfig) -> Result<Self, SableError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)")
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| tool_error("failed to build HTTP client", e))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn chart(&self, symbol: &str, range: &str, interval: &str) -> Result<ChartResult, SableError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric() || ".-^=".contains(c)) {
            return Err(SableError::Tool {
                message: format!("invalid ticker symbol '{symbol}'"),
                source: None,
            });
        }
        let url = Url::parse_with_params(
            &format!("{}/v8/finance/chart/{symbol}", self.base_url),
            &[("range", range), ("interval", interval)],
        )
        .map_err(|e| tool_error("invalid chart URL", e))?;
        debug!(%symbol, range, interval, "fetching chart");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| tool_error("chart request failed", e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| tool_error("failed to read chart response", e))?;

        let envelope: ChartEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(SableError::Tool {
                    message: format!("Yahoo Finance returned {status} for {symbol}"),
                    source: None,
                });
            }
            Err(e) => return Err(tool_error("unexpected chart response", e)),
        };
        if let Some(error) = envelope.chart.error {
            return Err(SableError::Tool {
                message: format!("{symbol}: {} ({})", error.description, error.code),
                source: None,
            });
        }
        envelope
            .chart
            .result
            .and_then(|mut r| (!r.is_empty()).then(|| r.swap_remove(0)))
            .ok_or_else(|| SableError::Tool {
                message: format!("no data found for {symbol}"),
                source: None,
            })
    }
}

fn tool_error(context: &str, e: impl std::error::Error + Send + Sync + 'static) -> SableError {
    SableError::Tool {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

fn rows(result: &ChartResult) -> Vec<PriceRow> {
    let empty = Quote::default();
    let quote = result.indicators.quote.first().unwrap_or(&empty);
    let at = |v: &Vec<Option<f64>>, i: usize| v.get(i).copied().flatten();
    result
        .timestamp
        .iter()
        .enumerate()
        .map(|(i, ts)| PriceRow {
            date: DateTime::from_timestamp(*ts, 0)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| ts.to_string()),
            open: at(&quote.open, i),
            high: at(&quote.high, i),
            low: at(&quote.low, i),
            close: at(&quote.close, i),
            volume: quote.volume.get(i).copied().flatten(),
        })
        .collect()
}

fn symbol_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "symbol": {"type": "string", "description": "The stock symbol, e.g. NVDA"}
        },
        "required": ["symbol"]
    })
}

pub struct CurrentStockPrice(pub Arc<YFinanceClient>);

#[async_trait]
impl Tool for CurrentStockPrice {
    fn name(&self) -> &str {
        "get_current_stock_price"
    }

    fn description(&self) -> &str {
        "Get the current stock price for a given symbol."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        symbol_schema()
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let symbol = required_str(&input, "symbol")?;
        let chart = self.0.chart(symbol, "1d", "1d").await?;
        Ok(match chart.meta.regular_market_price {
            Some(price) => ToolOutput::ok(format!("{price:.4}")),
            None => ToolOutput::error(format!("Could not fetch current price for {symbol}")),
        })
    }
}

pub struct StockOverview(pub Arc<YFinanceClient>);

#[async_trait]
impl Tool for StockOverview {
    fn name(&self) -> &str {
        "get_stock_overview"
    }

    fn description(&self) -> &str {
        "Get an overview of a stock: name, exchange, currency, price, day range and 52-week range."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        symbol_schema()
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let symbol = required_str(&input, "symbol")?;
        let chart = self.0.chart(symbol, "1d", "1d").await?;
        Ok(ToolOutput::ok(
            serde_json::to_string_pretty(&chart.meta).unwrap_or_default(),
        ))
    }
}

pub struct HistoricalStockPrices(pub Arc<YFinanceClient>);

#[async_trait]
impl Tool for HistoricalStockPrices {
    fn name(&self) -> &str {
        "get_historical_stock_prices"
    }

    fn description(&self) -> &str {
        "Get historical prices for a stock symbol as a JSON list of {date, open, high, low, close, volume}."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "symbol": {"type": "string", "description": "The stock symbol"},
                "period": {"type": "string", "enum": PERIODS, "description": "Time span, defaults to 1mo"},
                "interval": {"type": "string", "enum": INTERVALS, "description": "Bar size, defaults to 1d"}
            },
            "required": ["symbol"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let symbol = required_str(&input, "symbol")?;
        let period = optional_str(&input, "period").unwrap_or("1mo");
        let interval = optional_str(&input, "interval").unwrap_or("1d");
        if !PERIODS.contains(&period) {
            return Ok(ToolOutput::error(format!(
                "invalid period '{period}', expected one of {}",
                PERIODS.join(", ")
            )));
        }
        if !INTERVALS.contains(&interval) {
            return Ok(ToolOutput::error(format!(
                "invalid interval '{interval}', expected one of {}",
                INTERVALS.join(", ")
            )));
        }
        let chart = self.0.chart(symbol, period, interval).await?;
        Ok(ToolOutput::ok(
            serde_json::to_string_pretty(&rows(&chart)).unwrap_or_else(|_| "[]".to_string()),
        ))
    }
}

pub fn register(registry: &mut ToolRegistry, config: &YFinanceConfig) -> Result<(), SableError> {
    let client = Arc::new(YFinanceClient::new(config)?);
    registry.register(Arc::new(CurrentStockPrice(client.clone())));
    registry.register(Arc::new(StockOverview(client.clone())));
    registry.register(Arc::new(HistoricalStockPrices(client)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chart_body() -> serde_json::Value {
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": {
                        "symbol": "NVDA",
                        "currency": "USD",
                        "longName": "NVIDIA Corporation",
                        "fullExchangeName": "NasdaqGS",
                        "regularMarketPrice": 181.25,
                        "fiftyTwoWeekHigh": 195.0,
                        "fiftyTwoWeekLow": 86.62
                    },
                    "timestamp": [1_760_000_000, 1_760_086_400],
                    "indicators": {"quote": [{
                        "open": [180.0, null],
                        "high": [182.5, 183.0],
                        "low": [179.1, 180.2],
                        "close": [181.0, 182.9],
                        "volume": [1000, 2000]
                    }]}
                }],
                "error": null
            }
        })
    }

    async fn client(server: &MockServer) -> Arc<YFinanceClient> {
        Arc::new(
            YFinanceClient::new(&YFinanceConfig {
                enabled: true,
                base_url: server.uri(),
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn current_price_reads_meta() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NVDA"))
            .and(query_param("range", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body()))
            .mount(&server)
            .await;

        let out = CurrentStockPrice(client(&server).await)
            .invoke(serde_json::json!({"symbol": "nvda"}))
            .await
            .unwrap();
        assert_eq!(out.content, "181.2500");
    }

    #[tokio::test]
    async fn historical_prices_become_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NVDA"))
            .and(query_param("range", "5d"))
            .and(query_param("interval", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body()))
            .mount(&server)
            .await;

        let out = HistoricalStockPrices(client(&server).await)
            .invoke(serde_json::json!({"symbol": "NVDA", "period": "5d"}))
            .await
            .unwrap();
        let rows: serde_json::Value = serde_json::from_str(&out.content).unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 2);
        assert_eq!(rows[0]["date"], "2025-10-09");
        assert!(rows[1]["open"].is_null());
        assert_eq!(rows[1]["volume"], 2000);
    }

    #[tokio::test]
    async fn invalid_period_is_reported_without_request() {
        let server = MockServer::start().await;
        let out = HistoricalStockPrices(client(&server).await)
            .invoke(serde_json::json!({"symbol": "NVDA", "period": "3w"}))
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn chart_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "chart": {"result": null, "error": {
                    "code": "Not Found",
                    "description": "No data found, symbol may be delisted"
                }}
            })))
            .mount(&server)
            .await;

        let err = StockOverview(client(&server).await)
            .invoke(serde_json::json!({"symbol": "ZZZZ"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("symbol may be delisted"));
    }

    #[tokio::test]
    async fn rejects_malformed_symbols() {
        let server = MockServer::start().await;
        let err = CurrentStockPrice(client(&server).await)
            .invoke(serde_json::json!({"symbol": "../etc"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid ticker"));
    }
}
