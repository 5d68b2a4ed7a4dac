use crate::error::MarketDataError;
use crate::responses::{ChartResponse, ChartResult};
use crate::{MarketDataSource, check_symbol};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use configuration::DataConfig;
use core_types::{Interval, PricePoint, PriceSeries};
use std::time::Duration;

/// A `MarketDataSource` backed by the public Yahoo Finance chart endpoint.
#[derive(Clone)]
pub struct YahooChartClient {
    client: reqwest::Client,
    base_url: String,
    adjusted: bool,
}

impl YahooChartClient {
    pub fn new(config: &DataConfig) -> Result<Self, MarketDataError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            adjusted: config.adjusted,
        })
    }
}

#[async_trait]
impl MarketDataSource for YahooChartClient {
    async fn fetch_series(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PriceSeries, MarketDataError> {
        check_symbol(symbol)?;
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        tracing::debug!(%url, %interval, %start, %end, "Requesting chart");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", interval.code().to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await?;

        // Error payloads arrive with 4xx statuses but the same envelope, so the
        // body is parsed before the status is judged.
        let status = response.status();
        let text = response.text().await?;
        let chart: ChartResponse = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                MarketDataError::Deserialization(e.to_string())
            } else {
                MarketDataError::Provider(format!("HTTP {} for {}", status, symbol))
            }
        })?;

        parse_chart(symbol, interval, chart, self.adjusted)
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

/// Converts a chart payload into a validated `PriceSeries`.
///
/// Bars whose close is `null` are skipped. An API error, an empty result and
/// a result without any usable bar all map to `DataUnavailable`, except for
/// error codes that are not about missing data, which map to `Provider`.
pub fn parse_chart(
    symbol: &str,
    interval: Interval,
    response: ChartResponse,
    adjusted: bool,
) -> Result<PriceSeries, MarketDataError> {
    let unavailable = || MarketDataError::DataUnavailable {
        symbol: symbol.to_string(),
        interval,
    };

    if let Some(error) = response.chart.error {
        tracing::warn!(symbol, code = %error.code, description = %error.description, "Chart API error");
        return match error.code.as_str() {
            "Not Found" | "Bad Request" => Err(unavailable()),
            _ => Err(MarketDataError::Provider(format!(
                "{}: {}",
                error.code, error.description
            ))),
        };
    }

    let result: ChartResult = response
        .chart
        .result
        .and_then(|mut results| results.pop())
        .ok_or_else(unavailable)?;

    let closes = select_closes(&result, adjusted);
    let timestamps = result.timestamp.unwrap_or_default();

    if closes.len() != timestamps.len() {
        return Err(MarketDataError::InvalidData(format!(
            "{} timestamps but {} closes for {}",
            timestamps.len(),
            closes.len(),
            symbol
        )));
    }

    let mut points = Vec::with_capacity(timestamps.len());
    for (ts, close) in timestamps.iter().zip(closes) {
        let Some(close) = close.filter(|c| c.is_finite()) else {
            continue;
        };
        let timestamp = Utc
            .timestamp_opt(*ts, 0)
            .single()
            .ok_or_else(|| MarketDataError::InvalidData(format!("Invalid timestamp: {}", ts)))?;
        points.push(PricePoint::new(timestamp, close));
    }

    if points.is_empty() {
        return Err(unavailable());
    }

    tracing::info!(
        symbol,
        %interval,
        bars = points.len(),
        currency = result.meta.currency.as_deref().unwrap_or("?"),
        exchange = result.meta.exchange_name.as_deref().unwrap_or("?"),
        "Fetched price series"
    );
    Ok(PriceSeries::new(symbol, interval, points)?)
}

fn select_closes(result: &ChartResult, adjusted: bool) -> Vec<Option<f64>> {
    let raw = result
        .indicators
        .quote
        .first()
        .map(|q| q.close.clone())
        .unwrap_or_default();

    if adjusted {
        if let Some(adj) = result.indicators.adjclose.first() {
            if adj.adjclose.len() == raw.len() {
                return adj.adjclose.clone();
            }
        }
    }
    raw
}
