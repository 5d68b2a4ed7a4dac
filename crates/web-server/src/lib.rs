use axum::{Router, routing::get};
use chrono::{DateTime, NaiveDate, Utc};
use configuration::Config;
use core_types::Interval;
use market_data::{MarketDataSource, resolve_range};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

use error::AppError;

/// The shared application state that all handlers can access.
///
/// Read-only: every request fetches its own data and computes from scratch.
pub struct AppState {
    pub source: Arc<dyn MarketDataSource>,
    pub config: Config,
}

impl AppState {
    pub fn new(source: Arc<dyn MarketDataSource>, config: Config) -> Self {
        Self { source, config }
    }

    /// Resolves the optional date range and interval of a request against the
    /// configured defaults.
    pub fn request_window(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        interval: Option<Interval>,
    ) -> Result<(Interval, DateTime<Utc>, DateTime<Utc>), AppError> {
        let interval = interval.unwrap_or(self.config.data.default_interval);
        let today = Utc::now().date_naive();
        let (start, end) = resolve_range(start, end, self.config.data.default_lookback_days, today)?;
        Ok((interval, start, end))
    }
}

/// Builds the API routes on top of `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/rsi", get(handlers::get_rsi))
        .route("/api/return-risk", get(handlers::get_return_risk))
        .route("/api/correlation-matrix", get(handlers::get_correlation_matrix))
        .route("/api/rolling-correlation", get(handlers::get_rolling_correlation))
        .route("/api/spread", get(handlers::get_spread))
        .with_state(state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
}

/// The main function to configure and run the web server.
///
/// Tracing must already be initialised by the caller.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    config.server.validate()?;
    let host = config.server.host.trim().to_string();
    let port = config.server.port;
    let source = market_data::build_source(&config.data)?;
    let app = router(Arc::new(AppState::new(source, config)));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!("Web server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, TimeZone};
    use core_types::{PricePoint, PriceSeries};
    use market_data::MarketDataError;
    use serde_json::Value;
    use tower::ServiceExt;

    /// 120 daily closes from 2024-01-01 for AAA, BBB, CCC and ZERO (which
    /// closes at 0.0 on day 10).
    struct SyntheticSource;

    fn closes(symbol: &str) -> Option<Vec<f64>> {
        let f: fn(f64) -> f64 = match symbol {
            "AAA" => |t| 100.0 + 10.0 * (t * 0.2).sin() + t * 0.1,
            "BBB" => |t| 50.0 + 5.0 * (t * 0.2 + 0.3).sin() + (t * 1.7).cos(),
            "CCC" => |t| 80.0 + t * 0.3 + 3.0 * (t * 0.5).cos(),
            "ZERO" => |t| if t == 10.0 { 0.0 } else { 20.0 + t },
            _ => return None,
        };
        Some((0..120).map(|i| f(i as f64)).collect())
    }

    #[async_trait]
    impl MarketDataSource for SyntheticSource {
        async fn fetch_series(
            &self,
            symbol: &str,
            interval: Interval,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<PriceSeries, MarketDataError> {
            if symbol == "FAIL" {
                return Err(MarketDataError::Provider("upstream exploded".to_string()));
            }
            let unavailable = || MarketDataError::DataUnavailable {
                symbol: symbol.to_string(),
                interval,
            };
            let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let points: Vec<PricePoint> = closes(symbol)
                .ok_or_else(unavailable)?
                .into_iter()
                .enumerate()
                .map(|(i, c)| PricePoint::new(base + Duration::days(i as i64), c))
                .filter(|p| p.timestamp >= start && p.timestamp <= end)
                .collect();
            if points.is_empty() {
                return Err(unavailable());
            }
            Ok(PriceSeries::new(symbol, interval, points)?)
        }

        fn name(&self) -> &'static str {
            "synthetic"
        }
    }

    fn app() -> Router {
        router(Arc::new(AppState::new(Arc::new(SyntheticSource), Config::default())))
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    const RANGE: &str = "start=2024-01-01&end=2024-12-31";

    #[tokio::test]
    async fn health_check() {
        let response = app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rsi_endpoint_returns_bars_and_report() {
        let (status, json) = get_json(&format!("/api/rsi?symbol=aaa&{}&window=10", RANGE)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["symbol"], "AAA");
        assert_eq!(json["bars"].as_array().unwrap().len(), 120);
        assert_eq!(json["params"]["window"], 10);
        assert!(json["bars"][0]["rsi"].is_null());
        assert!(json["report"]["total_trades"].is_number());
    }

    #[tokio::test]
    async fn unknown_symbol_is_not_found() {
        let (status, json) = get_json(&format!("/api/rsi?symbol=ZZZ&{}", RANGE)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("ZZZ"));
    }

    #[tokio::test]
    async fn invalid_parameters_are_bad_requests() {
        let (status, json) =
            get_json(&format!("/api/rsi?symbol=AAA&{}&oversold=80&overbought=20", RANGE)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());

        let (status, _) =
            get_json(&format!("/api/rolling-correlation?symbol1=AAA&symbol2=BBB&{}&window=500", RANGE))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json("/api/rsi?symbol=AAA&start=2024-05-01&end=2024-01-01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_symbols_are_bad_requests() {
        for uri in [
            format!("/api/rsi?symbol=../X&{}", RANGE),
            format!("/api/return-risk?symbol=%2Fetc%2FSECRET&{}", RANGE),
            format!("/api/correlation-matrix?symbols=AAA,..%2FBBB&{}", RANGE),
            format!("/api/spread?symbol1=AAA&symbol2=B%3Fx%3D1&{}", RANGE),
        ] {
            let (status, json) = get_json(&uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(json["error"].as_str().unwrap().contains("Invalid symbol"), "{}", uri);
        }
    }

    #[tokio::test]
    async fn identical_pair_symbols_are_bad_requests() {
        let (status, json) =
            get_json(&format!("/api/spread?symbol1=AAA&symbol2=aaa&{}", RANGE)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("must differ"));

        let (status, _) = get_json(&format!(
            "/api/rolling-correlation?symbol1=AAA&symbol2=AAA&{}",
            RANGE
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn zero_close_is_reported_as_bad_input() {
        let (status, json) = get_json(&format!("/api/return-risk?symbol=ZERO&{}", RANGE)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("previous close is 0"));

        let (status, json) = get_json(&format!(
            "/api/correlation-matrix?symbols=AAA,ZERO&basis=returns&{}",
            RANGE
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("ZERO"));
    }

    #[tokio::test]
    async fn provider_failure_is_bad_gateway() {
        let (status, json) = get_json(&format!("/api/return-risk?symbol=FAIL&{}", RANGE)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(json["error"].as_str().unwrap().contains("upstream exploded"));
    }

    #[tokio::test]
    async fn return_risk_endpoint() {
        let (status, json) =
            get_json(&format!("/api/return-risk?symbol=CCC&{}&rolling_window=10", RANGE)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"]["observations"], 119);
        assert_eq!(json["histogram"]["density"].as_array().unwrap().len(), 50);
        assert!(json["rolling_volatility"][8]["volatility"].is_null());
        assert!(json["rolling_volatility"][9]["volatility"].is_number());
    }

    #[tokio::test]
    async fn correlation_matrix_endpoint() {
        let (status, json) =
            get_json(&format!("/api/correlation-matrix?symbols=AAA,BBB,CCC,NOPE&{}", RANGE)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["symbols"], serde_json::json!(["AAA", "BBB", "CCC"]));
        assert_eq!(json["dropped"], serde_json::json!(["NOPE"]));
        let matrix = json["matrix"].as_array().unwrap();
        assert_eq!(matrix.len(), 3);
        for (i, row) in matrix.iter().enumerate() {
            assert_eq!(row[i], 1.0);
        }

        let (status, _) = get_json(&format!("/api/correlation-matrix?symbols=AAA&{}", RANGE)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rolling_correlation_endpoint() {
        let (status, json) = get_json(&format!(
            "/api/rolling-correlation?symbol1=AAA&symbol2=BBB&{}&window=20&band_window=50",
            RANGE
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["rows"].as_array().unwrap().len(), 101);
        assert_eq!(json["summary"]["expanding_bands"], false);
    }

    #[tokio::test]
    async fn spread_endpoint() {
        let (status, json) =
            get_json(&format!("/api/spread?symbol1=AAA&symbol2=CCC&{}&window=30", RANGE)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["hedge_ratio"].is_number());
        assert_eq!(json["bars"].as_array().unwrap().len(), 120);
        assert!(json["bars"][28]["zscore"].is_null());

        let (status, _) = get_json(&format!("/api/spread?symbol1=AAA&symbol2=NOPE&{}", RANGE)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
