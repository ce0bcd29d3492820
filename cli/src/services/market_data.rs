use crate::{
    analysis::stock::StockAnalysis,
    error::MarketDataError,
    models::{HistoryRequest, StockDataPoint},
    utils::{log_market_data, start_of_day, Logger, Timer},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::{Duration as StdDuration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Source of OHLC price history for a single ticker
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn history(&self, request: &HistoryRequest) -> Result<Vec<StockDataPoint>, MarketDataError>;
}

/// Uppercases and validates a ticker symbol such as `NFLX`, `BRK-B` or `^GSPC`
pub fn normalize_ticker(ticker: &str) -> Result<String, MarketDataError> {
    static TICKER_RE: OnceLock<Regex> = OnceLock::new();
    let re = TICKER_RE.get_or_init(|| {
        Regex::new(r"^[A-Z0-9^][A-Z0-9.\-=^]{0,14}$").expect("ticker pattern is valid")
    });

    let upper = ticker.trim().to_uppercase();
    if re.is_match(&upper) {
        Ok(upper)
    } else {
        Err(MarketDataError::InvalidTicker(ticker.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    pub timeout: StdDuration,
    pub rate_limit_per_minute: u32,
    pub max_retries: u32,
    /// First backoff step; doubles with every retry
    pub retry_base_delay: StdDuration,
    pub random_agent: bool,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: StdDuration::from_secs(30),
            rate_limit_per_minute: 30,
            max_retries: 4,
            retry_base_delay: StdDuration::from_secs(1),
            random_agent: true,
        }
    }
}

/// Client for the Yahoo Finance v8 chart endpoint
pub struct YahooClient {
    client: Client,
    config: YahooConfig,
    request_timestamps: Mutex<Vec<Instant>>,
    user_agents: Vec<&'static str>,
    logger: Logger,
}

impl YahooClient {
    pub fn new(config: YahooConfig) -> Result<Self, MarketDataError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        ];

        Ok(Self {
            client,
            config,
            request_timestamps: Mutex::new(Vec::new()),
            user_agents,
            logger: Logger::new("MARKET_DATA"),
        })
    }

    fn user_agent(&self) -> &'static str {
        if self.config.random_agent {
            use rand::seq::SliceRandom;
            self.user_agents
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(self.user_agents[0])
        } else {
            self.user_agents[0]
        }
    }

    async fn enforce_rate_limit(&self) {
        let window = StdDuration::from_secs(60);
        let mut timestamps = self.request_timestamps.lock().await;
        let now = Instant::now();

        timestamps.retain(|t| now.duration_since(*t) < window);

        if timestamps.len() >= self.config.rate_limit_per_minute as usize {
            if let Some(&oldest) = timestamps.first() {
                let wait = window.saturating_sub(now.duration_since(oldest));
                if !wait.is_zero() {
                    self.logger.debug(&format!("Rate limit reached, waiting {}ms", wait.as_millis()));
                    sleep(wait + StdDuration::from_millis(100)).await;
                }
            }
        }

        timestamps.push(Instant::now());
    }

    /// Query parameters for the chart endpoint
    pub fn build_query(
        request: &HistoryRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<(&'static str, String)>, MarketDataError> {
        let mut query = vec![("interval", request.interval.as_str().to_string())];

        match request.start {
            Some(start) => {
                let period1 = start_of_day(start);
                // End date is inclusive
                let period2 = request
                    .end
                    .map(|end| start_of_day(end) + ChronoDuration::days(1))
                    .unwrap_or(now);
                if period2 <= period1 {
                    return Err(MarketDataError::InvalidRange(format!(
                        "start {} is not before end {}",
                        start,
                        period2.format("%Y-%m-%d")
                    )));
                }
                query.push(("period1", period1.timestamp().to_string()));
                query.push(("period2", period2.timestamp().to_string()));
            }
            // The period counts back from an explicit end date
            None => match request.end {
                Some(end) => {
                    let period2 = start_of_day(end) + ChronoDuration::days(1);
                    let period1 = request.period.start_before(period2);
                    query.push(("period1", period1.timestamp().to_string()));
                    query.push(("period2", period2.timestamp().to_string()));
                }
                None => query.push(("range", request.period.as_str().to_string())),
            },
        }

        query.push(("includePrePost", "false".to_string()));
        Ok(query)
    }

    async fn make_request(&self, url: &str, query: &[(&'static str, String)]) -> Result<Value, MarketDataError> {
        let mut last_error = String::from("no attempts made");

        for attempt in 0..=self.config.max_retries {
            self.enforce_rate_limit().await;

            if attempt > 0 {
                let base = self.config.retry_base_delay.as_secs_f64();
                let delay = StdDuration::from_secs_f64(base * (2.0_f64.powi(attempt as i32 - 1) + rand::random::<f64>()));
                let delay = delay.min(StdDuration::from_secs(30));
                self.logger.debug(&format!("Retry {} after {}ms: {}", attempt, delay.as_millis(), last_error));
                sleep(delay).await;
            }

            let response = self
                .client
                .get(url)
                .query(query)
                .header("Accept", "application/json, text/plain, */*")
                .header("User-Agent", self.user_agent())
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    // A 404 still carries the provider's chart.error payload
                    if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
                        match resp.json::<Value>().await {
                            Ok(data) => return Ok(data),
                            Err(e) => {
                                last_error = format!("invalid JSON body: {}", e);
                                continue;
                            }
                        }
                    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = MarketDataError::RateLimit.to_string();
                        continue;
                    } else if status.is_server_error() {
                        last_error = format!("HTTP {}", status);
                        continue;
                    } else {
                        return Err(MarketDataError::InvalidResponse(format!("HTTP {}", status)));
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            }
        }

        Err(MarketDataError::RetriesExhausted(last_error))
    }
}

#[async_trait]
impl PriceFeed for YahooClient {
    async fn history(&self, request: &HistoryRequest) -> Result<Vec<StockDataPoint>, MarketDataError> {
        let ticker = normalize_ticker(&request.ticker)?;
        let query = Self::build_query(request, Utc::now())?;
        let url = format!("{}/v8/finance/chart/{}", self.config.base_url.trim_end_matches('/'), ticker);

        let timer = Timer::start(&format!("{} history", ticker));
        let body = self.make_request(&url, &query).await?;
        let points = parse_chart_response(&ticker, &body)?;

        log_market_data(&format!(
            "{} {} bars ({} {}) in {:.1}ms",
            ticker,
            points.len(),
            request.period.as_str(),
            request.interval.as_str(),
            timer.elapsed_ms()
        ));
        Ok(points)
    }
}

/// Convert a chart endpoint payload into sorted OHLCV points.
///
/// Bars with any null OHLC field are dropped; a null volume counts as zero.
pub fn parse_chart_response(ticker: &str, body: &Value) -> Result<Vec<StockDataPoint>, MarketDataError> {
    let chart = body
        .get("chart")
        .ok_or_else(|| MarketDataError::InvalidResponse("missing chart object".to_string()))?;

    if let Some(error) = chart.get("error").filter(|e| !e.is_null()) {
        return Err(MarketDataError::Provider {
            code: error.get("code").and_then(Value::as_str).unwrap_or("unknown").to_string(),
            description: error.get("description").and_then(Value::as_str).unwrap_or("").to_string(),
        });
    }

    let result = match chart.get("result").and_then(Value::as_array) {
        Some(results) if !results.is_empty() => &results[0],
        _ => return Err(MarketDataError::NoData(ticker.to_string())),
    };

    let timestamps = match result.get("timestamp").and_then(Value::as_array) {
        Some(ts) if !ts.is_empty() => ts,
        _ => return Err(MarketDataError::NoData(ticker.to_string())),
    };

    let quote = result
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(Value::as_array)
        .and_then(|q| q.first())
        .ok_or_else(|| MarketDataError::InvalidResponse("missing indicators.quote".to_string()))?;

    let column = |key: &str| -> Result<&Vec<Value>, MarketDataError> {
        quote
            .get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| MarketDataError::InvalidResponse(format!("missing key: {}", key)))
    };
    let opens = column("open")?;
    let highs = column("high")?;
    let lows = column("low")?;
    let closes = column("close")?;
    let volumes = column("volume")?;

    let length = timestamps.len();
    if [opens.len(), highs.len(), lows.len(), closes.len(), volumes.len()]
        .iter()
        .any(|&len| len != length)
    {
        return Err(MarketDataError::InvalidResponse("Inconsistent array lengths".to_string()));
    }

    let mut points = Vec::with_capacity(length);
    for i in 0..length {
        let ts = timestamps[i].as_i64().ok_or_else(|| {
            MarketDataError::InvalidResponse(format!("Invalid timestamp at index {}: {}", i, timestamps[i]))
        })?;
        let date = DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| {
            MarketDataError::InvalidResponse(format!("Timestamp out of range at index {}: {}", i, ts))
        })?;

        let (Some(open), Some(high), Some(low), Some(close)) = (
            opens[i].as_f64(),
            highs[i].as_f64(),
            lows[i].as_f64(),
            closes[i].as_f64(),
        ) else {
            continue;
        };
        let volume = volumes[i].as_i64().or_else(|| volumes[i].as_f64().map(|v| v as i64)).unwrap_or(0);

        points.push(StockDataPoint::new(ticker.to_string(), date, open, high, low, close, volume));
    }

    if points.is_empty() {
        return Err(MarketDataError::NoData(ticker.to_string()));
    }
    points.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(points)
}

/// OHLC history for one ticker plus the request that produced it
#[derive(Debug, Clone)]
pub struct Stock {
    pub request: HistoryRequest,
    pub df: Vec<StockDataPoint>,
}

impl Stock {
    pub async fn fetch(feed: &dyn PriceFeed, request: HistoryRequest) -> Result<Self, MarketDataError> {
        let df = feed.history(&request).await?;
        Ok(Self { request, df })
    }

    pub fn ticker(&self) -> &str {
        &self.request.ticker
    }

    pub fn closes(&self) -> Vec<f64> {
        self.df.iter().map(|p| p.close).collect()
    }

    pub fn volumes(&self) -> Vec<i64> {
        self.df.iter().map(|p| p.volume).collect()
    }

    pub fn analysis(&self) -> StockAnalysis {
        StockAnalysis::from_history(&self.df, self.request.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Interval, Period};
    use chrono::NaiveDate;
    use serde_json::json;

    fn sample_body() -> Value {
        json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "NFLX", "currency": "USD"},
                    "timestamp": [1734705000, 1734445800, 1734532200],
                    "indicators": {
                        "quote": [{
                            "open": [900.0, 880.0, null],
                            "high": [915.0, 890.0, 905.0],
                            "low": [895.0, 870.0, 885.0],
                            "close": [909.05, 886.0, 889.5],
                            "volume": [4200000, 3100000, null]
                        }]
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" nflx ").unwrap(), "NFLX");
        assert_eq!(normalize_ticker("brk-b").unwrap(), "BRK-B");
        assert_eq!(normalize_ticker("^GSPC").unwrap(), "^GSPC");
        assert!(normalize_ticker("").is_err());
        assert!(normalize_ticker("NFLX/../x").is_err());
        assert!(normalize_ticker("ABCDEFGHIJKLMNOPQ").is_err());
    }

    #[test]
    fn test_parse_chart_sorts_and_drops_null_bars() {
        let points = parse_chart_response("NFLX", &sample_body()).unwrap();
        assert_eq!(points.len(), 2);
        assert!(points[0].date < points[1].date);
        assert_eq!(points[0].close, 886.0);
        assert_eq!(points[1].volume, 4200000);
        assert_eq!(points[1].ticker, "NFLX");
    }

    #[test]
    fn test_parse_chart_provider_error() {
        let body = json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        });
        let err = parse_chart_response("ZZZZ", &body).unwrap_err();
        assert!(matches!(err, MarketDataError::Provider { ref code, .. } if code == "Not Found"));
    }

    #[test]
    fn test_parse_chart_inconsistent_lengths() {
        let mut body = sample_body();
        body["chart"]["result"][0]["indicators"]["quote"][0]["close"] = json!([1.0]);
        let err = parse_chart_response("NFLX", &body).unwrap_err();
        assert!(matches!(err, MarketDataError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_chart_empty_result() {
        let body = json!({"chart": {"result": [], "error": null}});
        assert!(matches!(
            parse_chart_response("NFLX", &body),
            Err(MarketDataError::NoData(_))
        ));
    }

    #[test]
    fn test_build_query_period_and_range() {
        let now = Utc::now();
        let req = HistoryRequest::new("NFLX")
            .with_period(Period::SixMonths)
            .with_interval(Interval::OneWeek);
        let query = YahooClient::build_query(&req, now).unwrap();
        assert!(query.contains(&("range", "6mo".to_string())));
        assert!(query.contains(&("interval", "1wk".to_string())));

        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let ranged = HistoryRequest::new("NFLX").with_range(Some(start), Some(end));
        let query = YahooClient::build_query(&ranged, now).unwrap();
        assert!(query.contains(&("period1", "1704153600".to_string())));
        assert!(query.contains(&("period2", "1706745600".to_string())));
        assert!(!query.iter().any(|(k, _)| *k == "range"));
    }

    #[test]
    fn test_build_query_period_before_end() {
        let end_only = HistoryRequest::new("NFLX")
            .with_period(Period::OneMonth)
            .with_range(None, NaiveDate::from_ymd_opt(2024, 3, 31));
        let query = YahooClient::build_query(&end_only, Utc::now()).unwrap();
        // 2024-03-01 and 2024-04-01 midnight UTC
        assert!(query.contains(&("period1", "1709251200".to_string())));
        assert!(query.contains(&("period2", "1711929600".to_string())));
        assert!(!query.iter().any(|(k, _)| *k == "range"));
    }

    #[test]
    fn test_build_query_rejects_bad_ranges() {
        let now = Utc::now();

        let inverted = HistoryRequest::new("NFLX").with_range(
            NaiveDate::from_ymd_opt(2024, 2, 1),
            NaiveDate::from_ymd_opt(2024, 1, 1),
        );
        assert!(matches!(
            YahooClient::build_query(&inverted, now),
            Err(MarketDataError::InvalidRange(_))
        ));
    }

    struct FixedFeed;

    #[async_trait]
    impl PriceFeed for FixedFeed {
        async fn history(&self, request: &HistoryRequest) -> Result<Vec<StockDataPoint>, MarketDataError> {
            parse_chart_response(&request.ticker, &sample_body())
        }
    }

    #[tokio::test]
    async fn test_stock_wrapper_fetch() {
        let stock = Stock::fetch(&FixedFeed, HistoryRequest::new("nflx")).await.unwrap();
        assert_eq!(stock.ticker(), "NFLX");
        assert_eq!(stock.closes(), vec![886.0, 909.05]);
        assert_eq!(stock.volumes(), vec![3100000, 4200000]);
        assert_eq!(stock.analysis().closes.len(), 2);
    }

    #[tokio::test]
    async fn test_client_creation() {
        assert!(YahooClient::new(YahooConfig::default()).is_ok());
    }

    mod retries {
        use super::*;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const CHART_PATH: &str = "/v8/finance/chart/NFLX";

        fn client(server: &MockServer, max_retries: u32) -> YahooClient {
            YahooClient::new(YahooConfig {
                base_url: server.uri(),
                timeout: StdDuration::from_secs(5),
                rate_limit_per_minute: 1000,
                max_retries,
                retry_base_delay: StdDuration::from_millis(5),
                random_agent: false,
            })
            .unwrap()
        }

        async fn mount(server: &MockServer, status: u16, times: u64) {
            Mock::given(method("GET"))
                .and(path(CHART_PATH))
                .respond_with(ResponseTemplate::new(status))
                .up_to_n_times(times)
                .expect(times)
                .mount(server)
                .await;
        }

        async fn mount_ok(server: &MockServer) {
            Mock::given(method("GET"))
                .and(path(CHART_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
                .expect(1)
                .mount(server)
                .await;
        }

        #[tokio::test]
        async fn test_retries_server_errors_then_succeeds() {
            let server = MockServer::start().await;
            mount(&server, 503, 2).await;
            mount_ok(&server).await;

            let points = client(&server, 3).history(&HistoryRequest::new("NFLX")).await.unwrap();
            assert_eq!(points.len(), 2);
        }

        #[tokio::test]
        async fn test_retries_rate_limit_responses() {
            let server = MockServer::start().await;
            mount(&server, 429, 1).await;
            mount_ok(&server).await;

            assert!(client(&server, 2).history(&HistoryRequest::new("NFLX")).await.is_ok());
        }

        #[tokio::test]
        async fn test_other_client_errors_stop_immediately() {
            let server = MockServer::start().await;
            mount(&server, 403, 1).await;

            let err = client(&server, 3).history(&HistoryRequest::new("NFLX")).await.unwrap_err();
            assert!(matches!(err, MarketDataError::InvalidResponse(ref m) if m.contains("403")));
        }

        #[tokio::test]
        async fn test_not_found_body_is_provider_error() {
            let server = MockServer::start().await;
            let body = json!({
                "chart": {
                    "result": null,
                    "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
                }
            });
            Mock::given(method("GET"))
                .and(path(CHART_PATH))
                .respond_with(ResponseTemplate::new(404).set_body_json(body))
                .expect(1)
                .mount(&server)
                .await;

            let err = client(&server, 3).history(&HistoryRequest::new("NFLX")).await.unwrap_err();
            assert!(matches!(err, MarketDataError::Provider { ref code, .. } if code == "Not Found"));
        }

        #[tokio::test]
        async fn test_gives_up_after_max_retries() {
            let server = MockServer::start().await;
            // One initial attempt plus two retries
            mount(&server, 500, 3).await;

            let err = client(&server, 2).history(&HistoryRequest::new("NFLX")).await.unwrap_err();
            assert!(matches!(err, MarketDataError::RetriesExhausted(ref m) if m.contains("500")));
        }
    }
}
