//! Yahoo Finance client.
//!
//! Daily bars come from the v8 chart API, option chains from v7 options and
//! headlines from v1 search. Each call is a single blocking round trip; a
//! failure is reported to the caller, which treats it as a per-asset failure.
//!
//! Yahoo has no official API and is subject to unannounced format changes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use super::provider::{
    DataError, Headline, HeadlineSource, Lookback, OptionsSource, PriceSource, MAX_HEADLINES,
};
use crate::domain::{Bar, PriceSeries};
use crate::options::OptionRow;

const BASE_URL: &str = "https://query2.finance.yahoo.com";

// ── Chart API ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
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

// ── Options API ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    option_chain: OptionChainResult,
}

#[derive(Debug, Deserialize)]
struct OptionChainResult {
    result: Option<Vec<OptionChainData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionChainData {
    #[serde(default)]
    expiration_dates: Vec<i64>,
    #[serde(default)]
    options: Vec<OptionExpiry>,
}

#[derive(Debug, Deserialize)]
struct OptionExpiry {
    #[serde(default)]
    calls: Vec<ContractData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractData {
    strike: f64,
    last_price: Option<f64>,
    implied_volatility: Option<f64>,
    volume: Option<u64>,
}

// ── Search API ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<NewsItem>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    title: Option<String>,
    link: Option<String>,
}

/// Yahoo Finance client implementing every market data trait.
pub struct YahooClient {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
}

impl YahooClient {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (mirrors, recorded fixtures).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `^VIX` → `%5EVIX` for use in a URL path.
    fn path_symbol(symbol: &str) -> String {
        symbol.replace('^', "%5E")
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        symbol: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerOpen {
                remaining_secs: self.circuit_breaker.remaining_cooldown().as_secs(),
            });
        }

        debug!(symbol, url, "yahoo request");
        let resp = self.client.get(url).query(query).send().map_err(|e| {
            self.circuit_breaker.record_failure();
            DataError::NetworkUnreachable(e.to_string())
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerOpen {
                remaining_secs: self.circuit_breaker.remaining_cooldown().as_secs(),
            });
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            self.circuit_breaker.record_failure();
            return Err(DataError::HttpStatus {
                provider: "yahoo_finance",
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let parsed = resp.json::<T>().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;
        self.circuit_breaker.record_success();
        Ok(parsed)
    }

    fn fetch_options(
        &self,
        symbol: &str,
        expiration: Option<NaiveDate>,
    ) -> Result<OptionChainData, DataError> {
        let url = format!(
            "{}/v7/finance/options/{}",
            self.base_url,
            Self::path_symbol(symbol)
        );
        let mut query = Vec::new();
        if let Some(exp) = expiration {
            query.push(("date", date_to_ts(exp).to_string()));
        }
        let resp: OptionsResponse = self.get_json(symbol, &url, &query)?;
        first_option_chain(symbol, resp)
    }
}

fn date_to_ts(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn ts_to_date(ts: i64) -> Result<NaiveDate, DataError> {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.naive_utc().date())
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))
}

/// Convert a chart response into bars. A response without timestamps is an
/// empty (but valid) history.
fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
        None => DataError::ResponseFormatChanged("empty result with no error".into()),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

    let Some(timestamps) = data.timestamp else {
        return Ok(Vec::new());
    };

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let field = |col: &[Option<f64>]| col.get(i).copied().flatten();
        let (open, high, low, close) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
        );
        let volume = quote.volume.get(i).copied().flatten();

        // Holidays show up as all-null rows
        if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none()
        {
            continue;
        }

        let bar = Bar {
            date: ts_to_date(ts)?,
            open: open.unwrap_or(f64::NAN),
            high: high.unwrap_or(f64::NAN),
            low: low.unwrap_or(f64::NAN),
            close: close.unwrap_or(f64::NAN),
            volume: volume.unwrap_or(0),
        };
        if !bar.is_consistent() {
            warn!(symbol, date = %bar.date, "dropping inconsistent bar");
            continue;
        }
        bars.push(bar);
    }

    // Intraday refreshes can repeat the current session; keep the last print.
    bars.dedup_by(|later, earlier| {
        if later.date == earlier.date {
            *earlier = later.clone();
            true
        } else {
            false
        }
    });

    Ok(bars)
}

fn first_option_chain(symbol: &str, resp: OptionsResponse) -> Result<OptionChainData, DataError> {
    let result = resp.option_chain.result.ok_or_else(|| match resp.option_chain.error {
        Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
        None => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
    })?;
    result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        })
}

fn calls_from_chain(chain: OptionChainData) -> Vec<OptionRow> {
    chain
        .options
        .into_iter()
        .next()
        .map(|expiry| {
            expiry
                .calls
                .into_iter()
                .map(|c| OptionRow {
                    strike: c.strike,
                    last_price: c.last_price.unwrap_or(f64::NAN),
                    implied_volatility: c.implied_volatility.unwrap_or(f64::NAN),
                    volume: c.volume.unwrap_or(0),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn headlines_from_search(resp: SearchResponse) -> Vec<Headline> {
    resp.news
        .into_iter()
        .filter_map(|item| match (item.title, item.link) {
            (Some(title), Some(link)) if !title.is_empty() && !link.is_empty() => {
                Some(Headline { title, link })
            }
            _ => None,
        })
        .take(MAX_HEADLINES)
        .collect()
}

impl PriceSource for YahooClient {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_history(&self, symbol: &str, lookback: Lookback) -> Result<PriceSeries, DataError> {
        let end = Utc::now().date_naive();
        let start = lookback.start_from(end);
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            Self::path_symbol(symbol)
        );
        let query = [
            ("period1", date_to_ts(start).to_string()),
            ("period2", (date_to_ts(end) + 86_399).to_string()),
            ("interval", "1d".to_string()),
        ];
        let resp: ChartResponse = self.get_json(symbol, &url, &query)?;
        let bars = parse_chart(symbol, resp)?;
        PriceSeries::new(symbol, bars).map_err(|e| DataError::ResponseFormatChanged(e.to_string()))
    }
}

impl HeadlineSource for YahooClient {
    fn fetch_headlines(&self, symbol: &str) -> Result<Vec<Headline>, DataError> {
        let url = format!("{}/v1/finance/search", self.base_url);
        let query = [
            ("q", symbol.to_string()),
            ("newsCount", MAX_HEADLINES.to_string()),
            ("quotesCount", "0".to_string()),
        ];
        let resp: SearchResponse = self.get_json(symbol, &url, &query)?;
        Ok(headlines_from_search(resp))
    }
}

impl OptionsSource for YahooClient {
    fn list_expirations(&self, symbol: &str) -> Result<Vec<NaiveDate>, DataError> {
        let chain = self.fetch_options(symbol, None)?;
        chain
            .expiration_dates
            .iter()
            .map(|&ts| ts_to_date(ts))
            .collect()
    }

    fn fetch_calls(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<Vec<OptionRow>, DataError> {
        let chain = self.fetch_options(symbol, Some(expiration))?;
        Ok(calls_from_chain(chain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chart_and_skips_holidays() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"open":[187.15,null,184.2],"high":[188.44,null,185.88],
            "low":[183.89,null,183.43],"close":[185.64,null,184.25],
            "volume":[82488700,null,58414500]}]}}],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let bars = parse_chart("AAPL", resp).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].close, 185.64);
        assert_eq!(bars[1].volume, 58_414_500);
    }

    #[test]
    fn partial_row_keeps_nan_fields() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704205800],
            "indicators":{"quote":[{"open":[1.0],"high":[2.0],"low":[0.5],"close":[null],
            "volume":[10]}]}}],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let bars = parse_chart("X", resp).unwrap();
        assert!(bars[0].close.is_nan());
        assert!(bars[0].is_void());
    }

    #[test]
    fn contradictory_row_is_dropped() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{"open":[10.0,10.0],"high":[11.0,9.0],"low":[9.5,12.0],
            "close":[10.5,10.2],"volume":[100,200]}]}}],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let bars = parse_chart("X", resp).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 10.5);
    }

    #[test]
    fn missing_timestamps_is_empty_history() {
        let json = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        assert!(parse_chart("NEW", resp).unwrap().is_empty());
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let json = r#"{"chart":{"result":null,
            "error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            parse_chart("ZZZZ", resp),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn duplicate_session_keeps_last_print() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704205800,1704229200],
            "indicators":{"quote":[{"open":[1.0,1.0],"high":[2.0,2.5],"low":[0.5,0.5],
            "close":[1.5,2.2],"volume":[10,20]}]}}],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let bars = parse_chart("X", resp).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 2.2);
    }

    #[test]
    fn parses_option_chain() {
        let json = r#"{"optionChain":{"result":[{"expirationDates":[1708041600,1710460800],
            "options":[{"expirationDate":1708041600,"calls":[
              {"strike":180.0,"lastPrice":9.1,"impliedVolatility":0.24,"volume":1500},
              {"strike":190.0,"lastPrice":3.2,"impliedVolatility":0.22}]}]}],"error":null}}"#;
        let resp: OptionsResponse = serde_json::from_str(json).unwrap();
        let chain = first_option_chain("AAPL", resp).unwrap();
        let dates: Vec<NaiveDate> = chain
            .expiration_dates
            .iter()
            .map(|&ts| ts_to_date(ts).unwrap())
            .collect();
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2024, 2, 16).unwrap());

        let calls = calls_from_chain(chain);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].volume, 1500);
        assert_eq!(calls[1].volume, 0);
    }

    #[test]
    fn headlines_require_title_and_link() {
        let json = r#"{"news":[{"title":"Apple beats","link":"https://a.example/1"},
            {"title":"No link"},{"title":"Two","link":"https://a.example/2"},
            {"title":"Three","link":"https://a.example/3"},
            {"title":"Four","link":"https://a.example/4"}]}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        let headlines = headlines_from_search(resp);
        assert_eq!(headlines.len(), 3);
        assert_eq!(headlines[1].title, "Two");
    }

    #[test]
    fn index_symbols_are_escaped() {
        assert_eq!(YahooClient::path_symbol("^VIX"), "%5EVIX");
        assert_eq!(YahooClient::path_symbol("BTC-USD"), "BTC-USD");
    }

    mod http {
        use super::*;
        use std::io::{Read, Write};
        use std::net::{TcpListener, TcpStream};
        use std::thread;

        /// Answers `hits` connections on a local port with a fixed reply.
        fn serve(status: &'static str, body: &'static str, hits: usize) -> String {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            thread::spawn(move || {
                for stream in listener.incoming().take(hits) {
                    let mut stream = stream.unwrap();
                    read_request(&mut stream);
                    let reply = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
                         content-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(reply.as_bytes());
                }
            });
            format!("http://{addr}")
        }

        fn read_request(stream: &mut TcpStream) {
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => return,
                    Ok(n) => raw.extend_from_slice(&buf[..n]),
                }
            }
        }

        fn client(base_url: String) -> (YahooClient, Arc<CircuitBreaker>) {
            let breaker = Arc::new(CircuitBreaker::new(Duration::from_secs(60)));
            let client = YahooClient::new(breaker.clone())
                .unwrap()
                .with_base_url(base_url);
            (client, breaker)
        }

        #[test]
        fn ok_response_is_parsed() {
            let body = r#"{"chart":{"result":[{"timestamp":[1704205800],
                "indicators":{"quote":[{"open":[187.15],"high":[188.44],"low":[183.89],
                "close":[185.64],"volume":[82488700]}]}}],"error":null}}"#;
            let (yahoo, breaker) = client(serve("200 OK", body, 1));
            let series = yahoo.fetch_history("AAPL", Lookback::Days(5)).unwrap();
            assert_eq!(series.len(), 1);
            assert_eq!(series.last().unwrap().close, 185.64);
            assert!(breaker.is_allowed());
        }

        #[test]
        fn not_found_status_is_symbol_not_found() {
            let (yahoo, breaker) = client(serve("404 Not Found", "{}", 1));
            let err = yahoo.fetch_history("ZZZZ", Lookback::Years(2)).unwrap_err();
            assert!(matches!(err, DataError::SymbolNotFound { ref symbol } if symbol == "ZZZZ"));
            assert!(breaker.is_allowed());
        }

        #[test]
        fn forbidden_opens_breaker_and_later_calls_fail_fast() {
            // Given: the provider bans the client on the first request
            let (yahoo, breaker) = client(serve("403 Forbidden", "{}", 1));

            // When: two symbols are fetched
            let first = yahoo.fetch_history("AAPL", Lookback::Years(2)).unwrap_err();
            let second = yahoo.fetch_history("MSFT", Lookback::Years(2)).unwrap_err();

            // Then: both fail as breaker-open and no second request goes out
            assert!(matches!(first, DataError::CircuitBreakerOpen { remaining_secs } if remaining_secs > 0));
            assert!(matches!(second, DataError::CircuitBreakerOpen { .. }));
            assert!(!breaker.is_allowed());
        }

        #[test]
        fn server_errors_count_toward_breaker() {
            let (yahoo, breaker) = client(serve("500 Internal Server Error", "{}", 3));
            for _ in 0..3 {
                let err = yahoo.fetch_history("AAPL", Lookback::Years(2)).unwrap_err();
                assert!(matches!(
                    err,
                    DataError::HttpStatus {
                        provider: "yahoo_finance",
                        status: 500,
                        ..
                    }
                ));
            }
            assert!(!breaker.is_allowed());
        }

        #[test]
        fn unexpected_body_is_format_change() {
            let (yahoo, _) = client(serve("200 OK", r#"{"quoteSummary":{}}"#, 1));
            let err = yahoo.fetch_history("AAPL", Lookback::Years(2)).unwrap_err();
            assert!(matches!(err, DataError::ResponseFormatChanged(_)), "{err}");
        }
    }
}
