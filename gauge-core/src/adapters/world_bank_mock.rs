//! Mock World Bank API server for testing
//!
//! Serves a scripted sequence of replies, one per incoming connection, so
//! tests can drive the retry policy (429s, server errors, slow replies)
//! without touching the real API. Once the script runs out, every further
//! request gets the fallback reply.
//!
//! Page bodies follow the real API shape: `[{page, pages, per_page, total}, [records]]`.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::json;

/// A canned HTTP reply
#[derive(Debug, Clone)]
pub struct MockReply {
    status: u16,
    body: String,
    delay: Duration,
}

impl MockReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: r#"{"error": "mock failure"}"#.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn rate_limited() -> Self {
        Self::status(429)
    }

    /// Wait before answering (simulates a slow or hung server)
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Body of one API page with `(year, value)` records
pub fn page_body(country: &str, indicator: &str, page: u32, pages: u32, records: &[(&str, Option<f64>)]) -> String {
    let records: Vec<_> = records
        .iter()
        .map(|(year, value)| {
            json!({
                "indicator": {"id": indicator, "value": format!("{} name", indicator)},
                "country": {"id": &country[..2.min(country.len())], "value": format!("{} name", country)},
                "countryiso3code": country,
                "date": year,
                "value": value,
                "unit": "",
                "obs_status": "",
                "decimal": 0
            })
        })
        .collect();

    json!([
        {"page": page, "pages": pages, "per_page": "1000", "total": records.len()},
        records
    ])
    .to_string()
}

struct Script {
    replies: Vec<MockReply>,
    fallback: MockReply,
}

/// Mock World Bank server for testing
pub struct MockWorldBankServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockWorldBankServer {
    /// Start on a random port with the given reply script
    pub fn start(replies: Vec<MockReply>, fallback: MockReply) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let requests = Arc::new(AtomicUsize::new(0));
        let paths = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(Script { replies, fallback });

        // Non-blocking so the accept loop can observe shutdown
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let requests_clone = requests.clone();
        let paths_clone = paths.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let index = requests_clone.fetch_add(1, Ordering::SeqCst);
                        let script = script.clone();
                        let paths = paths_clone.clone();
                        thread::spawn(move || {
                            handle_connection(stream, index, &script, &paths);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            paths,
            thread_handle: Some(thread_handle),
        })
    }

    /// Serve the same reply to every request
    pub fn always(reply: MockReply) -> std::io::Result<Self> {
        Self::start(Vec::new(), reply)
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Number of connections accepted so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Request targets (path and query) in arrival order
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockWorldBankServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, index: usize, script: &Script, paths: &Mutex<Vec<String>>) {
    let _ = stream.set_nonblocking(false);
    let mut buffer = [0; 4096];

    let Ok(n) = stream.read(&mut buffer) else {
        return;
    };
    let request = String::from_utf8_lossy(&buffer[..n]);
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string();
    paths.lock().unwrap().push(target);

    let reply = script.replies.get(index).unwrap_or(&script.fallback);
    if !reply.delay.is_zero() {
        thread::sleep(reply.delay);
    }
    send_response(&mut stream, reply.status, &reply.body);
}

fn send_response(stream: &mut TcpStream, status: u16, body: &str) {
    let status_text = match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::world_bank::WorldBankDataSource;
    use crate::config::WorldBankConfig;
    use crate::domain::{DataQuality, DataRequest};
    use crate::ports::DataSource;
    use chrono::{Datelike, NaiveDate};

    fn source_for(server: &MockWorldBankServer, timeout: Duration) -> WorldBankDataSource {
        let config = WorldBankConfig {
            enabled: true,
            base_url: server.base_url(),
            timeout,
            max_retries: 3,
            retry_delay: Duration::from_millis(10),
        };
        WorldBankDataSource::new(&config).unwrap()
    }

    fn gdp_page() -> String {
        page_body("USA", "NY.GDP.MKTP.CD", 1, 1, &[("2020", Some(1.0)), ("2019", Some(2.0))])
    }

    #[test]
    fn test_two_rate_limits_then_success() {
        let server = MockWorldBankServer::start(
            vec![MockReply::rate_limited(), MockReply::rate_limited()],
            MockReply::ok(gdp_page()),
        )
        .unwrap();
        let source = source_for(&server, Duration::from_secs(5));

        let response = source.fetch_data(&DataRequest::new("usa", "gdp"));

        assert!(response.is_success(), "error: {:?}", response.error());
        assert_eq!(response.metadata["attempts"], 3);
        assert_eq!(response.data().unwrap().len(), 2);
        assert_eq!(server.request_count(), 3);
    }

    #[test]
    fn test_timeouts_exhaust_attempts() {
        let server =
            MockWorldBankServer::always(MockReply::ok(gdp_page()).delayed(Duration::from_millis(800)))
                .unwrap();
        let source = source_for(&server, Duration::from_millis(100));

        let response = source.fetch_data(&DataRequest::new("usa", "gdp"));

        assert!(!response.is_success());
        assert!(response.data().is_none());
        let error = response.error().unwrap();
        assert!(error.contains("after 3 attempts"), "{}", error);
        assert_eq!(response.metadata["attempts"], 3);
    }

    #[test]
    fn test_rate_limit_exhaustion_reports_last_error() {
        let server = MockWorldBankServer::always(MockReply::rate_limited()).unwrap();
        let source = source_for(&server, Duration::from_secs(5));

        let response = source.fetch_data(&DataRequest::new("usa", "gdp"));
        let error = response.error().unwrap();
        assert!(error.contains("after 3 attempts"), "{}", error);
        assert!(error.contains("429"), "{}", error);
    }

    #[test]
    fn test_server_error_is_retried() {
        let server =
            MockWorldBankServer::start(vec![MockReply::status(503)], MockReply::ok(gdp_page())).unwrap();
        let source = source_for(&server, Duration::from_secs(5));

        let response = source.fetch_data(&DataRequest::new("usa", "gdp"));
        assert!(response.is_success());
        assert_eq!(response.metadata["attempts"], 2);
    }

    #[test]
    fn test_pagination() {
        let first = page_body("USA", "SP.POP.TOTL", 1, 2, &[("2021", Some(3.0)), ("2020", Some(2.0))]);
        let second = page_body("USA", "SP.POP.TOTL", 2, 2, &[("2019", Some(1.0))]);
        let server =
            MockWorldBankServer::start(vec![MockReply::ok(first)], MockReply::ok(second)).unwrap();
        let source = source_for(&server, Duration::from_secs(5));

        let response = source.fetch_data(&DataRequest::new("usa", "population"));

        assert!(response.is_success(), "error: {:?}", response.error());
        assert_eq!(response.data().unwrap().values(), vec![3.0, 2.0, 1.0]);
        let paths = server.paths();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].starts_with("/country/USA/indicator/SP.POP.TOTL?"));
        assert!(paths[1].contains("page=2"));
    }

    #[test]
    fn test_page_mismatch_stops_the_fetch() {
        // Server ignores ?page= and keeps answering with the first page
        let first = page_body("USA", "SP.POP.TOTL", 1, 2, &[("2021", Some(3.0))]);
        let server = MockWorldBankServer::always(MockReply::ok(first)).unwrap();
        let source = source_for(&server, Duration::from_secs(5));

        let response = source.fetch_data(&DataRequest::new("usa", "population"));

        assert!(!response.is_success());
        let error = response.error().unwrap();
        assert!(error.contains("page 1 when page 2"), "{}", error);
        assert_eq!(server.request_count(), 2);
    }

    #[test]
    fn test_null_values_and_bad_years_are_skipped() {
        let body = page_body(
            "DEU",
            "FP.CPI.TOTL.ZG",
            1,
            1,
            &[("2022", Some(6.9)), ("2021", None), ("20X0", Some(1.0))],
        );
        let server = MockWorldBankServer::always(MockReply::ok(body)).unwrap();
        let source = source_for(&server, Duration::from_secs(5));

        let response = source.fetch_data(&DataRequest::new("de", "inflation"));
        let series = response.data().unwrap();

        assert_eq!(series.len(), 1);
        let point = &series.points()[0];
        assert_eq!(point.timestamp().year(), 2022);
        assert_eq!((point.timestamp().month(), point.timestamp().day()), (12, 31));
        assert_eq!(point.quality(), DataQuality::Official);
        assert_eq!(point.country(), "de");
        assert_eq!(point.metadata()["country_id"], "DEU");
        assert_eq!(series.metadata["indicator_code"], "FP.CPI.TOTL.ZG");
        assert_eq!(series.metadata["country_code"], "DEU");
    }

    #[test]
    fn test_date_range_is_forwarded() {
        let server = MockWorldBankServer::always(MockReply::ok(gdp_page())).unwrap();
        let source = source_for(&server, Duration::from_secs(5));

        let request = DataRequest::new("usa", "gdp").with_range(
            NaiveDate::from_ymd_opt(2010, 1, 1),
            NaiveDate::from_ymd_opt(2020, 12, 31),
        );
        source.fetch_data(&request);

        let paths = server.paths();
        let url = url::Url::parse(&format!("http://localhost{}", paths[0])).unwrap();
        let date = url
            .query_pairs()
            .find(|(k, _)| k == "date")
            .map(|(_, v)| v.into_owned());
        assert_eq!(date.as_deref(), Some("2010:2020"));
    }

    #[test]
    fn test_error_payload_is_not_found_without_retry() {
        let body = r#"[{"message":[{"id":"120","key":"Invalid value","value":"The provided parameter value is not valid"}]}]"#;
        let server = MockWorldBankServer::always(MockReply::ok(body)).unwrap();
        let source = source_for(&server, Duration::from_secs(5));

        let response = source.fetch_data(&DataRequest::new("usa", "gdp"));
        assert!(!response.is_success());
        assert!(response.error().unwrap().contains("not valid"));
        assert_eq!(server.request_count(), 1);
    }

    #[test]
    fn test_availability_probe() {
        let healthy = MockWorldBankServer::always(MockReply::ok(gdp_page())).unwrap();
        let source = source_for(&healthy, Duration::from_secs(5));
        assert!(source.is_available());
        let probe = &healthy.paths()[0];
        assert!(probe.contains("/country/USA/indicator/NY.GDP.MKTP.CD"));
        assert!(probe.contains("per_page=1&") || probe.ends_with("per_page=1"));

        let broken = MockWorldBankServer::always(MockReply::status(500)).unwrap();
        assert!(!source_for(&broken, Duration::from_secs(5)).is_available());
    }
}
