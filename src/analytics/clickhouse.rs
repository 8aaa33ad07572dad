//! ClickHouse sink over the HTTP interface.

use async_trait::async_trait;

use crate::analytics::{AnalyticsError, AnalyticsEvent, AnalyticsSink};
use crate::config::AnalyticsConfig;
use crate::resilience::backoff::calculate_backoff;

const MAX_CONNECT_DELAY_MS: u64 = 30_000;

/// Writes one row per event into a ClickHouse table.
#[derive(Debug, Clone)]
pub struct ClickHouseSink {
    client: reqwest::Client,
    base_url: String,
    insert_query: String,
}

impl ClickHouseSink {
    /// Build a sink without checking that the server is reachable.
    pub fn new(base_url: &str, table: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            insert_query: format!(
                "INSERT INTO {table} (method, path, status, latency_ms, ip_address) FORMAT JSONEachRow"
            ),
        }
    }

    /// Build a sink and wait for the server to answer `/ping`.
    ///
    /// Retries up to `connect_attempts` times with growing delays.
    pub async fn connect(config: &AnalyticsConfig) -> Result<Self, AnalyticsError> {
        let sink = Self::new(&config.url, &config.table);
        let attempts = config.connect_attempts.max(1);

        for attempt in 1..=attempts {
            match sink.ping().await {
                Ok(()) => {
                    tracing::info!(url = %sink.base_url, "Connected to ClickHouse");
                    return Ok(sink);
                }
                Err(e) if attempt < attempts => {
                    let delay = calculate_backoff(attempt, config.connect_backoff_ms, MAX_CONNECT_DELAY_MS);
                    tracing::warn!(
                        attempt,
                        error = %e,
                        delay = ?delay,
                        "ClickHouse not ready, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "ClickHouse unreachable");
                }
            }
        }

        Err(AnalyticsError::Unreachable(attempts))
    }

    async fn ping(&self) -> Result<(), AnalyticsError> {
        let response = self
            .client
            .get(format!("{}/ping", self.base_url))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyticsError::Rejected { status: status.as_u16(), body });
        }
        Ok(())
    }
}

#[async_trait]
impl AnalyticsSink for ClickHouseSink {
    async fn record(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        let response = self
            .client
            .post(format!("{}/", self.base_url))
            .query(&[("query", self.insert_query.as_str())])
            .json(&event)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyticsError::Rejected { status: status.as_u16(), body });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_query() {
        let sink = ClickHouseSink::new("http://clickhouse:8123/", "analytics.api_logs");
        assert_eq!(sink.base_url, "http://clickhouse:8123");
        assert_eq!(
            sink.insert_query,
            "INSERT INTO analytics.api_logs (method, path, status, latency_ms, ip_address) FORMAT JSONEachRow"
        );
    }

    #[tokio::test]
    async fn test_connect_gives_up() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = AnalyticsConfig {
            url: format!("http://{addr}"),
            connect_attempts: 2,
            connect_backoff_ms: 1,
            ..AnalyticsConfig::default()
        };
        let err = ClickHouseSink::connect(&config).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Unreachable(2)));
    }
}
