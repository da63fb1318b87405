use std::thread;
use std::time::Duration;

use chrono::NaiveDateTime;
use reqwest::blocking::Client;

use crate::config::RetryPolicy;
use crate::domain::CatalogFilter;
use crate::error::SyncError;
use crate::output::{ProgressEvent, ProgressSink};
use crate::transport::USER_AGENT;

/// What a catalog search produced. "No results" is a successful outcome the
/// service reports explicitly, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Vec<String>),
    NoResults,
}

/// Outcome of the full search-then-resolve pair. Callers must not conflate
/// `Empty` (nothing to sync) with a resolution failure, which surfaces as an
/// error instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Vec<String>),
    Empty,
}

pub trait CatalogClient {
    fn search_for_files(&self, filter: &CatalogFilter) -> Result<SearchOutcome, SyncError>;

    /// Exchanges a comma-joined identifier batch for download URLs.
    fn get_file_urls(&self, file_ids: &str) -> Result<Vec<String>, SyncError>;
}

pub struct CatalogHttpClient {
    client: Client,
    base_url: String,
}

impl CatalogHttpClient {
    pub fn new() -> Result<Self, SyncError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| SyncError::CatalogHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: "https://modwebsrv.modaps.eosdis.nasa.gov/axis2/services/MODAPSservices"
                .to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn read_body(response: reqwest::blocking::Response) -> Result<String, SyncError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "catalog request failed".to_string());
            return Err(SyncError::CatalogStatus { status, message });
        }
        response
            .text()
            .map_err(|err| SyncError::CatalogHttp(err.to_string()))
    }
}

impl CatalogClient for CatalogHttpClient {
    fn search_for_files(&self, filter: &CatalogFilter) -> Result<SearchOutcome, SyncError> {
        let url = format!("{}/searchForFiles", self.base_url);
        let query: Vec<(&str, String)> = vec![
            ("products", filter.product.to_string()),
            ("collection", filter.collection.to_string()),
            ("startTime", format_time(filter.start_time)),
            ("endTime", format_time(filter.end_time)),
            ("north", filter.bounds.north.to_string()),
            ("south", filter.bounds.south.to_string()),
            ("east", filter.bounds.east.to_string()),
            ("west", filter.bounds.west.to_string()),
            ("coordsOrTiles", filter.coords_or_tiles.to_string()),
            ("dayNightBoth", filter.day_night.to_string()),
        ];
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .map_err(|err| SyncError::CatalogHttp(err.to_string()))?;
        let body = Self::read_body(response)?;

        if body.trim() == "No results" {
            return Ok(SearchOutcome::NoResults);
        }
        let ids = parse_id_list(&body)?;
        if ids.is_empty() {
            return Ok(SearchOutcome::NoResults);
        }
        Ok(SearchOutcome::Found(ids))
    }

    fn get_file_urls(&self, file_ids: &str) -> Result<Vec<String>, SyncError> {
        let url = format!("{}/getFileUrls", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("fileIds", file_ids)])
            .send()
            .map_err(|err| SyncError::CatalogHttp(err.to_string()))?;
        let body = Self::read_body(response)?;
        parse_url_list(&body)
    }
}

/// Runs catalog calls under the shared retry policy: sleep between attempts,
/// give up with the last error once consecutive failures exceed the budget.
pub struct CatalogResolver<C: CatalogClient> {
    client: C,
    policy: RetryPolicy,
}

impl<C: CatalogClient> CatalogResolver<C> {
    pub fn new(client: C, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn resolve(
        &self,
        filter: &CatalogFilter,
        sink: &dyn ProgressSink,
    ) -> Result<Resolution, SyncError> {
        sink.event(ProgressEvent::new(
            0,
            format!("retrieving file IDs for {}", filter.product),
        ));
        let outcome = self.with_retries("file IDs", sink, || self.client.search_for_files(filter))?;
        let ids = match outcome {
            SearchOutcome::NoResults => {
                sink.event(ProgressEvent::new(
                    0,
                    format!("catalog returned no results for {}", filter.product),
                ));
                return Ok(Resolution::Empty);
            }
            SearchOutcome::Found(ids) => ids,
        };

        sink.event(ProgressEvent::new(
            0,
            format!("catalog matched {} file IDs", ids.len()),
        ));

        // The whole batch goes out as a single comma-joined request; chunking
        // very large result sets is a known scalability limit.
        let ids = ids.join(",");
        let urls = self.with_retries("file URLs", sink, || self.client.get_file_urls(&ids))?;
        Ok(Resolution::Found(urls))
    }

    fn with_retries<V>(
        &self,
        what: &str,
        sink: &dyn ProgressSink,
        mut call: impl FnMut() -> Result<V, SyncError>,
    ) -> Result<V, SyncError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match call() {
                Ok(value) => return Ok(value),
                Err(err) if attempt > self.policy.max_failures => return Err(err),
                Err(err) => {
                    sink.event(ProgressEvent::new(
                        0,
                        format!(
                            "retrieving {what} failed ({err}), waiting {} sec",
                            self.policy.delay.as_secs()
                        ),
                    ));
                    thread::sleep(self.policy.delay);
                }
            }
        }
    }
}

fn format_time(time: NaiveDateTime) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn parse_id_list(body: &str) -> Result<Vec<String>, SyncError> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(|err| SyncError::CatalogPayload(err.to_string()))?;
    values
        .into_iter()
        .map(|value| match value {
            serde_json::Value::String(id) => Ok(id),
            serde_json::Value::Number(id) => Ok(id.to_string()),
            other => Err(SyncError::CatalogPayload(format!(
                "unexpected file id {other}"
            ))),
        })
        .collect()
}

fn parse_url_list(body: &str) -> Result<Vec<String>, SyncError> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(|err| SyncError::CatalogPayload(err.to_string()))?;
    values
        .into_iter()
        .map(|value| match value {
            serde_json::Value::String(url) => Ok(url),
            other => Err(SyncError::CatalogPayload(format!(
                "unexpected file URL {other}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_numeric_and_string_ids() {
        let ids = parse_id_list(r#"[123456, "789012"]"#).unwrap();
        assert_eq!(ids, vec!["123456", "789012"]);
    }

    #[test]
    fn reject_malformed_ids() {
        assert_matches!(
            parse_id_list(r#"[{"id": 1}]"#),
            Err(SyncError::CatalogPayload(_))
        );
        assert_matches!(parse_id_list("No results"), Err(SyncError::CatalogPayload(_)));
    }

    #[test]
    fn parse_urls() {
        let urls =
            parse_url_list(r#"["https://example.com/MYD06_L2.A2020123.hdf"]"#).unwrap();
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn catalog_time_format() {
        let time = chrono::NaiveDate::from_ymd_opt(2021, 1, 16)
            .unwrap()
            .and_time(chrono::NaiveTime::MIN);
        assert_eq!(format_time(time), "2021-01-16 00:00:00");
    }
}
