use chrono::{Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::archive::Archive;
use crate::catalog::{CatalogClient, CatalogResolver, Resolution};
use crate::config::SyncConfig;
use crate::domain::{CatalogFilter, ProductSpec};
use crate::error::SyncError;
use crate::fetch::{FetchAction, FetchEngine};
use crate::output::{ProgressEvent, ProgressSink};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductOutcome {
    Synced,
    /// The catalog reported no results for the window; a legitimate empty
    /// run, distinct from a resolution that yields zero URLs (an error).
    NothingToSync,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductReport {
    pub product: String,
    pub outcome: ProductOutcome,
    pub downloaded: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub products: Vec<ProductReport>,
}

/// Orchestrates scanner, catalog and fetch engine per product, sequentially.
pub struct SyncApp<C: CatalogClient, T: Transport> {
    config: SyncConfig,
    resolver: CatalogResolver<C>,
    fetcher: FetchEngine<T>,
    token: Option<String>,
}

impl<C: CatalogClient, T: Transport> SyncApp<C, T> {
    pub fn new(config: SyncConfig, catalog: C, transport: T, token: Option<String>) -> Self {
        let resolver = CatalogResolver::new(catalog, config.catalog_retry);
        let fetcher = FetchEngine::new(transport, config.fetch_attempts);
        Self {
            config,
            resolver,
            fetcher,
            token,
        }
    }

    pub fn catalog(&self) -> &C {
        self.resolver.client()
    }

    pub fn transport(&self) -> &T {
        self.fetcher.transport()
    }

    /// Syncs every configured product. The first fatal error aborts the
    /// whole invocation; there is no partial-success continuation.
    pub fn run(
        &self,
        min_start: Option<NaiveDate>,
        sink: &dyn ProgressSink,
    ) -> Result<SyncReport, SyncError> {
        let mut products = Vec::new();
        for spec in &self.config.products {
            products.push(self.download_product(spec, min_start, sink)?);
        }
        Ok(SyncReport { products })
    }

    pub fn download_product(
        &self,
        spec: &ProductSpec,
        min_start: Option<NaiveDate>,
        sink: &dyn ProgressSink,
    ) -> Result<ProductReport, SyncError> {
        let now = Utc::now().naive_utc();
        let today = now.date();
        let min_start = min_start.unwrap_or_else(|| {
            today - Days::new(self.config.lookback_days.max(0) as u64)
        });

        let archive = Archive::new(spec.dir.clone(), self.config.floor_date);
        let last = archive.last_downloaded_date(&spec.code, min_start, today)?;
        let start = last.checked_add_days(Days::new(1)).unwrap_or(last).min(today);
        sink.event(ProgressEvent::new(
            0,
            format!("syncing {} from {start} through {today}", spec.code),
        ));

        let filter = CatalogFilter {
            product: spec.code.clone(),
            collection: spec.collection.clone(),
            start_time: start.and_time(NaiveTime::MIN),
            end_time: now,
            bounds: self.config.bounds,
            coords_or_tiles: self.config.coords_or_tiles,
            day_night: self.config.day_night.clone(),
        };

        match self.resolver.resolve(&filter, sink)? {
            Resolution::Empty => {
                sink.event(ProgressEvent::new(
                    0,
                    format!("nothing to sync for {}", spec.code),
                ));
                Ok(ProductReport {
                    product: spec.code.to_string(),
                    outcome: ProductOutcome::NothingToSync,
                    downloaded: 0,
                    skipped: 0,
                })
            }
            // A successful search-then-resolve pair that still produced no
            // URLs signals a catalog outage, not an empty window.
            Resolution::Found(urls) if urls.is_empty() => {
                Err(SyncError::NoUrls(spec.code.to_string()))
            }
            Resolution::Found(urls) => {
                let mut downloaded = 0;
                let mut skipped = 0;
                for url in &urls {
                    match self
                        .fetcher
                        .fetch(url, self.token.as_deref(), &archive, sink)?
                    {
                        FetchAction::Downloaded => downloaded += 1,
                        FetchAction::Skipped => skipped += 1,
                    }
                }
                sink.event(ProgressEvent::new(
                    0,
                    format!("{}: {downloaded} downloaded, {skipped} skipped", spec.code),
                ));
                Ok(ProductReport {
                    product: spec.code.to_string(),
                    outcome: ProductOutcome::Synced,
                    downloaded,
                    skipped,
                })
            }
        }
    }
}
