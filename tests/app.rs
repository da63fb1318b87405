use std::cell::{Cell, RefCell};
use std::io::Write;
use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::{NaiveDate, Timelike};

use modis_sync::app::{ProductOutcome, SyncApp};
use modis_sync::catalog::{CatalogClient, SearchOutcome};
use modis_sync::config::{RetryPolicy, SyncConfig, floor_date};
use modis_sync::domain::{
    BoundingBox, CatalogFilter, CoordsOrTiles, DayNightFlag, ProductSpec,
};
use modis_sync::error::SyncError;
use modis_sync::output::SilentOutput;
use modis_sync::transport::{Transport, TransportError};

struct StubCatalog {
    seen_filter: RefCell<Option<CatalogFilter>>,
    urls: Vec<String>,
}

impl StubCatalog {
    fn new(urls: Vec<String>) -> Self {
        Self {
            seen_filter: RefCell::new(None),
            urls,
        }
    }
}

impl CatalogClient for StubCatalog {
    fn search_for_files(&self, filter: &CatalogFilter) -> Result<SearchOutcome, SyncError> {
        *self.seen_filter.borrow_mut() = Some(filter.clone());
        Ok(SearchOutcome::Found(vec!["1".to_string()]))
    }

    fn get_file_urls(&self, _file_ids: &str) -> Result<Vec<String>, SyncError> {
        Ok(self.urls.clone())
    }
}

struct CountingTransport {
    calls: Cell<u32>,
}

impl Transport for CountingTransport {
    fn get(
        &self,
        _url: &str,
        _token: Option<&str>,
        out: &mut dyn Write,
    ) -> Result<u64, TransportError> {
        self.calls.set(self.calls.get() + 1);
        out.write_all(b"granule").unwrap();
        Ok(7)
    }
}

fn config_for(dir: Utf8PathBuf) -> SyncConfig {
    SyncConfig {
        base_dir: dir.clone(),
        products: vec![ProductSpec {
            code: "MYD06_L2".parse().unwrap(),
            collection: "61".parse().unwrap(),
            dir,
        }],
        floor_date: floor_date(),
        lookback_days: 90,
        bounds: BoundingBox::default(),
        day_night: DayNightFlag::default(),
        coords_or_tiles: CoordsOrTiles::default(),
        catalog_retry: RetryPolicy {
            max_failures: 5,
            delay: Duration::ZERO,
        },
        fetch_attempts: 10,
    }
}

#[test]
fn sync_fans_out_across_year_boundary() {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();

    // Local archive already holds files through day 15 of 2021.
    let year_dir = temp.path().join("2021");
    std::fs::create_dir_all(&year_dir).unwrap();
    std::fs::write(year_dir.join("MYD06_L2.A2021015.hdf"), b"old").unwrap();

    let urls = vec![
        "https://example.com/MYD06_L2.A2021016.hdf".to_string(),
        "https://example.com/MYD06_L2.A2021364.hdf".to_string(),
        "https://example.com/MYD06_L2.A2022002.hdf".to_string(),
    ];
    let config = config_for(dir);
    let spec = config.products[0].clone();
    let app = SyncApp::new(
        config,
        StubCatalog::new(urls),
        CountingTransport {
            calls: Cell::new(0),
        },
        Some("token".to_string()),
    );

    let report = app
        .download_product(&spec, Some(NaiveDate::from_ymd_opt(2021, 2, 1).unwrap()), &SilentOutput)
        .unwrap();

    assert_eq!(report.outcome, ProductOutcome::Synced);
    assert_eq!(report.downloaded, 3);
    assert_eq!(report.skipped, 0);

    // The window resumes the day after the newest local file.
    let filter = app.catalog().seen_filter.borrow().clone().unwrap();
    assert_eq!(
        filter.start_time.date(),
        NaiveDate::from_ymd_opt(2021, 1, 16).unwrap()
    );
    assert_eq!(filter.start_time.time().hour(), 0);

    // Each file landed in the year directory its own date code names.
    assert!(temp.path().join("2021/MYD06_L2.A2021016.hdf").exists());
    assert!(temp.path().join("2021/MYD06_L2.A2021364.hdf").exists());
    assert!(temp.path().join("2022/MYD06_L2.A2022002.hdf").exists());
}

#[test]
fn second_run_skips_everything() {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();

    let urls = vec![
        "https://example.com/MYD06_L2.A2021016.hdf".to_string(),
        "https://example.com/MYD06_L2.A2021017.hdf".to_string(),
    ];
    let config = config_for(dir);
    let spec = config.products[0].clone();
    let app = SyncApp::new(
        config,
        StubCatalog::new(urls),
        CountingTransport {
            calls: Cell::new(0),
        },
        None,
    );

    let first = app.download_product(&spec, None, &SilentOutput).unwrap();
    assert_eq!(first.downloaded, 2);

    let second = app.download_product(&spec, None, &SilentOutput).unwrap();
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(app.transport().calls.get(), 2);
}

#[test]
fn run_covers_every_configured_product() {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();

    let mut config = config_for(dir.clone());
    config.products.push(ProductSpec {
        code: "MCD43D07".parse().unwrap(),
        collection: "6".parse().unwrap(),
        dir,
    });
    let app = SyncApp::new(
        config,
        StubCatalog::new(vec![
            "https://example.com/MYD06_L2.A2021016.hdf".to_string(),
        ]),
        CountingTransport {
            calls: Cell::new(0),
        },
        None,
    );

    let report = app.run(None, &SilentOutput).unwrap();
    assert_eq!(report.products.len(), 2);
}
