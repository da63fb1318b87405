use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{BoundingBox, CoordsOrTiles, DayNightFlag, ProductSpec};
use crate::error::SyncError;

/// On-disk shape of `modis-sync.json`. Every field is optional; a missing
/// file is equivalent to an empty one.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
    #[serde(default)]
    pub bounds: Option<BoundingBox>,
    #[serde(default)]
    pub day_night: Option<String>,
    #[serde(default)]
    pub coords_or_tiles: Option<CoordsOrTiles>,
    #[serde(default)]
    pub lookback_days: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ProductEntry {
    Shorthand(String),
    Detailed(ProductEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ProductEntryObject {
    pub product: String,
    pub collection: String,
    #[serde(default)]
    pub dir: Option<String>,
}

/// Retry schedule for catalog calls: sleep `delay` between attempts and give
/// up once consecutive failures exceed `max_failures`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_failures: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            delay: Duration::from_secs(30),
        }
    }
}

/// Immutable, fully-resolved configuration handed to every component at
/// construction.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub base_dir: Utf8PathBuf,
    pub products: Vec<ProductSpec>,
    /// Earliest date for which the archive is considered to exist.
    pub floor_date: NaiveDate,
    /// Default bound on how far back a cold start reaches.
    pub lookback_days: i64,
    pub bounds: BoundingBox,
    pub day_night: DayNightFlag,
    pub coords_or_tiles: CoordsOrTiles,
    pub catalog_retry: RetryPolicy,
    pub fetch_attempts: u32,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<SyncConfig, SyncError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("modis-sync.json"),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| SyncError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| SyncError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<SyncConfig, SyncError> {
        let base_dir = config
            .base_dir
            .or_else(|| std::env::var("MODDIR").ok())
            .filter(|value| !value.trim().is_empty())
            .ok_or(SyncError::MissingBaseDir)?;
        let base_dir = Utf8PathBuf::from(base_dir.trim());

        let entries = if config.products.is_empty() {
            default_products()
        } else {
            config.products
        };
        let products = entries
            .into_iter()
            .map(|entry| resolve_product(entry, &base_dir))
            .collect::<Result<Vec<_>, SyncError>>()?;

        let day_night = match config.day_night {
            Some(value) => value.parse()?,
            None => DayNightFlag::default(),
        };

        Ok(SyncConfig {
            base_dir,
            products,
            floor_date: floor_date(),
            lookback_days: config.lookback_days.unwrap_or(90),
            bounds: config.bounds.unwrap_or_default(),
            day_night,
            coords_or_tiles: config.coords_or_tiles.unwrap_or_default(),
            catalog_retry: RetryPolicy::default(),
            fetch_attempts: 10,
        })
    }
}

fn resolve_product(entry: ProductEntry, base_dir: &Utf8PathBuf) -> Result<ProductSpec, SyncError> {
    match entry {
        ProductEntry::Shorthand(value) => {
            let (product, collection) = value
                .split_once(':')
                .ok_or_else(|| SyncError::InvalidProduct(value.clone()))?;
            Ok(ProductSpec {
                code: product.parse()?,
                collection: collection.parse()?,
                dir: base_dir.clone(),
            })
        }
        ProductEntry::Detailed(obj) => Ok(ProductSpec {
            code: obj.product.parse()?,
            collection: obj.collection.parse()?,
            dir: obj
                .dir
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| base_dir.clone()),
        }),
    }
}

/// The albedo products ship in collection 6, the cloud product in 61.
pub fn default_products() -> Vec<ProductEntry> {
    ["MCD43D07:6", "MCD43D08:6", "MCD43D09:6", "MCD43D31:6", "MYD06_L2:61"]
        .into_iter()
        .map(|value| ProductEntry::Shorthand(value.to_string()))
        .collect()
}

/// MODIS data does not exist before 2000-02-24.
pub fn floor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 2, 24).unwrap()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn resolve_config_defaults() {
        let config = Config {
            base_dir: Some("/data/modis".to_string()),
            ..Config::default()
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.base_dir, Utf8PathBuf::from("/data/modis"));
        assert_eq!(resolved.products.len(), 5);
        assert_eq!(resolved.products[4].code.as_str(), "MYD06_L2");
        assert_eq!(resolved.products[4].collection.as_str(), "61");
        assert_eq!(resolved.products[0].dir, resolved.base_dir);
        assert_eq!(resolved.bounds, BoundingBox::default());
        assert_eq!(resolved.day_night.as_str(), "DNB");
        assert_eq!(resolved.lookback_days, 90);
        assert_eq!(resolved.catalog_retry.max_failures, 5);
        assert_eq!(resolved.fetch_attempts, 10);
    }

    #[test]
    fn resolve_config_entries() {
        let config = Config {
            base_dir: Some("/data/modis".to_string()),
            products: vec![
                ProductEntry::Shorthand("MYD06_L2:61".to_string()),
                ProductEntry::Detailed(ProductEntryObject {
                    product: "MCD43D07".to_string(),
                    collection: "6".to_string(),
                    dir: Some("/data/albedo".to_string()),
                }),
            ],
            ..Config::default()
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.products.len(), 2);
        assert_eq!(resolved.products[1].dir, Utf8PathBuf::from("/data/albedo"));
    }

    #[test]
    fn resolve_config_without_base_dir() {
        // Guard against MODDIR leaking in from the test environment.
        if std::env::var("MODDIR").is_ok() {
            return;
        }
        let err = ConfigLoader::resolve_config(Config::default()).unwrap_err();
        assert_matches!(err, SyncError::MissingBaseDir);
    }

    #[test]
    fn shorthand_without_collection_is_rejected() {
        let config = Config {
            base_dir: Some("/data/modis".to_string()),
            products: vec![ProductEntry::Shorthand("MYD06_L2".to_string())],
            ..Config::default()
        };
        assert_matches!(
            ConfigLoader::resolve_config(config),
            Err(SyncError::InvalidProduct(_))
        );
    }
}
