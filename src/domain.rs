use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// A MODIS product short code, e.g. `MYD06_L2` or `MCD43D07`. Product files
/// on disk are recognized by this code as a filename prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductCode(String);

impl ProductCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductCode {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let mut chars = normalized.chars();
        let is_valid = chars
            .next()
            .map(|ch| ch.is_ascii_alphabetic())
            .unwrap_or(false)
            && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if !is_valid {
            return Err(SyncError::InvalidProduct(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// A processing-version (collection) identifier, required alongside the
/// product code to disambiguate catalog entries. Always numeric, e.g. `61`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collection(String);

impl Collection {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Collection {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid =
            !normalized.is_empty() && normalized.chars().all(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(SyncError::InvalidCollection(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// The 7-digit year + day-of-year code every MODIS filename embeds right
/// after a literal `A`, e.g. `A2020123` in `MYD06_L2.A2020123.hdf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateCode(NaiveDate);

impl DateCode {
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Name of the year directory this code routes to, e.g. `2020`.
    pub fn year_dir(&self) -> String {
        format!("{:04}", self.0.year())
    }

    /// Extracts the first embedded date code from a URL or filename.
    pub fn find_in(text: &str) -> Option<DateCode> {
        let re = Regex::new(r"A(\d{7})").unwrap();
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|code| code.as_str().parse().ok())
    }
}

impl From<NaiveDate> for DateCode {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:03}", self.0.year(), self.0.ordinal())
    }
}

impl FromStr for DateCode {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.len() != 7 || !value.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(SyncError::InvalidDateCode(value.to_string()));
        }
        let year: i32 = value[..4]
            .parse()
            .map_err(|_| SyncError::InvalidDateCode(value.to_string()))?;
        let ordinal: u32 = value[4..]
            .parse()
            .map_err(|_| SyncError::InvalidDateCode(value.to_string()))?;
        let date = NaiveDate::from_yo_opt(year, ordinal)
            .ok_or_else(|| SyncError::InvalidDateCode(value.to_string()))?;
        Ok(Self(date))
    }
}

/// Geographic filter for catalog searches. The default covers the
/// continental-US window the archive was originally mirrored for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            north: 55.0,
            south: 20.0,
            east: -65.0,
            west: -125.0,
        }
    }
}

/// Day/night overpass filter. The catalog accepts any combination of the
/// letters `D`, `N` and `B`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayNightFlag(String);

impl DayNightFlag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DayNightFlag {
    fn default() -> Self {
        Self("DNB".to_string())
    }
}

impl fmt::Display for DayNightFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DayNightFlag {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let is_valid =
            !normalized.is_empty() && normalized.chars().all(|ch| matches!(ch, 'D' | 'N' | 'B'));
        if !is_valid {
            return Err(SyncError::InvalidDayNight(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordsOrTiles {
    #[default]
    Coords,
    Tiles,
}

impl fmt::Display for CoordsOrTiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordsOrTiles::Coords => write!(f, "coords"),
            CoordsOrTiles::Tiles => write!(f, "tiles"),
        }
    }
}

/// One product to mirror: what to ask the catalog for and where the local
/// year directories live.
#[derive(Debug, Clone)]
pub struct ProductSpec {
    pub code: ProductCode,
    pub collection: Collection,
    pub dir: Utf8PathBuf,
}

/// Fully-resolved catalog search criteria for one product and time window.
#[derive(Debug, Clone)]
pub struct CatalogFilter {
    pub product: ProductCode,
    pub collection: Collection,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub bounds: BoundingBox,
    pub coords_or_tiles: CoordsOrTiles,
    pub day_night: DayNightFlag,
}
