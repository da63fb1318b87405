use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("invalid product code: {0}")]
    InvalidProduct(String),

    #[error("invalid collection id: {0}")]
    InvalidCollection(String),

    #[error("invalid day/night flag: {0}")]
    InvalidDayNight(String),

    #[error("invalid date code: {0}")]
    InvalidDateCode(String),

    #[error("no date code found in {0}")]
    MissingDateCode(String),

    #[error("cannot derive a file name from {0}")]
    InvalidUrl(String),

    #[error("no base directory configured (set base_dir in modis-sync.json or the MODDIR environment variable)")]
    MissingBaseDir,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("token file at {0} contains no usable line")]
    EmptyToken(PathBuf),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("catalog returned malformed payload: {0}")]
    CatalogPayload(String),

    #[error("no file URLs obtained for {0}")]
    NoUrls(String),

    #[error("download of {url} failed after {attempts} attempts")]
    Download { url: String, attempts: u32 },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
