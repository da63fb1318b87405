use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;

use crate::domain::{DateCode, ProductCode};
use crate::error::SyncError;

/// The local mirror of one product: a directory of four-digit year
/// subdirectories, each holding files whose names start with the product
/// code. The archive is re-scanned on every run; no index is persisted.
#[derive(Debug, Clone)]
pub struct Archive {
    root: Utf8PathBuf,
    floor: NaiveDate,
}

impl Archive {
    pub fn new(root: impl Into<Utf8PathBuf>, floor: NaiveDate) -> Self {
        Self {
            root: root.into(),
            floor,
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The most recent date already on disk for `product`, used as the
    /// resume point for the next sync window.
    ///
    /// Scans year directories newest first and returns the earlier of the
    /// newest file's embedded date and `min_start`, so an operator can force
    /// a recent window to re-download by lowering `min_start`. An empty
    /// archive yields the floor date. The result never precedes the floor
    /// and never follows `today`. Filesystem failures are fatal, not
    /// retried.
    pub fn last_downloaded_date(
        &self,
        product: &ProductCode,
        min_start: NaiveDate,
        today: NaiveDate,
    ) -> Result<NaiveDate, SyncError> {
        for year in self.year_dirs_newest_first()? {
            if let Some(name) = self.newest_product_file(&year, product)? {
                let code = DateCode::find_in(&name)
                    .ok_or_else(|| SyncError::MissingDateCode(name.clone()))?;
                let date = code.date().min(min_start);
                return Ok(date.clamp(self.floor, today));
            }
        }
        Ok(self.floor.min(today))
    }

    /// Year directory a date code routes to, without creating it.
    pub fn year_dir(&self, code: &DateCode) -> Utf8PathBuf {
        self.root.join(code.year_dir())
    }

    /// Creates the year directory for `code` if absent.
    pub fn ensure_year_dir(&self, code: &DateCode) -> Result<Utf8PathBuf, SyncError> {
        let dir = self.year_dir(code);
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("create year directory {dir}: {err}")))?;
        Ok(dir)
    }

    /// A file counts as downloaded only when it exists with size > 0;
    /// zero-byte leftovers from interrupted runs are re-fetched.
    pub fn is_present(&self, path: &Utf8Path) -> bool {
        fs::metadata(path.as_std_path())
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    fn year_dirs_newest_first(&self) -> Result<Vec<Utf8PathBuf>, SyncError> {
        let entries = fs::read_dir(self.root.as_std_path()).map_err(|err| {
            SyncError::Filesystem(format!("read archive directory {}: {err}", self.root))
        })?;

        let mut years = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|err| SyncError::Filesystem(format!("read {}: {err}", self.root)))?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let is_year = name.len() == 4
                && name.starts_with("20")
                && name.chars().all(|ch| ch.is_ascii_digit());
            if is_year && entry.path().is_dir() {
                years.push(self.root.join(name));
            }
        }
        years.sort();
        years.reverse();
        Ok(years)
    }

    fn newest_product_file(
        &self,
        year_dir: &Utf8Path,
        product: &ProductCode,
    ) -> Result<Option<String>, SyncError> {
        let entries = fs::read_dir(year_dir.as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("read {year_dir}: {err}")))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|err| SyncError::Filesystem(format!("read {year_dir}: {err}")))?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with(product.as_str()) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_dir_layout() {
        let floor = NaiveDate::from_ymd_opt(2000, 2, 24).unwrap();
        let archive = Archive::new("/data/modis", floor);
        let code: DateCode = "2020123".parse().unwrap();
        assert_eq!(archive.year_dir(&code), Utf8PathBuf::from("/data/modis/2020"));
    }
}
