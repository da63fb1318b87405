use crate::archive::Archive;
use crate::domain::DateCode;
use crate::error::SyncError;
use crate::output::{ProgressEvent, ProgressSink};
use crate::transport::Transport;

/// What the engine did for one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchAction {
    Downloaded,
    Skipped,
}

/// Downloads one URL into the year directory named by the URL's own embedded
/// date code, so a single catalog response spanning a year boundary fans out
/// to the right directories.
pub struct FetchEngine<T: Transport> {
    transport: T,
    max_attempts: u32,
}

impl<T: Transport> FetchEngine<T> {
    pub fn new(transport: T, max_attempts: u32) -> Self {
        Self {
            transport,
            max_attempts,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Idempotent fetch: a non-empty file of the same basename short-circuits
    /// without a network call. Otherwise the body is streamed into a temp
    /// file in the target year directory and renamed over the destination on
    /// success. Transport failures are retried without delay up to the
    /// attempt budget; filesystem failures are immediately fatal.
    pub fn fetch(
        &self,
        url: &str,
        token: Option<&str>,
        archive: &Archive,
        sink: &dyn ProgressSink,
    ) -> Result<FetchAction, SyncError> {
        let basename = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| SyncError::InvalidUrl(url.to_string()))?;
        let code =
            DateCode::find_in(url).ok_or_else(|| SyncError::MissingDateCode(url.to_string()))?;

        let year_dir = archive.ensure_year_dir(&code)?;
        let dest = year_dir.join(basename);
        if archive.is_present(&dest) {
            sink.event(ProgressEvent::new(
                2,
                format!("{basename} already present, skipping"),
            ));
            return Ok(FetchAction::Skipped);
        }

        for attempt in 1..=self.max_attempts {
            let mut temp = tempfile::Builder::new()
                .prefix(basename)
                .suffix(".part")
                .tempfile_in(year_dir.as_std_path())
                .map_err(|err| {
                    SyncError::Filesystem(format!("create temp file in {year_dir}: {err}"))
                })?;

            match self.transport.get(url, token, temp.as_file_mut()) {
                Ok(bytes) => {
                    temp.persist(dest.as_std_path())
                        .map_err(|err| SyncError::Filesystem(format!("persist {dest}: {err}")))?;
                    sink.event(ProgressEvent::new(
                        1,
                        format!("downloaded {basename} ({bytes} bytes)"),
                    ));
                    return Ok(FetchAction::Downloaded);
                }
                Err(err) => {
                    sink.event(ProgressEvent::new(
                        0,
                        format!("attempt {attempt}/{}: {err}", self.max_attempts),
                    ));
                }
            }
        }

        Err(SyncError::Download {
            url: url.to_string(),
            attempts: self.max_attempts,
        })
    }
}
