use std::io::{self, Write};
use std::process::Command;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use thiserror::Error;

use crate::error::SyncError;

pub const USER_AGENT: &str = concat!("modis-sync/", env!("CARGO_PKG_VERSION"));

/// Failure classification for a single GET, reported between retry attempts:
/// the server answered with an error status, or no answer arrived at all.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP GET error code {code}: {message}")]
    Status { code: u16, message: String },

    #[error("failed to make request: {0}")]
    Connection(String),
}

/// Strategy seam for the file-server GET. The implementation is chosen once
/// at startup; retrying is the caller's concern.
pub trait Transport {
    /// Streams the response body for `url` into `out`, attaching the fixed
    /// user agent and, when given, a bearer token. Returns the byte count.
    fn get(
        &self,
        url: &str,
        token: Option<&str>,
        out: &mut dyn Write,
    ) -> Result<u64, TransportError>;
}

impl Transport for Box<dyn Transport> {
    fn get(
        &self,
        url: &str,
        token: Option<&str>,
        out: &mut dyn Write,
    ) -> Result<u64, TransportError> {
        (**self).get(url, token, out)
    }
}

pub struct NativeTransport {
    client: Client,
}

impl NativeTransport {
    pub fn new() -> Result<Self, SyncError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .connect_timeout(Duration::from_secs(60))
            .timeout(None)
            .build()
            .map_err(|err| SyncError::CatalogHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for NativeTransport {
    fn get(
        &self,
        url: &str,
        token: Option<&str>,
        out: &mut dyn Write,
    ) -> Result<u64, TransportError> {
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let mut response = request
            .send()
            .map_err(|err| TransportError::Connection(err.to_string()))?;
        if !response.status().is_success() {
            let code = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "request failed".to_string());
            return Err(TransportError::Status { code, message });
        }
        io::copy(&mut response, out).map_err(|err| TransportError::Connection(err.to_string()))
    }
}

/// Fallback for runtimes without TLS 1.2 support: shells out to `curl`.
/// This is an environment-capability branch, not a retry mechanism.
pub struct CurlTransport;

impl Transport for CurlTransport {
    fn get(
        &self,
        url: &str,
        token: Option<&str>,
        out: &mut dyn Write,
    ) -> Result<u64, TransportError> {
        let mut command = Command::new("curl");
        command
            .args(["--fail", "-sS", "-L", "--get", url])
            .args(["-H", &format!("user-agent: {USER_AGENT}")]);
        if let Some(token) = token {
            command.args(["-H", &format!("Authorization: Bearer {token}")]);
        }
        let output = command
            .output()
            .map_err(|err| TransportError::Connection(err.to_string()))?;
        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
            // Exit code 22 is curl's --fail signal for an HTTP error status;
            // the status itself is the trailing number of the message.
            if output.status.code() == Some(22) {
                let code = message
                    .rsplit(' ')
                    .next()
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(0);
                return Err(TransportError::Status { code, message });
            }
            return Err(TransportError::Connection(message));
        }
        out.write_all(&output.stdout)
            .map_err(|err| TransportError::Connection(err.to_string()))?;
        Ok(output.stdout.len() as u64)
    }
}

/// Picks the native TLS transport when the runtime can build it, otherwise
/// the external `curl` fallback. Called once at startup.
pub fn select_transport() -> Box<dyn Transport> {
    match NativeTransport::new() {
        Ok(transport) => Box::new(transport),
        Err(err) => {
            tracing::warn!("native TLS transport unavailable ({err}), falling back to curl");
            Box::new(CurlTransport)
        }
    }
}
