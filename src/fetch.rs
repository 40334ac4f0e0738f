//! HTTP retrieval of columnar data files.
//!
//! One GET per call, no retries. The caller decides whether a failed load is
//! retried by issuing a fresh load; a non-success status is reported with its
//! code so consumers can show it.

use crate::error::LoadError;
use std::io::Read;
use std::time::Duration;

/// Default download timeout, matching the config default.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Fetch the resource at `url` and return its body as bytes.
pub fn fetch_bytes(url: &str, timeout: Duration) -> Result<Vec<u8>, LoadError> {
    let response = ureq::get(url).timeout(timeout).call().map_err(|e| match e {
        ureq::Error::Status(code, response) => LoadError::Network {
            status: Some(code),
            message: format!(
                "Server returned {} {} for {}. Check the URL.",
                code,
                response.status_text(),
                url
            ),
        },
        ureq::Error::Transport(t) => LoadError::Network {
            status: None,
            message: format!("Download failed. Check the URL and your connection: {}", t),
        },
    })?;
    let status = response.status();
    if status >= 400 {
        return Err(LoadError::Network {
            status: Some(status),
            message: format!(
                "Server returned {} {} for {}. Check the URL.",
                status,
                response.status_text(),
                url
            ),
        });
    }
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| LoadError::Network {
            status: None,
            message: format!("Download failed while reading the response: {}", e),
        })?;
    Ok(bytes)
}
