//! Application-layer liveness check

use crate::ScanError;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Issues a minimal `HEAD /` request. Any HTTP response, whatever its status,
/// means something is listening and talking HTTP.
#[derive(Clone)]
pub struct HttpPinger {
    client: reqwest::Client,
}

impl HttpPinger {
    pub fn new() -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(|e| ScanError::TransportUnavailable(format!("HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Errors and timeouts are swallowed and reported as "not alive"
    pub async fn head(&self, target: Ipv4Addr, port: u16, timeout: Duration) -> bool {
        let url = format!("http://{}:{}/", target, port);

        match self.client.head(&url).timeout(timeout).send().await {
            Ok(response) => {
                log::trace!("HEAD {} -> {}", url, response.status());
                true
            }
            Err(e) => {
                log::trace!("HEAD {} failed: {}", url, e);
                false
            }
        }
    }
}
