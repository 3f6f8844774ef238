//! Connectivity probes
//!
//! A probe answers "are we online right now?". Results are never cached; the
//! orchestrator asks again before every sync attempt.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Considers the device online when the API host answers at all.
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(base_url: &str, probe_path: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            url: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                probe_path.trim_start_matches('/')
            ),
            client,
        })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn is_online(&self) -> bool {
        match self.client.get(&self.url).send().await {
            // Any HTTP answer, even an error status, means the network is up
            Ok(_) => true,
            Err(e) => {
                debug!("Connectivity probe to {} failed: {}", self.url, e);
                false
            }
        }
    }
}

/// Probe with a manually controlled answer.
#[derive(Debug, Default)]
pub struct StaticProbe {
    online: AtomicBool,
}

impl StaticProbe {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_probe_follows_flag() {
        let probe = StaticProbe::new(true);
        assert!(probe.is_online().await);

        probe.set_online(false);
        assert!(!probe.is_online().await);
    }

    #[tokio::test]
    async fn test_http_probe_unreachable_host() {
        // Port 9 (discard) on localhost is closed on test machines
        let probe = HttpProbe::new("http://127.0.0.1:9", "/", Duration::from_millis(200)).unwrap();
        assert!(!probe.is_online().await);
    }

    #[test]
    fn test_http_probe_url_joining() {
        let probe = HttpProbe::new("http://api.local/api/", "/health", Duration::from_secs(1)).unwrap();
        assert_eq!(probe.url, "http://api.local/api/health");
    }
}
