use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

/// Cheap reachability check gating remote writes.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Issues a GET against a well-known URL. Any HTTP response, whatever its
/// status, counts as reachable; transport errors and timeouts do not.
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                tracing::debug!("Probe {} answered {}", self.url, response.status());
                true
            }
            Err(e) => {
                tracing::debug!("Probe {} failed: {}", self.url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unroutable_url_is_unreachable() {
        // Port 9 on loopback (discard) is closed on test machines; connect fails fast.
        let probe = HttpProbe::new("http://127.0.0.1:9/", Duration::from_millis(500)).unwrap();
        assert!(!probe.is_reachable().await);
    }
}
