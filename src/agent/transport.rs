use crate::ingest::payload::TrackPayload;
use std::sync::OnceLock;

/// Beacon delivery. Best-effort: implementations never report failure.
pub trait Transport: Send + Sync {
    fn send(&self, payload: TrackPayload);
}

/// Posts beacons to the ingestion endpoint with `reqwest`.
///
/// Inside a tokio runtime the request is spawned and forgotten; outside one
/// it falls back to a blocking request on the calling thread.
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
    blocking: OnceLock<reqwest::blocking::Client>,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
            blocking: OnceLock::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn send(&self, payload: TrackPayload) {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let request = self.client.post(&self.endpoint).json(&payload);
            handle.spawn(async move {
                if let Err(e) = request.send().await {
                    tracing::debug!(error = %e, "Beacon delivery failed");
                }
            });
            return;
        }

        let client = self.blocking.get_or_init(reqwest::blocking::Client::new);
        if let Err(e) = client.post(&self.endpoint).json(&payload).send() {
            tracing::debug!(error = %e, "Beacon delivery failed");
        }
    }
}
