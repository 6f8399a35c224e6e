//! Shared fixtures for the integration tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use trellis_scrape::crawler::{FetchRequest, FetchResponse, Transport};
use trellis_scrape::{ScrapeError, ScraperConfig};

/// Base of every address served by [`MapTransport`]
pub const SITE: &str = "https://site.test";

/// In-memory transport serving fixed pages
///
/// Unknown addresses answer 404. Every call is logged with the (tokio) time it
/// reached the transport.
#[derive(Default)]
pub struct MapTransport {
    pages: HashMap<String, (u16, String)>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl MapTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, path: &str, body: &str) -> Self {
        self.pages
            .insert(format!("{}{}", SITE, path), (200, body.to_string()));
        self
    }

    pub fn status(mut self, path: &str, status: u16) -> Self {
        self.pages
            .insert(format!("{}{}", SITE, path), (status, String::new()));
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        let url = format!("{}{}", SITE, path);
        self.calls().iter().filter(|(called, _)| *called == url).count()
    }
}

#[async_trait]
impl Transport for MapTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ScrapeError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.url.clone(), Instant::now()));

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let (status, body) = self
            .pages
            .get(&request.url)
            .cloned()
            .unwrap_or((404, String::new()));

        if !(200..300).contains(&status) {
            return Err(ScrapeError::Http {
                url: request.url,
                status,
            });
        }

        Ok(FetchResponse {
            url: request.url,
            status,
            content_type: Some("text/html".to_string()),
            data: body.into_bytes(),
        })
    }
}

/// A configuration for [`SITE`] with no spacing between requests
pub fn site_config(start_path: &str) -> ScraperConfig {
    let mut config = ScraperConfig::new(SITE, format!("{}{}", SITE, start_path));
    config.delay = 0;
    config
}

pub fn url(path: &str) -> String {
    format!("{}{}", SITE, path)
}

pub fn shared(transport: MapTransport) -> Arc<MapTransport> {
    Arc::new(transport)
}
