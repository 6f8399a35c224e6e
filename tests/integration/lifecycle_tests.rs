//! Run-wide behavior: concurrency, spacing, retries and the run lifecycle
//!
//! These tests run against the in-memory transport so that timing can be
//! checked with tokio's paused clock.

use crate::common::{shared, site_config, url, MapTransport};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use trellis_scrape::operations::{HookResult, IterationRecord, OperationHooks};
use trellis_scrape::{
    CollectContent, DownloadContent, OpenLinks, OpenUrls, Root, ScrapeError, Scraper,
};

fn item_urls(count: usize) -> Vec<String> {
    (1..=count).map(|n| url(&format!("/p/{}", n))).collect()
}

fn item_pages(mut transport: MapTransport, count: usize) -> MapTransport {
    for n in 1..=count {
        transport = transport.page(&format!("/p/{}", n), &format!("<h1>{}</h1>", n));
    }
    transport
}

#[derive(Default)]
struct CountExceptions {
    seen: AtomicUsize,
}

#[async_trait]
impl OperationHooks for CountExceptions {
    async fn exception(&self, _error: &ScrapeError) -> HookResult {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct RejectData;

#[async_trait]
impl OperationHooks for RejectData {
    async fn page_data(&self, _record: &IterationRecord) -> HookResult {
        anyhow::bail!("refusing page data")
    }
}

#[tokio::test(start_paused = true)]
async fn test_requests_never_exceed_concurrency() {
    let transport = shared(
        item_pages(MapTransport::new().page("/", "<html></html>"), 8)
            .latency(Duration::from_millis(50)),
    );

    let mut config = site_config("/");
    config.concurrency = 2;

    let scraper = Scraper::builder(config)
        .transport(transport.clone())
        .build()
        .unwrap();
    let root = Root::new().with_operation(
        OpenUrls::new(item_urls(8)).with_operation(CollectContent::new("h1")),
    );

    scraper.scrape(&root).await.unwrap();

    assert_eq!(transport.calls().len(), 9);
    assert_eq!(transport.peak(), 2);
    assert_eq!(scraper.context().stats().currently_running(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dispatches_are_spaced_by_delay() {
    let transport = shared(item_pages(MapTransport::new().page("/", "<html></html>"), 4));

    let mut config = site_config("/");
    config.delay = 100;
    config.concurrency = 4;

    let scraper = Scraper::builder(config)
        .transport(transport.clone())
        .build()
        .unwrap();
    let root = Root::new().with_operation(OpenUrls::new(item_urls(4)));

    scraper.scrape(&root).await.unwrap();

    let mut times: Vec<_> = transport.calls().into_iter().map(|(_, at)| at).collect();
    times.sort();
    assert_eq!(times.len(), 5);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(100));
    }
}

#[tokio::test]
async fn test_attempts_are_bounded_by_max_retries() {
    let transport = shared(
        MapTransport::new()
            .page("/", "<html></html>")
            .status("/flaky", 503),
    );

    let mut config = site_config("/");
    config.max_retries = 3;

    let hooks = Arc::new(CountExceptions::default());
    let scraper = Scraper::builder(config)
        .transport(transport.clone())
        .build()
        .unwrap();
    let root = Root::new().with_operation(
        OpenUrls::new([url("/flaky")])
            .with_name("flaky")
            .with_hooks(hooks.clone()),
    );

    let result = scraper.scrape(&root).await.unwrap();

    assert_eq!(transport.calls_to("/flaky"), 4);
    assert_eq!(hooks.seen.load(Ordering::SeqCst), 3);

    let record = &result.data.iterations()[0].children()[0].data.iterations()[0];
    assert_eq!(record.code, Some(503));
    assert!(record
        .error
        .as_deref()
        .unwrap()
        .starts_with(&format!("There was an error opening page {}", url("/flaky"))));
}

#[tokio::test]
async fn test_completion_fires_once() {
    let transport = shared(MapTransport::new().page("/", "<h1>home</h1>"));
    let scraper = Scraper::builder(site_config("/"))
        .transport(transport)
        .build()
        .unwrap();

    let mut early = scraper.done();
    let waiter = tokio::spawn(async move { early.wait().await });

    let root = Root::new().with_operation(CollectContent::new("h1"));
    scraper.scrape(&root).await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert!(scraper.context().completion().is_fired());
    assert!(!scraper.context().completion().fire());

    let mut late = scraper.done();
    tokio::time::timeout(Duration::from_secs(1), late.wait())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_file_path_fails_injection() {
    let transport = shared(MapTransport::new().page("/", "<img src=\"/a.png\">"));
    let scraper = Scraper::builder(site_config("/"))
        .transport(transport.clone())
        .build()
        .unwrap();

    let root = Root::new().with_operation(DownloadContent::new("img"));
    let error = scraper.scrape(&root).await.unwrap_err();

    assert!(matches!(error, ScrapeError::Config(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_page_data_hook_error_surfaces() {
    let transport = shared(MapTransport::new().page("/", "<h1>home</h1>"));
    let scraper = Scraper::builder(site_config("/"))
        .transport(transport)
        .build()
        .unwrap();

    let root = Root::new().with_hooks(Arc::new(RejectData));
    let error = scraper.scrape(&root).await.unwrap_err();

    assert!(matches!(error, ScrapeError::Hook { hook: "page_data", .. }));
}

#[tokio::test]
async fn test_nested_page_data_error_fails_parent_page() {
    let transport = shared(
        MapTransport::new()
            .page("/", r#"<a class="next" href="/p/1">one</a>"#)
            .page("/p/1", "<h1>1</h1>")
            .page("/p/2", "<h1>2</h1>"),
    );
    let scraper = Scraper::builder(site_config("/"))
        .transport(transport)
        .build()
        .unwrap();

    let root = Root::new()
        .with_operation(
            OpenLinks::new("a.next")
                .with_name("links")
                .with_hooks(Arc::new(RejectData)),
        )
        .with_operation(OpenUrls::new([url("/p/2")]).with_name("sibling"));

    let result = scraper.scrape(&root).await.unwrap();

    let record = &result.data.iterations()[0];
    assert!(record.is_failed());
    assert!(record.children().is_empty());
    assert!(record.error.as_deref().unwrap().contains("page_data"));
    assert_eq!(scraper.context().failed_iterations().len(), 1);
}

#[tokio::test]
async fn test_indefinite_scrape_counts_cycles() {
    let transport = shared(MapTransport::new().page("/", "<h1>home</h1>"));
    let scraper = Arc::new(
        Scraper::builder(site_config("/"))
            .transport(transport.clone())
            .build()
            .unwrap(),
    );
    let root = Arc::new(Root::new().with_operation(CollectContent::new("h1")));

    for cycle in 1..=2 {
        let (sent, received) = oneshot::channel();
        let handle = scraper
            .indefinite_scrape(
                root.clone(),
                move |data| {
                    let _ = sent.send(data.len());
                },
                |error| panic!("cycle failed: {}", error),
            )
            .unwrap();

        handle.await.unwrap();
        assert_eq!(received.await.unwrap(), cycle);
    }

    assert_eq!(scraper.summary().repetition_cycles, 1);
    assert_eq!(transport.calls_to("/"), 2);
    assert_eq!(scraper.context().registered().len(), 2);
    assert!(scraper.context().completion().is_fired());
}
