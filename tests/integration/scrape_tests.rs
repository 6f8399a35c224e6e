//! End-to-end scrapes over HTTP
//!
//! These tests use wiremock to create mock HTTP servers and run whole
//! operation trees through the real transport.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use trellis_scrape::config::PaginationConfig;
use trellis_scrape::operations::{CompositeOperation, HookResult, OperationHooks, PageObject};
use trellis_scrape::{
    CollectContent, DownloadContent, OpenLinks, OpenUrls, Root, Scraper, ScraperConfig,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for the mock server with no request spacing
fn create_test_config(server: &MockServer, start_path: &str) -> ScraperConfig {
    let mut config = ScraperConfig::new(server.uri(), format!("{}{}", server.uri(), start_path));
    config.delay = 0;
    config.timeout = 2000;
    config
}

async fn serve(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"),
        )
        .mount(server)
        .await;
}

#[derive(Default)]
struct PageObjects {
    keys: Mutex<Vec<BTreeSet<String>>>,
}

#[async_trait]
impl OperationHooks for PageObjects {
    async fn page_object(&self, object: &PageObject, _address: &str) -> HookResult {
        self.keys.lock().unwrap().push(object.keys().cloned().collect());
        Ok(())
    }
}

#[tokio::test]
async fn test_result_tree_mirrors_operations() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/",
        r#"<html><body>
            <a class="item" href="/items/1">One</a>
            <a class="item" href="items/2">Two</a>
            <a class="item" href="mailto:someone@example.com">Mail</a>
            <a href="/elsewhere">Not an item</a>
        </body></html>"#,
    )
    .await;
    serve(&server, "/items/1", "<h1>First</h1><p>alpha</p>").await;
    serve(&server, "/items/2", "<h1>Second</h1><p>beta</p>").await;

    let hooks = Arc::new(PageObjects::default());
    let root = Root::new().with_operation(
        OpenLinks::new("a.item")
            .with_name("item")
            .with_hooks(hooks.clone())
            .with_operation(CollectContent::new("h1").with_name("title"))
            .with_operation(CollectContent::new("p").with_name("body")),
    );

    let scraper = Scraper::new(create_test_config(&server, "/")).unwrap();
    let result = scraper.scrape(&root).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["type"], "Root");
    let item = &json["data"][0]["data"][0];
    assert_eq!(item["type"], "OpenLinks");
    assert_eq!(item["name"], "item");

    let pages = item["data"].as_array().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0]["address"], format!("{}/items/1", server.uri()));
    assert_eq!(pages[0]["data"][0]["name"], "title");
    assert_eq!(pages[0]["data"][0]["data"][0], "First");
    assert_eq!(pages[1]["data"][1]["name"], "body");
    assert_eq!(pages[1]["data"][1]["data"][0], "beta");

    let keys = hooks.keys.lock().unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys
        .iter()
        .all(|k| k.iter().map(String::as_str).eq(["body", "title"])));

    let registered: Vec<_> = scraper
        .context()
        .registered()
        .iter()
        .map(|state| state.name().to_string())
        .collect();
    assert_eq!(registered, ["root", "item", "title", "body"]);
}

#[tokio::test]
async fn test_failing_url_is_retried_then_recorded() {
    let server = MockServer::start().await;
    serve(&server, "/", "<html></html>").await;
    serve(&server, "/a", "<h1>A</h1>").await;
    serve(&server, "/c", "<h1>C</h1>").await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, "/");
    config.max_retries = 2;

    let urls: Vec<String> = ["/a", "/b", "/c"]
        .iter()
        .map(|p| format!("{}{}", server.uri(), p))
        .collect();
    let root = Root::new().with_operation(
        OpenUrls::new(urls)
            .with_name("pages")
            .with_operation(CollectContent::new("h1").with_name("title")),
    );

    let scraper = Scraper::new(config).unwrap();
    let result = scraper.scrape(&root).await.unwrap();

    let pages = &result.data.iterations()[0].children()[0];
    let records = pages.data.iterations();
    assert_eq!(records.len(), 3);
    assert_eq!(records.iter().filter(|r| r.is_failed()).count(), 1);
    assert!(records[1].is_failed());
    assert_eq!(records[1].code, Some(500));
    assert_eq!(records[1].attempts, Some(3));
    assert_eq!(records[0].attempts, None);
    assert_eq!(records[2].children()[0].data.values(), ["C"]);

    assert_eq!(scraper.context().failed_iterations().len(), 1);
    assert_eq!(root.children()[0].errors().len(), 1);
}

#[tokio::test]
async fn test_skip_code_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, "/limited");
    config.error_codes_to_skip = vec![429];

    let root = Root::new().with_operation(CollectContent::new("h1"));
    let scraper = Scraper::new(config).unwrap();
    let result = scraper.scrape(&root).await.unwrap();

    let record = &result.data.iterations()[0];
    assert!(record.is_failed());
    assert_eq!(record.code, Some(429));
    assert_eq!(record.attempts, Some(1));
    assert_eq!(scraper.summary().total_requests, 1);
}

#[tokio::test]
async fn test_paginated_root() {
    let server = MockServer::start().await;
    for page in 1..=3 {
        Mock::given(method("GET"))
            .and(path("/list"))
            .and(query_param("page", page.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(format!("<h1>Page {}</h1>", page), "text/html"),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let root = Root::new()
        .with_pagination(PaginationConfig::query("page", 1, 3))
        .with_operation(CollectContent::new("h1").with_name("heading"));

    let scraper = Scraper::new(create_test_config(&server, "/list")).unwrap();
    let result = scraper.scrape(&root).await.unwrap();

    let record = &result.data.iterations()[0];
    assert_eq!(record.address, format!("{}/list", server.uri()));

    let pages = record.pages();
    assert_eq!(pages.len(), 3);
    for (index, page) in pages.iter().enumerate() {
        let number = index + 1;
        assert_eq!(page.address, format!("{}/list?page={}", server.uri(), number));
        assert_eq!(page.children()[0].data.values(), [format!("Page {}", number)]);
    }
}

#[tokio::test]
async fn test_rejected_page_skips_children() {
    let server = MockServer::start().await;
    serve(&server, "/", "<p>no heading here</p>").await;

    let scraper = Scraper::builder(create_test_config(&server, "/"))
        .page_validator(|document, _address| {
            let selector = ::scraper::Selector::parse("h1").unwrap();
            document.select(&selector).next().is_some()
        })
        .build()
        .unwrap();

    let root = Root::new().with_operation(CollectContent::new("p").with_name("text"));
    let result = scraper.scrape(&root).await.unwrap();

    let record = &result.data.iterations()[0];
    assert!(record.is_empty());
    assert!(record.error.is_none());
    assert!(!record.is_failed());
    assert!(root.children()[0].data().is_empty());
    assert!(scraper.context().failed_iterations().is_empty());
}

#[tokio::test]
async fn test_downloads_images() {
    let server = MockServer::start().await;
    let files = TempDir::new().unwrap();

    serve(
        &server,
        "/",
        r#"<html><body>
            <img class="cat" src="/img/cat.png">
            <img class="cat" src="/img/cat.png">
            <img class="lazy" data-src="/img/dog.png">
            <img class="inline" src="data:image/png;base64,AAAA">
        </body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/img/cat.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"cat".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/dog.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"dog".to_vec()))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, "/");
    config.file_path = Some(files.path().display().to_string());

    let root = Root::new()
        .with_operation(DownloadContent::new("img").with_name("images").with_alternative_src(["data-src"]))
        .with_operation(DownloadContent::new("img.cat").with_name("again"));

    let scraper = Scraper::new(config).unwrap();
    let result = scraper.scrape(&root).await.unwrap();

    let children = result.data.iterations()[0].children();
    assert_eq!(
        children[0].data.values(),
        [
            format!("{}/img/cat.png", server.uri()),
            format!("{}/img/dog.png", server.uri()),
        ]
    );
    assert_eq!(children[1].data.len(), 1);

    assert_eq!(std::fs::read(files.path().join("cat.png")).unwrap(), b"cat");
    assert_eq!(std::fs::read(files.path().join("dog.png")).unwrap(), b"dog");
    assert_eq!(std::fs::read(files.path().join("cat1.png")).unwrap(), b"cat");
    assert_eq!(scraper.summary().downloaded_files, 3);
}

#[tokio::test]
async fn test_exports_logs_on_completion() {
    let server = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    serve(&server, "/", "<h1>Home</h1>").await;

    let mut config = create_test_config(&server, "/");
    config.max_retries = 0;
    config.log_path = Some(logs.path().display().to_string());

    let root = Root::new()
        .with_operation(CollectContent::new("h1").with_name("heading"))
        .with_operation(
            OpenUrls::new([format!("{}/missing-page", server.uri())])
                .with_name("broken"),
        );

    let scraper = Scraper::new(config).unwrap();
    scraper.scrape(&root).await.unwrap();

    let read = |name: &str| -> serde_json::Value {
        serde_json::from_slice(&std::fs::read(logs.path().join(name)).unwrap()).unwrap()
    };

    assert_eq!(read("log.json")["address"], format!("{}/", server.uri()));
    assert_eq!(read("heading.json")[0]["data"][0], "Home");
    assert_eq!(read("broken.json")[0]["code"], 404);
    assert_eq!(read("broken.json")[0]["attempts"], 1);

    let errors = read("finalErrors.json");
    assert_eq!(errors.as_array().unwrap().len(), 1);
}
