use crate::common::{coordinator, mount_product, mount_status};
use product_scout::extraction::ReviewSource;
use product_scout::pipeline::CallContext;
use product_scout::{ErrorKind, ScoutError, ScrapeError};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn caller() -> CallContext {
    CallContext::new("alice", "192.0.2.10")
}

#[tokio::test]
async fn test_scrape_single_product() {
    let server = MockServer::start().await;
    mount_product(&server, "/Widget/dp/B0000WIDGT", "B0000WIDGT", "Widget").await;
    let coordinator = coordinator(&server, "");

    let product = coordinator
        .scrape(&format!("{}/Widget/dp/B0000WIDGT", server.uri()), &caller())
        .await
        .expect("Scrape should succeed");

    assert_eq!(product.catalog_id, "B0000WIDGT");
    assert_eq!(product.title, "Widget");
    assert_eq!(product.price.amount, 19.99);
    assert_eq!(product.price.currency, "USD");
    assert_eq!(product.rating, 4.6);
    assert_eq!(product.review_count, 1204);
    assert_eq!(product.availability, "In Stock");
    assert_eq!(product.positive_reviews, vec!["Does the job"]);
    assert_eq!(product.review_source, ReviewSource::Extracted);

    let snapshot = coordinator.metrics_snapshot();
    assert_eq!(snapshot.total_requests, 1);
    assert_eq!(snapshot.successful_scrapes, 1);
    assert_eq!(snapshot.recent_product_ids, vec!["B0000WIDGT"]);
}

#[tokio::test]
async fn test_scrape_failure_is_typed() {
    let server = MockServer::start().await;
    mount_status(&server, "/gone", 404).await;
    let coordinator = coordinator(&server, "");

    let err = coordinator
        .scrape(&format!("{}/gone", server.uri()), &caller())
        .await
        .unwrap_err();

    match &err {
        ScoutError::Scrape(ScrapeError::FetchFailed { reason, .. }) => {
            assert_eq!(reason, "HTTP 404")
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!err.is_admission_denied());
    assert_eq!(
        coordinator.metrics_snapshot().error_counts[&ErrorKind::FetchFailed],
        1
    );
}

#[tokio::test]
async fn test_bulk_partial_success() {
    let server = MockServer::start().await;
    mount_product(&server, "/dp/B000000001", "B000000001", "First").await;
    mount_status(&server, "/dp/B000000002", 500).await;
    mount_status(&server, "/dp/B000000003", 404).await;
    let coordinator = coordinator(&server, "");

    let urls: Vec<String> = (1..=3)
        .map(|i| format!("{}/dp/B00000000{}", server.uri(), i))
        .collect();
    let outcome = coordinator
        .bulk_scrape(&urls, &caller())
        .await
        .expect("Partial success is not an error");

    assert_eq!(outcome.products.len(), 1);
    assert_eq!(outcome.products[0].title, "First");
    assert_eq!(outcome.failures.len(), 2);
    assert!(outcome.warning.is_some());
    assert!(!outcome.stopped_early);

    let snapshot = coordinator.metrics_snapshot();
    assert_eq!(snapshot.total_requests, 3);
    assert_eq!(snapshot.successful_scrapes, 1);
    assert_eq!(snapshot.failed_scrapes, 2);
}

#[tokio::test]
async fn test_bulk_total_failure() {
    let server = MockServer::start().await;
    mount_status(&server, "/a", 500).await;
    mount_status(&server, "/b", 503).await;
    mount_status(&server, "/c", 404).await;
    let coordinator = coordinator(&server, "");

    let urls: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|p| format!("{}/{}", server.uri(), p))
        .collect();
    let err = coordinator.bulk_scrape(&urls, &caller()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BulkFailure);
    match err {
        ScoutError::Scrape(ScrapeError::AllFailed { failures }) => {
            let reasons: Vec<_> = failures.iter().map(|f| f.reason.as_str()).collect();
            assert_eq!(reasons, vec!["HTTP 500", "HTTP 503", "HTTP 404"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_bulk_rejects_too_many_urls() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server, "max-bulk-urls = 2");

    let urls = vec![format!("{}/dp/B000000001", server.uri()); 3];
    let err = coordinator.bulk_scrape(&urls, &caller()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(coordinator.metrics_snapshot().total_requests, 0);
}

#[tokio::test]
async fn test_search_keeps_complete_cards() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s"))
        .and(query_param("k", "usb cable"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <div data-component-type="s-search-result" data-asin="B00000CAB1">
                    <h2><a href="/dp/B00000CAB1"><span>Braided USB Cable</span></a></h2>
                    <span class="a-price"><span class="a-offscreen">$7.49</span></span>
                </div>
                <div data-component-type="s-search-result" data-asin="B00000CAB2">
                    <h2><a href="/dp/B00000CAB2"><span></span></a></h2>
                </div>
            </body></html>"#,
        ))
        .mount(&server)
        .await;
    let coordinator = coordinator(&server, "");

    let products = coordinator
        .search("  usb    cable ", 2, &caller())
        .await
        .expect("Search should succeed");

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].catalog_id, "B00000CAB1");
    assert_eq!(products[0].title, "Braided USB Cable");
    assert_eq!(products[0].price.amount, 7.49);
    assert_eq!(
        products[0].source_url,
        format!("{}/dp/B00000CAB1", server.uri())
    );
    assert_eq!(coordinator.metrics_snapshot().total_requests, 1);
}

#[tokio::test]
async fn test_admission_denial_is_distinct_and_unrecorded() {
    let server = MockServer::start().await;
    mount_product(&server, "/dp/B000000001", "B000000001", "Widget").await;
    let coordinator = coordinator(&server, "\n[admission]\nburst = 2\nrefill-per-minute = 1\n");
    let url = format!("{}/dp/B000000001", server.uri());

    coordinator.scrape(&url, &caller()).await.unwrap();
    coordinator.scrape(&url, &caller()).await.unwrap();

    let err = coordinator.scrape(&url, &caller()).await.unwrap_err();
    assert!(err.is_admission_denied());
    assert_eq!(err.kind(), ErrorKind::AdmissionDenied);

    // A different address has its own bucket
    let other = CallContext::new("alice", "192.0.2.99");
    coordinator.scrape(&url, &other).await.unwrap();

    let snapshot = coordinator.metrics_snapshot();
    assert_eq!(snapshot.total_requests, 3);
    assert!(snapshot.error_counts.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_caller_deadline_cuts_slow_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let coordinator = coordinator(&server, "");

    let ctx = caller().with_timeout(Duration::from_millis(150));
    let err = coordinator
        .scrape(&format!("{}/dp/B000000001", server.uri()), &ctx)
        .await
        .unwrap_err();

    match err {
        ScoutError::Scrape(ScrapeError::FetchFailed { reason, .. }) => {
            assert_eq!(reason, "Deadline exceeded")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_metrics_accounting_across_operations() {
    let server = MockServer::start().await;
    mount_product(&server, "/dp/B000000001", "B000000001", "One").await;
    mount_product(&server, "/dp/B000000002", "B000000002", "Two").await;
    mount_status(&server, "/dp/B000000003", 502).await;
    let coordinator = coordinator(&server, "");
    let base = server.uri();

    for id in ["B000000001", "B000000002", "B000000001"] {
        coordinator
            .scrape(&format!("{}/dp/{}", base, id), &caller())
            .await
            .unwrap();
    }
    let _ = coordinator
        .scrape(&format!("{}/dp/B000000003", base), &caller())
        .await;

    let snapshot = coordinator.metrics_snapshot();
    assert_eq!(snapshot.total_requests, 4);
    assert_eq!(snapshot.successful_scrapes, 3);
    assert_eq!(snapshot.failed_scrapes, 1);
    assert_eq!(snapshot.recent_product_ids, vec!["B000000001", "B000000002"]);
    assert!(snapshot.last_updated.is_some());

    let view = coordinator.performance_metrics();
    assert_eq!(view.success_rate, 75.0);
    assert_eq!(view.error_distribution[&ErrorKind::FetchFailed], 100.0);

    coordinator.reset_metrics();
    assert_eq!(coordinator.metrics_snapshot().total_requests, 0);
}
