use product_scout::config::{load_config, Config};
use product_scout::pipeline::Coordinator;
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders a product page carrying the given catalog id and title
pub fn product_page(catalog_id: &str, title: &str, price: &str) -> String {
    format!(
        r#"<html><body>
            <input type="hidden" id="ASIN" value="{catalog_id}">
            <span id="productTitle">{title}</span>
            <span class="a-price"><span class="a-offscreen">{price}</span></span>
            <span id="acrPopover" title="4.6 out of 5 stars"></span>
            <span id="acrCustomerReviewText">1,204 ratings</span>
            <div id="availability"><span>In Stock</span></div>
            <div data-hook="review">
                <i data-hook="review-star-rating"><span>5.0 out of 5 stars</span></i>
                <span data-hook="review-body">Does the job</span>
            </div>
        </body></html>"#
    )
}

/// Mounts a 200 product page at `route`
pub async fn mount_product(server: &MockServer, route: &str, catalog_id: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(product_page(catalog_id, title, "$19.99")),
        )
        .mount(server)
        .await;
}

/// Mounts a fixed error status at `route`
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Writes `extra` after an `[extraction]` header pointing at `server`, then
/// loads it the way the binary does
pub fn load_test_config(server: &MockServer, extra: &str) -> Config {
    let content = format!(
        r#"
[extraction]
base-url = "{}"
bulk-delay-ms = 10
timeout-secs = 5
{}
"#,
        server.uri(),
        extra
    );

    let mut file = NamedTempFile::new().expect("Failed to create temp config");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp config");
    file.flush().expect("Failed to flush temp config");

    load_config(file.path()).expect("Test config should be valid")
}

pub fn coordinator(server: &MockServer, extra: &str) -> Coordinator {
    Coordinator::from_config(&load_test_config(server, extra)).expect("Failed to build pipeline")
}
