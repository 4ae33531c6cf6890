//! Extraction engine
//!
//! This module turns product and listing pages into structured data:
//! - Fetching with a fixed browser header set and an optional deadline
//! - Ordered selector chains per field, overridable from configuration
//! - Field parsers for prices, ratings and review counts
//! - Review excerpts bucketed by sentiment
//! - Sequential bulk scraping with partial-success reporting
//!
//! Field-level failures never abort a parse; unreadable fields stay at their
//! zero value and are listed in `Product::missing_fields`.

mod engine;
mod fetcher;
mod fields;
mod product;
mod reviews;
mod rules;
mod search;

pub use engine::{BulkOutcome, EngineSettings, ExtractionEngine};
pub use fetcher::{browser_headers, fetch_page};
pub use fields::{
    catalog_id_from_url, detect_currency, normalize_query, parse_price, parse_rating,
    parse_review_count,
};
pub use product::{parse_product, ParseSettings, Price, Product};
pub use reviews::{extract_reviews, ReviewSource, Reviews, MAX_NEGATIVE, MAX_POSITIVE};
pub use rules::{Field, ReviewRegion, RuleError, RuleSet, SearchCardRules, SelectorRule};
pub use search::{build_search_url, parse_search_results};
