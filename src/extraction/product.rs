//! Product page parsing

use crate::extraction::fields::{
    catalog_id_from_url, detect_currency, parse_price, parse_rating, parse_review_count,
};
use crate::extraction::reviews::{extract_reviews, ReviewSource};
use crate::extraction::rules::{Field, RuleSet};
use chrono::{DateTime, Utc};
use scraper::Html;
use serde::{Deserialize, Serialize};
use url::Url;

/// Price with its ISO currency code
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    pub currency: String,
}

/// Structured product data extracted from one page
///
/// Fields the page did not yield keep their zero value and are listed in
/// `missing_fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub catalog_id: String,
    pub title: String,
    pub price: Price,
    pub rating: f64,
    pub review_count: u64,
    pub images: Vec<String>,
    pub description: String,
    pub features: Vec<String>,
    pub availability: String,
    pub brand: String,
    pub source_url: String,
    pub scraped_at: DateTime<Utc>,
    pub positive_reviews: Vec<String>,
    pub negative_reviews: Vec<String>,
    pub review_source: ReviewSource,
    pub missing_fields: Vec<String>,
}

impl Product {
    /// An all-zero product for `source_url`
    pub fn empty(source_url: &str, currency: &str) -> Self {
        Self {
            catalog_id: String::new(),
            title: String::new(),
            price: Price {
                amount: 0.0,
                currency: currency.to_string(),
            },
            rating: 0.0,
            review_count: 0,
            images: Vec::new(),
            description: String::new(),
            features: Vec::new(),
            availability: String::new(),
            brand: String::new(),
            source_url: source_url.to_string(),
            scraped_at: Utc::now(),
            positive_reviews: Vec::new(),
            negative_reviews: Vec::new(),
            review_source: ReviewSource::NotFound,
            missing_fields: Vec::new(),
        }
    }

    /// Fields still at their zero value
    pub fn zero_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| match field {
                Field::CatalogId => self.catalog_id.is_empty(),
                Field::Title => self.title.is_empty(),
                Field::Price => self.price.amount == 0.0,
                Field::Rating => self.rating == 0.0,
                Field::ReviewCount => self.review_count == 0,
                Field::Images => self.images.is_empty(),
                Field::Description => self.description.is_empty(),
                Field::Features => self.features.is_empty(),
                Field::Availability => self.availability.is_empty(),
                Field::Brand => self.brand.is_empty(),
            })
            .collect()
    }

    pub(crate) fn mark_missing(&mut self) {
        self.missing_fields = self
            .zero_fields()
            .into_iter()
            .map(|field| field.as_str().to_string())
            .collect();
    }
}

/// Options that shape parsing but are not selectors
#[derive(Debug, Clone)]
pub struct ParseSettings {
    pub default_currency: String,
    pub placeholder_reviews: bool,
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
            placeholder_reviews: false,
        }
    }
}

/// Parses a product page
///
/// Never fails: each field is extracted independently and any that cannot be
/// read is left at its zero value.
pub fn parse_product(
    html: &str,
    source_url: &str,
    rules: &RuleSet,
    settings: &ParseSettings,
) -> Product {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let mut product = Product::empty(source_url, &settings.default_currency);

    product.catalog_id = catalog_id_from_url(source_url)
        .or_else(|| rules.first(Field::CatalogId, root))
        .unwrap_or_default();

    product.title = rules.first(Field::Title, root).unwrap_or_default();

    if let Some((amount, currency)) = rules.first_parsed(Field::Price, root, priced) {
        product.price.amount = amount;
        if let Some(currency) = currency {
            product.price.currency = currency.to_string();
        }
    }

    product.rating = rules
        .first_parsed(Field::Rating, root, parse_rating)
        .unwrap_or_default();

    product.review_count = rules
        .first_parsed(Field::ReviewCount, root, parse_review_count)
        .unwrap_or_default();

    product.images = resolve_links(&rules.all(Field::Images, root), source_url);
    product.description = rules.first(Field::Description, root).unwrap_or_default();

    let mut features = rules.all(Field::Features, root);
    features.dedup();
    product.features = features;

    product.availability = rules.first(Field::Availability, root).unwrap_or_default();
    product.brand = rules
        .first(Field::Brand, root)
        .map(|text| clean_brand(&text))
        .unwrap_or_default();

    let reviews = extract_reviews(root, rules, settings.placeholder_reviews);
    product.positive_reviews = reviews.positive;
    product.negative_reviews = reviews.negative;
    product.review_source = reviews.source;

    product.mark_missing();
    if !product.missing_fields.is_empty() {
        tracing::debug!(
            "{}: fields left empty: {}",
            source_url,
            product.missing_fields.join(", ")
        );
    }

    product
}

/// Price amount with the currency its symbol names, if any
pub(crate) fn priced(text: &str) -> Option<(f64, Option<&'static str>)> {
    parse_price(text).map(|amount| (amount, detect_currency(text)))
}

/// Makes links absolute against `base`, dropping unusable and repeated ones
pub(crate) fn resolve_links(links: &[String], base: &str) -> Vec<String> {
    let base = Url::parse(base).ok();
    let mut resolved: Vec<String> = Vec::new();

    for link in links {
        if link.starts_with("data:") {
            continue;
        }
        let absolute = match &base {
            Some(base) => base.join(link).map(String::from).ok(),
            None => Url::parse(link).map(String::from).ok(),
        };
        if let Some(absolute) = absolute {
            if !resolved.contains(&absolute) {
                resolved.push(absolute);
            }
        }
    }

    resolved
}

/// Strips byline decoration such as `"Visit the Acme Store"` or `"Brand: Acme"`
fn clean_brand(text: &str) -> String {
    let text = text.trim();
    let text = text.strip_prefix("Brand:").unwrap_or(text).trim();
    let text = text.strip_prefix("Visit the").unwrap_or(text).trim();
    text.strip_suffix("Store").unwrap_or(text).trim().to_string()
}
