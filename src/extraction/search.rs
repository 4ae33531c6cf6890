//! Search listing pages

use crate::extraction::fields::{
    catalog_id_from_url, normalize_query, parse_rating, parse_review_count,
};
use crate::extraction::product::{priced, resolve_links, ParseSettings, Product};
use crate::extraction::rules::{first_of, first_parsed_of, RuleSet};
use crate::{ScrapeError, ScrapeResult};
use scraper::{ElementRef, Html};
use url::Url;

/// Builds the listing URL for a query and a 1-based page number
pub fn build_search_url(base: &Url, query: &str, page: u32) -> ScrapeResult<Url> {
    let query = normalize_query(query);
    if query.is_empty() {
        return Err(ScrapeError::InvalidRequest("Search query is empty".to_string()));
    }
    if page == 0 {
        return Err(ScrapeError::InvalidRequest(
            "Page numbers start at 1".to_string(),
        ));
    }

    let mut url = base
        .join("/s")
        .map_err(|e| ScrapeError::InvalidRequest(format!("Invalid base URL: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("k", &query)
        .append_pair("page", &page.to_string());
    Ok(url)
}

/// Parses result cards from a listing page
///
/// A card is kept only when both its catalog id and a non-empty title were
/// found.
pub fn parse_search_results(
    html: &str,
    base: &Url,
    rules: &RuleSet,
    settings: &ParseSettings,
) -> Vec<Product> {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let card_rules = rules.search_cards();

    let cards: Vec<ElementRef<'_>> = card_rules
        .cards
        .iter()
        .map(|rule| rule.elements(root).collect::<Vec<_>>())
        .find(|cards| !cards.is_empty())
        .unwrap_or_default();

    let mut products = Vec::new();
    let mut skipped = 0;

    for card in cards {
        let link = first_of(&card_rules.link, card)
            .and_then(|href| resolve_links(&[href], base.as_str()).into_iter().next());

        let catalog_id = card
            .value()
            .attr("data-asin")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| first_of(&card_rules.catalog_id, card))
            .or_else(|| link.as_deref().and_then(catalog_id_from_url));
        let title = first_of(&card_rules.title, card);

        let (Some(catalog_id), Some(title)) = (catalog_id, title) else {
            skipped += 1;
            continue;
        };

        let source_url = link.unwrap_or_else(|| {
            base.join(&format!("/dp/{}", catalog_id))
                .map(String::from)
                .unwrap_or_else(|_| base.to_string())
        });

        let mut product = Product::empty(&source_url, &settings.default_currency);
        product.catalog_id = catalog_id;
        product.title = title;

        if let Some((amount, currency)) = first_parsed_of(&card_rules.price, card, priced) {
            product.price.amount = amount;
            if let Some(currency) = currency {
                product.price.currency = currency.to_string();
            }
        }
        product.rating =
            first_parsed_of(&card_rules.rating, card, parse_rating).unwrap_or_default();
        product.review_count =
            first_parsed_of(&card_rules.review_count, card, parse_review_count).unwrap_or_default();
        product.images = first_of(&card_rules.image, card)
            .map(|src| resolve_links(&[src], base.as_str()))
            .unwrap_or_default();

        product.mark_missing();
        products.push(product);
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} result card(s) without id or title", skipped);
    }

    products
}
