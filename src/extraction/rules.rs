//! Pluggable extraction rules
//!
//! Each product field maps to an ordered chain of selector rules; the first
//! rule that yields a non-empty value wins. The marketplace markup lives only
//! here, so a layout change means swapping rules, not touching the engine.

use crate::extraction::fields::clean_text;
use scraper::{ElementRef, Selector};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Rule construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Product fields that are driven by selector chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CatalogId,
    Title,
    Price,
    Rating,
    ReviewCount,
    Images,
    Description,
    Features,
    Availability,
    Brand,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::CatalogId,
        Field::Title,
        Field::Price,
        Field::Rating,
        Field::ReviewCount,
        Field::Images,
        Field::Description,
        Field::Features,
        Field::Availability,
        Field::Brand,
    ];

    /// Looks a field up by its configuration name (`review-count` or `review_count`)
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|f| f.as_str() == normalized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::CatalogId => "catalog_id",
            Field::Title => "title",
            Field::Price => "price",
            Field::Rating => "rating",
            Field::ReviewCount => "review_count",
            Field::Images => "images",
            Field::Description => "description",
            Field::Features => "features",
            Field::Availability => "availability",
            Field::Brand => "brand",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural selector, reading either element text or an attribute
///
/// Written as `"css"` for text or `"css@attr"` for an attribute value.
#[derive(Debug, Clone)]
pub struct SelectorRule {
    source: String,
    selector: Selector,
    attr: Option<String>,
}

impl SelectorRule {
    pub fn parse(rule: &str) -> Result<Self, RuleError> {
        let rule = rule.trim();
        let (css, attr) = match rule.rsplit_once('@') {
            Some((css, attr)) if is_attr_name(attr) => (css.trim(), Some(attr.to_string())),
            _ => (rule, None),
        };

        let selector = Selector::parse(css).map_err(|e| RuleError::InvalidSelector {
            selector: rule.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: rule.to_string(),
            selector,
            attr,
        })
    }

    /// The rule as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// First non-empty value among matching elements under `scope`
    pub fn extract(&self, scope: ElementRef<'_>) -> Option<String> {
        self.values(scope).next()
    }

    /// Every non-empty value among matching elements under `scope`
    pub fn extract_all(&self, scope: ElementRef<'_>) -> Vec<String> {
        self.values(scope).collect()
    }

    /// Lazily yields the non-empty values of matching elements, in document order
    pub fn values<'a>(&'a self, scope: ElementRef<'a>) -> impl Iterator<Item = String> + 'a {
        scope
            .select(&self.selector)
            .filter_map(move |element| self.read(element))
    }

    /// Matching elements themselves, for rules that delimit regions
    pub fn elements<'a>(
        &'a self,
        scope: ElementRef<'a>,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        scope.select(&self.selector)
    }

    fn read(&self, element: ElementRef<'_>) -> Option<String> {
        let value = match &self.attr {
            Some(attr) => element.value().attr(attr)?.trim().to_string(),
            None => clean_text(&element.text().collect::<String>()),
        };
        (!value.is_empty()).then_some(value)
    }
}

fn is_attr_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Compiles built-in rules, dropping any the selector engine rejects
fn compile(rules: &[&str]) -> Vec<SelectorRule> {
    rules
        .iter()
        .filter_map(|rule| match SelectorRule::parse(rule) {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::warn!("Skipping built-in rule: {}", e);
                None
            }
        })
        .collect()
}

/// A structural region holding review blocks
///
/// `blocks` delimits each review; `text` and `stars` are evaluated inside a
/// block.
#[derive(Debug, Clone)]
pub struct ReviewRegion {
    pub blocks: SelectorRule,
    pub text: Vec<SelectorRule>,
    pub stars: Vec<SelectorRule>,
}

/// Selectors for one result card on a listing page
#[derive(Debug, Clone)]
pub struct SearchCardRules {
    /// Card containers, tried in order until one matches anything
    pub cards: Vec<SelectorRule>,
    /// Consulted only when the card element carries no `data-asin` itself
    pub catalog_id: Vec<SelectorRule>,
    pub title: Vec<SelectorRule>,
    pub price: Vec<SelectorRule>,
    pub rating: Vec<SelectorRule>,
    pub review_count: Vec<SelectorRule>,
    pub image: Vec<SelectorRule>,
    pub link: Vec<SelectorRule>,
}

/// Ordered selector chains for every field, review regions and search cards
#[derive(Debug, Clone)]
pub struct RuleSet {
    chains: HashMap<Field, Vec<SelectorRule>>,
    review_regions: Vec<ReviewRegion>,
    search_cards: SearchCardRules,
}

impl Default for RuleSet {
    fn default() -> Self {
        let mut chains = HashMap::new();
        chains.insert(
            Field::CatalogId,
            compile(&[
                "input#ASIN@value",
                "input[name='ASIN']@value",
                "div[data-asin]@data-asin",
            ]),
        );
        chains.insert(
            Field::Title,
            compile(&["#productTitle", "#title", "h1 span", "title"]),
        );
        chains.insert(
            Field::Price,
            compile(&[
                "#corePrice_feature_div .a-price .a-offscreen",
                ".a-price .a-offscreen",
                "#priceblock_ourprice",
                "#priceblock_dealprice",
                "span.a-color-price",
            ]),
        );
        chains.insert(
            Field::Rating,
            compile(&[
                "#acrPopover@title",
                "#acrPopover span.a-icon-alt",
                "span.a-icon-alt",
            ]),
        );
        chains.insert(
            Field::ReviewCount,
            compile(&["#acrCustomerReviewText", "#acrCustomerReviewLink span"]),
        );
        chains.insert(
            Field::Images,
            compile(&[
                "#landingImage@data-old-hires",
                "#landingImage@src",
                "#imgTagWrapperId img@src",
                "#altImages img@src",
            ]),
        );
        chains.insert(
            Field::Description,
            compile(&[
                "#productDescription",
                "#bookDescription_feature_div",
                "meta[name='description']@content",
            ]),
        );
        chains.insert(
            Field::Features,
            compile(&[
                "#feature-bullets li span.a-list-item",
                "#feature-bullets li",
            ]),
        );
        chains.insert(
            Field::Availability,
            compile(&["#availability span", "#availability"]),
        );
        chains.insert(
            Field::Brand,
            compile(&["#bylineInfo", "a#brand", "tr.po-brand td.po-break-word"]),
        );

        let review_regions = [
            (
                "div[data-hook='review']",
                &["span[data-hook='review-body']"][..],
                &[
                    "i[data-hook='review-star-rating'] span",
                    "i[data-hook='cmps-review-star-rating'] span",
                ][..],
            ),
            (
                "#cm-cr-dp-review-list li",
                &[".review-text-content", ".review-text"][..],
                &["i.review-rating span", ".review-rating"][..],
            ),
            (
                "div.review",
                &[".review-text", "p"][..],
                &[".review-rating", ".a-icon-alt"][..],
            ),
        ]
        .into_iter()
        .filter_map(|(blocks, text, stars)| {
            Some(ReviewRegion {
                blocks: SelectorRule::parse(blocks).ok()?,
                text: compile(text),
                stars: compile(stars),
            })
        })
        .collect();

        let search_cards = SearchCardRules {
            cards: compile(&[
                "div[data-component-type='s-search-result']",
                "div.s-result-item[data-asin]",
            ]),
            catalog_id: compile(&["[data-asin]@data-asin"]),
            title: compile(&["h2 a span", "h2 span", "h2"]),
            price: compile(&[".a-price .a-offscreen", "span.a-color-price"]),
            rating: compile(&["span.a-icon-alt", "i.a-icon-star-small span"]),
            review_count: compile(&[
                "span.a-size-base.s-underline-text",
                "a[href*='customerReviews'] span",
            ]),
            image: compile(&["img.s-image@src", "img@src"]),
            link: compile(&["h2 a@href", "a.a-link-normal@href"]),
        };

        Self {
            chains,
            review_regions,
            search_cards,
        }
    }
}

impl RuleSet {
    /// Replaces the chains named in `overrides`, keeping the rest built in
    pub fn with_overrides(
        mut self,
        overrides: &HashMap<String, Vec<String>>,
    ) -> Result<Self, RuleError> {
        for (name, rules) in overrides {
            let field =
                Field::from_name(name).ok_or_else(|| RuleError::UnknownField(name.clone()))?;
            let chain = rules
                .iter()
                .map(|rule| SelectorRule::parse(rule))
                .collect::<Result<Vec<_>, _>>()?;

            tracing::debug!("Overriding {} rules with {} selector(s)", field, chain.len());
            self.chains.insert(field, chain);
        }
        Ok(self)
    }

    pub fn chain(&self, field: Field) -> &[SelectorRule] {
        self.chains.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value produced by the field's chain
    pub fn first(&self, field: Field, scope: ElementRef<'_>) -> Option<String> {
        let value = first_of(self.chain(field), scope);
        if value.is_none() {
            tracing::debug!("No rule matched field {}", field);
        }
        value
    }

    /// First value from the field's chain that `parse` accepts
    ///
    /// Text that fails to parse moves on to the next match, then the next rule.
    pub fn first_parsed<T, F>(&self, field: Field, scope: ElementRef<'_>, parse: F) -> Option<T>
    where
        F: Fn(&str) -> Option<T>,
    {
        let value = first_parsed_of(self.chain(field), scope, parse);
        if value.is_none() {
            tracing::debug!("No rule produced a usable {}", field);
        }
        value
    }

    /// All values from the first rule in the field's chain that yields any
    pub fn all(&self, field: Field, scope: ElementRef<'_>) -> Vec<String> {
        self.chain(field)
            .iter()
            .map(|rule| rule.extract_all(scope))
            .find(|values| !values.is_empty())
            .unwrap_or_default()
    }

    pub fn review_regions(&self) -> &[ReviewRegion] {
        &self.review_regions
    }

    pub fn search_cards(&self) -> &SearchCardRules {
        &self.search_cards
    }
}

/// First value produced by an ordered chain
pub fn first_of(chain: &[SelectorRule], scope: ElementRef<'_>) -> Option<String> {
    chain.iter().find_map(|rule| rule.extract(scope))
}

/// First value from an ordered chain that `parse` accepts
///
/// Every match of a rule is tried before moving on to the next rule.
pub fn first_parsed_of<T, F>(chain: &[SelectorRule], scope: ElementRef<'_>, parse: F) -> Option<T>
where
    F: Fn(&str) -> Option<T>,
{
    chain
        .iter()
        .find_map(|rule| rule.values(scope).find_map(|text| parse(&text)))
}
