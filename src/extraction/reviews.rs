//! Review excerpt extraction and sentiment bucketing

use crate::extraction::fields::parse_rating;
use crate::extraction::rules::{first_of, RuleSet};
use scraper::ElementRef;
use serde::{Deserialize, Serialize};

pub const MAX_POSITIVE: usize = 5;
pub const MAX_NEGATIVE: usize = 3;

const PLACEHOLDER_POSITIVE: &[&str] = &[
    "Good quality for the price",
    "Works as described",
    "Fast delivery",
];

const PLACEHOLDER_NEGATIVE: &[&str] = &["Some buyers reported minor issues"];

/// Where a product's review excerpts came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSource {
    /// Taken from review blocks on the page
    Extracted,
    /// Generic remarks substituted because the page had none
    Placeholder,
    /// The page had no review blocks and substitution is disabled
    #[default]
    NotFound,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reviews {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub source: ReviewSource,
}

/// Sentiment of a review from its star value
///
/// Four stars or more is positive, two or fewer negative. Three stars and
/// unreadable values count as positive.
pub fn is_negative(stars: Option<f64>) -> bool {
    matches!(stars, Some(value) if value <= 2.0)
}

/// Collects review excerpts from the first region that holds any
pub fn extract_reviews(root: ElementRef<'_>, rules: &RuleSet, placeholders: bool) -> Reviews {
    for region in rules.review_regions() {
        let mut reviews = Reviews {
            source: ReviewSource::Extracted,
            ..Reviews::default()
        };
        let mut found = false;

        for block in region.blocks.elements(root) {
            let Some(text) = first_of(&region.text, block) else {
                continue;
            };
            found = true;

            let stars = first_of(&region.stars, block).and_then(|s| parse_rating(&s));
            let (bucket, cap) = if is_negative(stars) {
                (&mut reviews.negative, MAX_NEGATIVE)
            } else {
                (&mut reviews.positive, MAX_POSITIVE)
            };

            if bucket.len() < cap && !bucket.contains(&text) {
                bucket.push(text);
            }

            if reviews.positive.len() >= MAX_POSITIVE && reviews.negative.len() >= MAX_NEGATIVE {
                break;
            }
        }

        if found {
            tracing::debug!(
                "Extracted {} positive / {} negative review(s) via {}",
                reviews.positive.len(),
                reviews.negative.len(),
                region.blocks.as_str()
            );
            return reviews;
        }
    }

    if placeholders {
        tracing::debug!("No review blocks found, substituting placeholders");
        Reviews {
            positive: PLACEHOLDER_POSITIVE.iter().map(ToString::to_string).collect(),
            negative: PLACEHOLDER_NEGATIVE.iter().map(ToString::to_string).collect(),
            source: ReviewSource::Placeholder,
        }
    } else {
        Reviews::default()
    }
}
