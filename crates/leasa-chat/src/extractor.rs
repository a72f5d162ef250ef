//! Recommendation extraction from completion text.
//!
//! Resolves cited listing ids against the catalog snapshot of the current
//! turn. The extractor is the only place that decides which listings a
//! tenant is shown: ids missing from the catalog are dropped here.

use std::collections::HashSet;

use leasa_core::types::Listing;

use crate::parser::{BracketCitationParser, CitationParser, Segment};

/// Result of running the extractor over one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Response text with citations rewritten for display.
    pub cleaned_text: String,
    /// Cited listings that exist in the catalog, in order of first citation.
    pub recommendations: Vec<Listing>,
    /// Cited ids with no catalog match.
    pub unresolved: Vec<String>,
}

/// Extracts the recommendation set from model output.
pub struct RecommendationExtractor<P = BracketCitationParser> {
    parser: P,
}

impl Default for RecommendationExtractor<BracketCitationParser> {
    fn default() -> Self {
        Self::new(BracketCitationParser)
    }
}

impl<P: CitationParser> RecommendationExtractor<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    /// Parse `response_text`, resolve citations against `catalog` and
    /// rewrite the markers.
    ///
    /// Must run exactly once per response: the rewritten text is no longer
    /// machine-parseable.
    pub fn extract(&self, response_text: &str, catalog: &[Listing]) -> Extraction {
        let segments = self.parser.parse(response_text);

        let mut cleaned_text = String::with_capacity(response_text.len());
        let mut seen: HashSet<&str> = HashSet::new();
        let mut recommendations = Vec::new();
        let mut unresolved = Vec::new();

        for segment in &segments {
            self.parser.render(segment, &mut cleaned_text);

            let Segment::Citation { id, .. } = segment else {
                continue;
            };
            if !seen.insert(*id) {
                continue;
            }
            match catalog.iter().find(|listing| listing.id == *id) {
                Some(listing) => recommendations.push(listing.clone()),
                None => {
                    tracing::debug!(listing_id = %id, "Cited listing not in catalog; dropped");
                    unresolved.push((*id).to_string());
                }
            }
        }

        Extraction {
            cleaned_text,
            recommendations,
            unresolved,
        }
    }
}
