//! Resolving an assembled feed into catalog items.

use catalog::{Catalog, Item};
use serde::Serialize;
use sources::{Candidate, CandidateSource};

/// One entry of a user's feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub item: Item,
    /// "click", "preference" or "popular"
    pub source: &'static str,
    pub explanation: String,
}

impl Recommendation {
    fn from_candidate(item: &Item, candidate: &Candidate) -> Self {
        let explanation = match candidate.source {
            CandidateSource::ClickAffinity => format!(
                "You viewed this {} times",
                candidate.metadata.click_count.unwrap_or_default()
            ),
            CandidateSource::Preference if !candidate.metadata.matched_tags.is_empty() => {
                format!("Matches your interests: {}", candidate.metadata.matched_tags.join(", "))
            }
            CandidateSource::Preference if candidate.metadata.matched_category => {
                format!("Popular in {}", item.category)
            }
            CandidateSource::Preference => "Highly rated pick".to_string(),
            CandidateSource::Popularity => format!("Top rated ({:.1})", item.rating),
        };

        Self {
            item: item.clone(),
            source: candidate.source.as_str(),
            explanation,
        }
    }
}

/// Look up feed candidates in the snapshot, keeping feed order. Ids the
/// snapshot no longer holds are skipped.
pub fn resolve_feed(catalog: &Catalog, feed: &[Candidate]) -> Vec<Recommendation> {
    feed.iter()
        .filter_map(|candidate| {
            catalog
                .get_item(candidate.item_id)
                .map(|item| Recommendation::from_candidate(item, candidate))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Category;

    #[test]
    fn test_resolve_keeps_order_and_explains() {
        let catalog = Catalog::from_items(vec![
            Item::new(1, "Hot Pot", Category::Food, 80.0).with_tags(["spicy"]),
            Item::new(2, "Lake Inn", Category::Hotel, 300.0).with_rating(4.6),
        ]);

        let mut clicked = Candidate::new(2, CandidateSource::ClickAffinity, 4.0);
        clicked.metadata.click_count = Some(4);
        let mut preferred = Candidate::new(1, CandidateSource::Preference, 0.0);
        preferred.metadata.matched_tags = vec!["spicy".to_string()];
        let gone = Candidate::new(99, CandidateSource::Popularity, 0.0);

        let feed = resolve_feed(&catalog, &[clicked, gone, preferred]);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].item.id, 2);
        assert_eq!(feed[0].source, "click");
        assert_eq!(feed[0].explanation, "You viewed this 4 times");
        assert_eq!(feed[1].explanation, "Matches your interests: spicy");
    }
}
