//! Query Engine
//!
//! Pure functions over an enriched batch: collection extraction, filtering,
//! sorting and page windowing. No I/O happens here.

use serde::Deserialize;
use std::collections::HashSet;
use std::str::FromStr;

use crate::models::EnrichedListing;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CollectionFilter {
    #[default]
    All,
    Contract(String),
}

impl From<&str> for CollectionFilter {
    fn from(value: &str) -> Self {
        match value {
            "" | "all" => CollectionFilter::All,
            contract => CollectionFilter::Contract(contract.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    PriceLow,
    PriceHigh,
    #[default]
    Recent,
}

impl FromStr for SortKey {
    type Err = std::convert::Infallible;

    /// Unknown keys sort by recency.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "price-low" => SortKey::PriceLow,
            "price-high" => SortKey::PriceHigh,
            _ => SortKey::Recent,
        })
    }
}

/// Browse parameters for one page of the enriched batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowseQuery {
    pub collection: String,
    pub search: String,
    pub sort: String,
    pub page: usize,
}

impl Default for BrowseQuery {
    fn default() -> Self {
        Self {
            collection: "all".to_string(),
            search: String::new(),
            sort: "recent".to_string(),
            page: 1,
        }
    }
}

/// One display-ready page plus the figures a browser needs around it.
#[derive(Debug, Clone)]
pub struct ListingsPage {
    pub items: Vec<EnrichedListing>,
    pub page: usize,
    pub page_count: usize,
    pub total_matches: usize,
    pub collections: Vec<String>,
}

/// Unique collection contracts in first-seen order.
pub fn extract_collections(items: &[EnrichedListing]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.listing.nft_contract.as_str()))
        .map(|item| item.listing.nft_contract.clone())
        .collect()
}

pub fn filter(items: &[EnrichedListing], collection: &CollectionFilter, search: &str) -> Vec<EnrichedListing> {
    let needle = search.to_lowercase();

    items
        .iter()
        .filter(|item| match collection {
            CollectionFilter::All => true,
            CollectionFilter::Contract(contract) => item.listing.nft_contract == *contract,
        })
        .filter(|item| {
            search.is_empty()
                || item.metadata.name.to_lowercase().contains(&needle)
                || item.listing.token_id.to_string().contains(search)
        })
        .cloned()
        .collect()
}

/// Stable sort; prices compare as exact 256-bit integers.
pub fn sort(mut items: Vec<EnrichedListing>, key: SortKey) -> Vec<EnrichedListing> {
    match key {
        SortKey::PriceLow => items.sort_by(|a, b| a.listing.price.cmp(&b.listing.price)),
        SortKey::PriceHigh => items.sort_by(|a, b| b.listing.price.cmp(&a.listing.price)),
        SortKey::Recent => items.sort_by(|a, b| b.listing.listed_at.cmp(&a.listing.listed_at)),
    }
    items
}

pub fn page_count(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// 1-indexed page of `page_size` items; out-of-range pages are empty.
pub fn paginate(items: &[EnrichedListing], page: usize, page_size: usize) -> Vec<EnrichedListing> {
    if page == 0 || page_size == 0 {
        return Vec::new();
    }
    let start = match (page - 1).checked_mul(page_size) {
        Some(start) if start < items.len() => start,
        _ => return Vec::new(),
    };
    let end = (start + page_size).min(items.len());
    items[start..end].to_vec()
}

/// Filter, sort and window an enriched batch for display.
pub fn present(items: &[EnrichedListing], query: &BrowseQuery, page_size: usize) -> ListingsPage {
    let collection = CollectionFilter::from(query.collection.as_str());
    let sort_key: SortKey = query.sort.parse().unwrap_or_default();

    let matches = sort(filter(items, &collection, &query.search), sort_key);

    ListingsPage {
        items: paginate(&matches, query.page, page_size),
        page: query.page,
        page_count: page_count(matches.len(), page_size),
        total_matches: matches.len(),
        collections: extract_collections(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Listing, Metadata};
    use ethers::types::U256;

    fn item(contract: &str, token_id: u64, price: U256, listed_at: u64, name: &str) -> EnrichedListing {
        EnrichedListing {
            listing: Listing {
                seller: "0xseller".to_string(),
                nft_contract: contract.to_string(),
                token_id: U256::from(token_id),
                price,
                active: true,
                listed_at,
            },
            metadata: Metadata {
                name: name.to_string(),
                description: String::new(),
                image: String::new(),
            },
            collection_name: "Test".to_string(),
        }
    }

    fn prices(items: &[EnrichedListing]) -> Vec<U256> {
        items.iter().map(|i| i.listing.price).collect()
    }

    #[test]
    fn test_sort_by_price() {
        let items = vec![
            item("0xA", 1, U256::from(5u64), 1, "a"),
            item("0xA", 2, U256::from(1u64), 2, "b"),
            item("0xA", 3, U256::from(3u64), 3, "c"),
        ];

        let low = sort(items.clone(), SortKey::PriceLow);
        assert_eq!(prices(&low), vec![U256::from(1u64), U256::from(3u64), U256::from(5u64)]);

        let high = sort(items, SortKey::PriceHigh);
        assert_eq!(prices(&high), vec![U256::from(5u64), U256::from(3u64), U256::from(1u64)]);
    }

    #[test]
    fn test_sort_prices_beyond_f64_precision() {
        // Adjacent values that collapse to the same f64.
        let base = U256::exp10(30);
        let items = vec![
            item("0xA", 1, base + U256::one(), 1, "a"),
            item("0xA", 2, base, 2, "b"),
        ];

        let low = sort(items, SortKey::PriceLow);
        assert_eq!(low[0].listing.token_id, U256::from(2u64));
    }

    #[test]
    fn test_sort_recent_is_default_and_stable() {
        let items = vec![
            item("0xA", 1, U256::one(), 10, "a"),
            item("0xA", 2, U256::one(), 30, "b"),
            item("0xA", 3, U256::one(), 10, "c"),
        ];

        let key: SortKey = "something-else".parse().unwrap();
        assert_eq!(key, SortKey::Recent);

        let sorted = sort(items, key);
        let ids: Vec<u64> = sorted.iter().map(|i| i.listing.token_id.as_u64()).collect();
        assert_eq!(ids, vec![2, 1, 3]);

        let by_price = sort(sorted, SortKey::PriceLow);
        let ids: Vec<u64> = by_price.iter().map(|i| i.listing.token_id.as_u64()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_search_matches_name_case_insensitively() {
        let items = vec![
            item("0xA", 1, U256::one(), 1, "Cool Ape"),
            item("0xA", 2, U256::one(), 1, "Bored Cat"),
        ];

        let found = filter(&items, &CollectionFilter::All, "ape");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].metadata.name, "Cool Ape");
    }

    #[test]
    fn test_search_matches_token_id() {
        let items = vec![
            item("0xA", 77, U256::one(), 1, "Unnamed NFT"),
            item("0xA", 5, U256::one(), 1, "Unnamed NFT"),
        ];

        let found = filter(&items, &CollectionFilter::All, "77");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].listing.token_id, U256::from(77u64));
    }

    #[test]
    fn test_collection_filter_exact_match() {
        let items = vec![
            item("0xAbC", 1, U256::one(), 1, "a"),
            item("0xabc", 2, U256::one(), 1, "b"),
            item("0xDeF", 3, U256::one(), 1, "c"),
        ];

        assert_eq!(filter(&items, &CollectionFilter::from("all"), "").len(), 3);

        let only = filter(&items, &CollectionFilter::from("0xAbC"), "");
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].listing.token_id, U256::one());
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let items = vec![
            item("0xA", 1, U256::one(), 1, "Cool Ape"),
            item("0xB", 2, U256::one(), 1, "Cool Ape"),
        ];

        let found = filter(&items, &CollectionFilter::from("0xB"), "ape");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].listing.nft_contract, "0xB");
    }

    #[test]
    fn test_extract_collections_first_seen_order() {
        let items = vec![
            item("0xB", 1, U256::one(), 1, "a"),
            item("0xA", 2, U256::one(), 1, "b"),
            item("0xB", 3, U256::one(), 1, "c"),
        ];
        assert_eq!(extract_collections(&items), vec!["0xB".to_string(), "0xA".to_string()]);
    }

    #[test]
    fn test_pagination_math() {
        let items: Vec<_> = (0..45).map(|i| item("0xA", i, U256::one(), i, "x")).collect();

        assert_eq!(page_count(items.len(), 20), 3);
        assert_eq!(paginate(&items, 1, 20).len(), 20);
        assert_eq!(paginate(&items, 3, 20).len(), 5);
        assert!(paginate(&items, 4, 20).is_empty());
        assert!(paginate(&items, 0, 20).is_empty());
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(10, 0), 0);
    }

    #[test]
    fn test_present_combines_steps() {
        let items = vec![
            item("0xA", 1, U256::from(5u64), 1, "Cool Ape"),
            item("0xB", 2, U256::from(1u64), 2, "Cool Ape"),
            item("0xA", 3, U256::from(3u64), 3, "Cat"),
        ];
        let query = BrowseQuery {
            search: "ape".to_string(),
            sort: "price-low".to_string(),
            ..Default::default()
        };

        let page = present(&items, &query, 1);
        assert_eq!(page.total_matches, 2);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].listing.token_id, U256::from(2u64));
        assert_eq!(page.collections, vec!["0xA".to_string(), "0xB".to_string()]);
    }
}
