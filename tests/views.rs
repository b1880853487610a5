use proptest::prelude::*;

use kanisa::views::{clamp_page, paginate, search, sort, total_pages};
use kanisa::{Family, SortField, SortOrder};

fn family(id: usize, name: &str, created_at: i64) -> Family {
    Family {
        id: format!("fam-{id}"),
        name: name.to_string(),
        parish: None,
        province: None,
        subgroup: None,
        created_at,
    }
}

fn arb_families() -> impl Strategy<Value = Vec<Family>> {
    prop::collection::vec(("[A-Za-z ]{0,12}", 0i64..1_000_000), 0..40).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (name, created_at))| family(i, &name, created_at))
            .collect()
    })
}

proptest! {
    #[test]
    fn pagination_pages_reconstruct_the_input(families in arb_families(), page_size in 1usize..10) {
        let pages = total_pages(families.len(), page_size);
        let mut reassembled = Vec::new();
        for page in 1..=pages {
            reassembled.extend(paginate(&families, page, page_size));
        }
        prop_assert_eq!(reassembled, families);
    }

    #[test]
    fn sort_is_idempotent(families in arb_families()) {
        let once = sort(families, SortField::Name, SortOrder::Asc, |_| 0);
        let twice = sort(once.clone(), SortField::Name, SortOrder::Asc, |_| 0);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn blank_search_is_identity(families in arb_families()) {
        prop_assert_eq!(search(&families, ""), families);
    }

    #[test]
    fn search_results_are_a_subsequence(families in arb_families(), query in "[a-z]{1,4}") {
        let hits = search(&families, &query);
        let needle = query.to_lowercase();
        for hit in &hits {
            prop_assert!(hit.name.to_lowercase().contains(&needle));
        }
        // Order of survivors matches the input order.
        let ids: Vec<_> = families
            .iter()
            .filter(|f| f.name.to_lowercase().contains(&needle))
            .map(|f| f.id.clone())
            .collect();
        let hit_ids: Vec<_> = hits.iter().map(|f| f.id.clone()).collect();
        prop_assert_eq!(hit_ids, ids);
    }

    #[test]
    fn clamped_page_is_always_in_range(page in 0usize..100, items in 0usize..50, page_size in 1usize..10) {
        let pages = total_pages(items, page_size);
        let clamped = clamp_page(page, pages);
        prop_assert!(clamped >= 1);
        prop_assert!(clamped <= pages.max(1));
    }
}

#[test]
fn desc_sort_reverses_asc_for_distinct_keys() {
    let families = vec![
        family(1, "Alpha", 1),
        family(2, "Beta", 2),
        family(3, "Gamma", 3),
    ];
    let asc = sort(families.clone(), SortField::Date, SortOrder::Asc, |_| 0);
    let mut desc = sort(families, SortField::Date, SortOrder::Desc, |_| 0);
    desc.reverse();
    assert_eq!(asc, desc);
}
