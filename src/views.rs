//! Read-only projections of the family collection: search, sort, paginate.
//! Pure over the snapshot they are handed; `ViewCache` memoizes the
//! filter+sort result keyed on the store revision and the view parameters.

use serde::{Deserialize, Serialize};

use crate::model::Family;
use crate::store::EntityStore;

/// Families shown per dashboard page.
pub const DEFAULT_PAGE_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Members,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One page of the filtered, sorted family list plus its pagination info.
#[derive(Debug, Clone, Serialize)]
pub struct FamilyPage {
    pub families: Vec<Family>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
}

/// Case-insensitive substring match on the family name. A blank query
/// returns the input unchanged, in its original order.
pub fn search(families: &[Family], query: &str) -> Vec<Family> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return families.to_vec();
    }
    families
        .iter()
        .filter(|f| f.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Stable sort; equal keys keep their original collection order, which makes
/// repeated identical sorts idempotent.
pub fn sort(
    mut families: Vec<Family>,
    field: SortField,
    order: SortOrder,
    member_count: impl Fn(&str) -> usize,
) -> Vec<Family> {
    families.sort_by(|a, b| {
        let cmp = match field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Members => member_count(&a.id).cmp(&member_count(&b.id)),
            SortField::Date => a.created_at.cmp(&b.created_at),
        };
        match order {
            SortOrder::Asc => cmp,
            SortOrder::Desc => cmp.reverse(),
        }
    });
    families
}

/// The slice `[(page-1)*size, page*size)`. Pages are 1-based; callers clamp
/// out-of-range pages with [`clamp_page`] before calling.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Vec<T> {
    let start = (page.saturating_sub(1)) * page_size;
    items
        .iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect()
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}

/// Clamps a requested page into `[1, total_pages]` (1 when the list is empty).
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.max(1).min(total_pages.max(1))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewKey {
    revision: u64,
    query: String,
    field: SortField,
    order: SortOrder,
}

/// Memoizes the filtered+sorted family list. Any store mutation bumps the
/// revision and invalidates the cached rows on the next read.
#[derive(Debug, Default)]
pub struct ViewCache {
    key: Option<ViewKey>,
    rows: Vec<Family>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filtered_sorted(
        &mut self,
        store: &EntityStore,
        query: &str,
        field: SortField,
        order: SortOrder,
    ) -> &[Family] {
        let key = ViewKey {
            revision: store.revision(),
            query: query.to_string(),
            field,
            order,
        };
        if self.key.as_ref() != Some(&key) {
            let filtered = search(store.families(), query);
            self.rows = sort(filtered, field, order, |id| store.member_count_of(id));
            self.key = Some(key);
        }
        &self.rows
    }
}
