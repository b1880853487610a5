//! Summary counters for the dashboard header cards. Recomputed from the live
//! snapshot on every read; "recent" windows are anchored at the supplied
//! evaluation time, never a fixed epoch.

use serde::Serialize;

use crate::store::EntityStore;
use crate::time::MS_PER_DAY;

pub const RECENT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub total_families: usize,
    pub total_members: usize,
    /// Rounded to one decimal; 0.0 when there are no families.
    pub avg_members_per_family: f64,
    /// Families created within the trailing window.
    pub recent_families: usize,
}

pub fn compute(store: &EntityStore, now_ms: i64) -> Statistics {
    compute_with_window(store, now_ms, RECENT_WINDOW_DAYS)
}

pub fn compute_with_window(store: &EntityStore, now_ms: i64, window_days: i64) -> Statistics {
    let total_families = store.families().len();
    let total_members = store.members().len();
    let avg_members_per_family = if total_families == 0 {
        0.0
    } else {
        let avg = total_members as f64 / total_families as f64;
        (avg * 10.0).round() / 10.0
    };
    let cutoff = now_ms - window_days * MS_PER_DAY;
    let recent_families = store
        .families()
        .iter()
        .filter(|f| f.created_at >= cutoff)
        .count();

    Statistics {
        total_families,
        total_members,
        avg_members_per_family,
        recent_families,
    }
}
