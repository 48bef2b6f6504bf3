use crate::record::{Entity, matches_search};

use super::state::ViewState;

/// What the list surface should show instead of, or alongside, rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// No load has completed yet.
    Loading,
    /// Every load so far has failed; there is nothing to show.
    Unavailable,
    /// The store confirmed an empty collection.
    Empty,
    /// Records exist but none pass the search and filters.
    NoMatches,
    /// At least one row is visible.
    Rows,
}

/// One page of the filtered collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection<E> {
    /// Records on the current page, in collection order.
    pub rows: Vec<E>,
    /// Current page after clamping, 1-based.
    pub page: usize,
    /// `max(1, ceil(filtered_count / page_size))`.
    pub total_pages: usize,
    /// Records passing search and filters.
    pub filtered_count: usize,
    /// Records in the loaded collection.
    pub total_count: usize,
}

/// Positions in `records` that pass the search text and every filter.
pub fn filtered_indices<E: Entity>(records: &[E], view: &ViewState) -> Vec<usize> {
    let needle = view.search().to_lowercase();
    records
        .iter()
        .enumerate()
        .filter(|(_, rec)| matches_search(*rec, &needle))
        .filter(|(_, rec)| {
            view.filters()
                .iter()
                .all(|(field, value)| rec.field(field).as_deref() == Some(value.as_str()))
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// `max(1, ceil(count / page_size))`.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

/// Recomputes the current page and clamps the view's page index in place.
pub fn project<E: Entity>(records: &[E], view: &mut ViewState) -> Projection<E> {
    let filtered = filtered_indices(records, view);
    let total_pages = total_pages(filtered.len(), view.page_size());
    let page = view.clamp_page(total_pages);

    let rows = filtered
        .iter()
        .skip((page - 1) * view.page_size())
        .take(view.page_size())
        .map(|idx| records[*idx].clone())
        .collect();

    Projection {
        rows,
        page,
        total_pages,
        filtered_count: filtered.len(),
        total_count: records.len(),
    }
}

/// Count of filtered records per distinct value of `field`, in first-seen
/// order. Records without the field are skipped.
pub fn tally<E: Entity>(records: &[E], view: &ViewState, field: &str) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = Vec::new();
    for idx in filtered_indices(records, view) {
        let Some(value) = records[idx].field(field) else {
            continue;
        };
        match out.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => out.push((value, 1)),
        }
    }
    out
}
