use crate::model::{Track, TrackId};

/// Which base ordering the projection starts from.
#[derive(Debug, Clone, Copy)]
pub enum Order<'a> {
    Catalog,
    Shuffled(&'a [TrackId]),
}

/// Derives the visible/playable list from the catalog: base order (catalog
/// or shuffle permutation) filtered by the search term. Always a full
/// recomputation; callers must never patch the result in place.
pub fn project(catalog: &[Track], order: Order<'_>, search: &str) -> Vec<TrackId> {
    let base: Vec<TrackId> = match order {
        Order::Catalog => (0..catalog.len()).collect(),
        Order::Shuffled(permutation) => permutation
            .iter()
            .copied()
            .filter(|id| *id < catalog.len())
            .collect(),
    };

    if search.is_empty() {
        return base;
    }

    base.into_iter()
        .filter(|id| matches(&catalog[*id], search))
        .collect()
}

/// Case-insensitive substring match against title OR artist.
pub fn matches(track: &Track, search: &str) -> bool {
    let needle = search.to_lowercase();
    if track.title.to_lowercase().contains(&needle) {
        return true;
    }
    track
        .artist
        .as_deref()
        .is_some_and(|artist| artist.to_lowercase().contains(&needle))
}

/// Re-derives the active position from the current track's identity, never
/// from a previously cached numeric index.
pub fn active_position(view: &[TrackId], current: Option<TrackId>) -> Option<usize> {
    let current = current?;
    view.iter().position(|id| *id == current)
}
