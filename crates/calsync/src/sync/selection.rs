//! Calendar selection merging
//!
//! A routine list refresh must not silently re-enable calendars the
//! user deliberately deselected, so `selected` is the one field carried
//! forward from the previous list.

use crate::models::CalendarListEntry;

/// Merge a freshly fetched calendar list with the previously stored
/// one. Order-preserving on `latest`; every field except `selected`
/// takes the latest provider value. Calendars no longer present in
/// `latest` are dropped.
pub fn merge_selection(
    previous: &[CalendarListEntry],
    latest: Vec<CalendarListEntry>,
) -> Vec<CalendarListEntry> {
    latest
        .into_iter()
        .map(|mut entry| {
            if let Some(prior) = previous.iter().find(|p| p.id == entry.id) {
                entry.selected = prior.selected;
            }
            entry
        })
        .collect()
}
