use std::collections::btree_map::{BTreeMap, Entry};

use log::debug;

use crate::EventRecord;

/// Combines regular and key events into one record per day, ordered by
/// `(day, start_time)`.
///
/// The first regular event of a day represents it. A key event falling on a
/// represented day flags that representative instead of adding a record; a key
/// event on any other day is kept as is, first one winning.
pub fn merge_events(events: &[EventRecord], key_events: &[EventRecord]) -> Vec<EventRecord> {
    let mut by_day = BTreeMap::new();

    for event in events {
        by_day.entry(event.day).or_insert_with(|| event.clone());
    }

    for key_event in key_events {
        match by_day.entry(key_event.day) {
            Entry::Occupied(mut entry) => {
                debug!("Key event {key_event} marks {}", entry.get());
                let marked = entry.get().clone().into_key_event();
                entry.insert(marked);
            }
            Entry::Vacant(entry) => {
                entry.insert(key_event.clone());
            }
        }
    }

    // one record per day, so day order is also (day, start_time) order
    by_day.into_values().collect()
}
