use crate::{merge_events, EventRecord};

/// Everything scraped in one run, in extraction order.
///
/// Nothing is de-duplicated here: a day cell seen in two overlapping month
/// views is recorded twice and left for [`merge_events`] to resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCollections {
    pub events: Vec<EventRecord>,
    pub key_events: Vec<EventRecord>,
}

impl EventCollections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends regular events and returns how many were added.
    pub fn push_events<I: IntoIterator<Item = EventRecord>>(&mut self, events: I) -> usize {
        let before = self.events.len();
        self.events.extend(events);
        self.events.len() - before
    }

    /// Appends key events and returns how many were added.
    pub fn push_key_events<I: IntoIterator<Item = EventRecord>>(&mut self, key_events: I) -> usize {
        let before = self.key_events.len();
        self.key_events.extend(key_events);
        self.key_events.len() - before
    }

    pub fn len(&self) -> usize {
        self.events.len() + self.key_events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.key_events.is_empty()
    }

    #[must_use]
    pub fn merge(&self) -> Vec<EventRecord> {
        merge_events(&self.events, &self.key_events)
    }
}
