use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const START_OF_DAY: NaiveTime = NaiveTime::MIN;

pub const END_OF_DAY: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 59) {
    Some(time) => time,
    None => panic!("23:59:59 is a valid time of day"),
};

/// One calendar entry as scraped from the district page.
///
/// Times are wall-clock local times without a zone attached. Key events
/// always span the whole day.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct EventRecord {
    pub day: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub title: Option<String>,
    pub is_key_event: bool,
}

impl EventRecord {
    pub fn new(
        day: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        title: Option<String>,
    ) -> Result<Self> {
        if end_time < start_time {
            return Err(Error::MalformedDate {
                value: format!("{day} {start_time}-{end_time}"),
                reason: "event ends before it starts".into(),
            });
        }

        Ok(Self {
            day,
            start_time,
            end_time,
            title,
            is_key_event: false,
        })
    }

    pub fn all_day(day: NaiveDate, title: Option<String>) -> Self {
        Self {
            day,
            start_time: START_OF_DAY,
            end_time: END_OF_DAY,
            title,
            is_key_event: false,
        }
    }

    pub fn key_event(day: NaiveDate, title: Option<String>) -> Self {
        Self::all_day(day, title).into_key_event()
    }

    /// Returns the same event flagged as a district key date.
    #[must_use]
    pub fn into_key_event(self) -> Self {
        Self {
            is_key_event: true,
            ..self
        }
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.day.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.day.and_time(self.end_time)
    }

    pub fn is_all_day(&self) -> bool {
        self.start_time == START_OF_DAY && self.end_time == END_OF_DAY
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{} {} {}",
            self.day,
            self.start_time,
            self.end_time,
            if self.is_key_event { "key" } else { "regular" },
            self.title.as_deref().unwrap_or("<untitled>")
        )
    }
}
