mod collection;
mod error;
mod merge;
mod parser;
mod structs;

#[cfg(feature = "ics")]
mod ics;

pub use collection::EventCollections;
pub use error::{Error, Result};
pub use merge::merge_events;
pub use parser::{parse_timestamp, Fragment, DAY_BOX, KEY_EVENT};
pub use structs::{EventRecord, END_OF_DAY, START_OF_DAY};

#[cfg(feature = "ics")]
pub use crate::ics::{file_name, to_ics, CalendarOptions};
