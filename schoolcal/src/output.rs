use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use schoolcal_parser::{file_name, to_ics, CalendarOptions, EventCollections};

/// Merges `collections` and writes the resulting calendar.
///
/// The file goes to `output` when given, otherwise to a name derived from the
/// covered years inside `dir`. Nothing is written when there are no events.
pub fn write_calendar(
    collections: &EventCollections,
    options: &CalendarOptions,
    output: Option<&Path>,
    dir: &Path,
    stamp: DateTime<Utc>,
) -> Result<PathBuf> {
    let events = collections.merge();
    let icalendar = to_ics(&events, options, stamp)?;

    let path = match output {
        Some(output) => output.to_path_buf(),
        None => dir.join(file_name(&events, options)?),
    };

    fs::write(&path, icalendar.to_string())
        .with_context(|| format!("Failed to write calendar to {}", path.display()))?;

    let key_events = events.iter().filter(|event| event.is_key_event).count();
    info!("Calendar generated: {}", path.display());
    info!("Total events: {}, key events: {key_events}", events.len());

    Ok(path)
}
