use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use schoolcal_parser::{EventCollections, EventRecord};

pub const EVENTS_FILE: &str = "EventDetails.json";
pub const KEY_EVENTS_FILE: &str = "KeyEventDetails.json";

pub struct Config {
    pub enabled: bool,
    pub dir: PathBuf,
}

/// On-disk copy of the two scraped collections.
///
/// The cache is all or nothing: with only one of the files present it reports
/// a miss, and the next [`Cache::insert`] overwrites both.
pub struct Cache {
    enabled: bool,
    dir: PathBuf,
}

impl Cache {
    pub fn new(config: Config) -> Self {
        Self {
            enabled: config.enabled,
            dir: config.dir,
        }
    }

    pub fn events_path(&self) -> PathBuf {
        self.dir.join(EVENTS_FILE)
    }

    pub fn key_events_path(&self) -> PathBuf {
        self.dir.join(KEY_EVENTS_FILE)
    }

    pub fn get(&self) -> Result<Option<EventCollections>> {
        if !self.enabled {
            return Ok(None);
        }

        let events_path = self.events_path();
        let key_events_path = self.key_events_path();

        match (events_path.exists(), key_events_path.exists()) {
            (true, true) => {}
            (false, false) => {
                debug!("No cache in {}", self.dir.display());
                return Ok(None);
            }
            (events, _) => {
                let (present, missing) = if events {
                    (&events_path, &key_events_path)
                } else {
                    (&key_events_path, &events_path)
                };
                warn!(
                    "Ignoring partial cache: {} exists but {} does not",
                    present.display(),
                    missing.display()
                );
                return Ok(None);
            }
        }

        Ok(Some(EventCollections {
            events: read(&events_path)?,
            key_events: read(&key_events_path)?,
        }))
    }

    pub fn insert(&self, collections: &EventCollections) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache directory {}", self.dir.display()))?;

        write(&self.events_path(), &collections.events)?;
        write(&self.key_events_path(), &collections.key_events)?;

        debug!("Wrote cache to {}", self.dir.display());
        Ok(())
    }
}

fn read(path: &Path) -> Result<Vec<EventRecord>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&json).with_context(|| format!("Malformed cache file {}", path.display()))
}

fn write(path: &Path, events: &[EventRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(events)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;

    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
