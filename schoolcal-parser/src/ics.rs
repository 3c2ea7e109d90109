use chrono::{DateTime, Datelike, Utc};
use ics::{
    components::Property,
    escape_text,
    properties::{
        Categories, Class, Created, DtEnd, DtStart, LastModified, Method, Priority, Summary, Transp,
    },
    ICalendar,
};

use crate::{Error, EventRecord, Result};

pub const CATEGORY: &str = "School Event";
pub const PRIORITY: &str = "5";

const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Naming of the emitted calendar and of the file it is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarOptions {
    /// `X-WR-CALNAME` shown by subscribing clients.
    pub name: String,
    pub product_id: String,
    pub uid_domain: String,
    pub time_zone: Option<String>,
    pub organization: String,
    pub span: String,
}

impl Default for CalendarOptions {
    fn default() -> Self {
        Self {
            name: "School Calendar".into(),
            product_id: "-//Salem-Keizer School Calendar//salkeiz.k12.or.us//EN".into(),
            uid_domain: "salkeiz.k12.or.us".into(),
            time_zone: Some("America/Los_Angeles".into()),
            organization: "Salem-Keizer".into(),
            span: "School-Year".into(),
        }
    }
}

/// Builds a publishable calendar with one `VEVENT` per record.
///
/// `stamp` is the wall-clock time of the run and ends up in every event's
/// `DTSTAMP`, `CREATED` and `LAST-MODIFIED`.
pub fn to_ics<'a>(
    records: &'a [EventRecord],
    options: &'a CalendarOptions,
    stamp: DateTime<Utc>,
) -> Result<ICalendar<'a>> {
    if records.is_empty() {
        return Err(Error::NoEvents);
    }

    let mut icalendar = ICalendar::new("2.0", options.product_id.as_str());
    icalendar.push(Method::new("PUBLISH"));
    icalendar.push(Property::new("X-WR-CALNAME", escape_text(options.name.as_str())));

    if let Some(time_zone) = &options.time_zone {
        icalendar.push(Property::new("X-WR-TIMEZONE", time_zone.as_str()));
    }

    let stamp = stamp.format(UTC_FORMAT).to_string();

    for record in records {
        icalendar.add_event(record.to_ics(&stamp, &options.uid_domain));
    }

    Ok(icalendar)
}

/// Derives `{organization}_{span}_Calendar_{startYear}-{endYear}.ics` from the
/// earliest and latest day among `records`.
pub fn file_name(records: &[EventRecord], options: &CalendarOptions) -> Result<String> {
    let first = records.iter().map(|record| record.day).min();
    let last = records.iter().map(|record| record.day).max();

    let (Some(first), Some(last)) = (first, last) else {
        return Err(Error::NoEvents);
    };

    Ok(format!(
        "{}_{}_Calendar_{}-{}.ics",
        options.organization,
        options.span,
        first.year(),
        last.year()
    ))
}

impl EventRecord {
    #[must_use]
    pub fn to_ics(&self, stamp: &str, uid_domain: &str) -> ics::Event<'_> {
        let start = self.starts_at().format(LOCAL_FORMAT).to_string();
        let end = self.ends_at().format(LOCAL_FORMAT).to_string();

        let id = match &self.title {
            Some(title) => format!(
                "{}_{}@{}",
                start,
                title.split_whitespace().collect::<Vec<_>>().join("-"),
                uid_domain
            ),
            None => format!("{start}@{uid_domain}"),
        };

        let mut ics_event = ics::Event::new(escape_text(id), stamp.to_string());

        ics_event.push(DtStart::new(start));
        ics_event.push(DtEnd::new(end));

        if let Some(title) = &self.title {
            ics_event.push(Summary::new(escape_text(title.as_str())));
        }

        ics_event.push(Categories::new(CATEGORY));
        ics_event.push(Class::new("PUBLIC"));
        ics_event.push(Transp::new("TRANSPARENT"));
        ics_event.push(Priority::new(PRIORITY));
        ics_event.push(Created::new(stamp.to_string()));
        ics_event.push(LastModified::new(stamp.to_string()));

        if self.is_all_day() {
            ics_event.push(Property::new("X-MICROSOFT-CDO-ALLDAYEVENT", "TRUE"));
        }

        ics_event
    }
}
