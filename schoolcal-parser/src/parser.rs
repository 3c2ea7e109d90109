use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::{debug, warn};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::{Error, EventRecord, Result, END_OF_DAY, START_OF_DAY};

macro_rules! selector {
    ($query:expr) => {{
        static SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse($query).unwrap());
        &SELECTOR
    }};
}

/// Entries of the "key dates" listing.
pub const KEY_EVENT: &str = "div.fsDayContainer > article";

/// Cells of the month grid.
pub const DAY_BOX: &str = "div.fsCalendarDaybox";

const KEY_EVENT_TITLE: &str = "div.fsTitle > a.fsCalendarEventLink";
const EVENT_LINK: &str = "a.fsCalendarEventLink";
const CALENDAR_DATE: &str = "div.fsCalendarDate";
const CALENDAR_INFO: &str = "fsCalendarInfo";
const TIME_RANGE: &str = "div.fsTimeRange";

/// Raw markup of a single calendar entry, tagged with the shape it was
/// selected as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// An `article` from the key dates listing.
    KeyEvent(String),
    /// A `div.fsCalendarDaybox` grid cell.
    DayBox(String),
}

impl Fragment {
    /// Extracts the event carried by this fragment. Day cells without a titled
    /// event yield `None`; key event fragments always yield a record or fail.
    pub fn extract(&self) -> Result<Option<EventRecord>> {
        match self {
            Fragment::KeyEvent(raw) => {
                let html = Html::parse_fragment(raw);
                let article = html
                    .select(selector!("article"))
                    .next()
                    .ok_or(Error::MissingElement {
                        fragment: "key event fragment",
                        element: "article",
                    })?;

                parse_key_event(article).map(Some)
            }
            Fragment::DayBox(raw) => {
                let html = Html::parse_fragment(raw);
                let cell = html
                    .select(selector!(DAY_BOX))
                    .next()
                    .ok_or(Error::MissingElement {
                        fragment: "day cell fragment",
                        element: DAY_BOX,
                    })?;

                parse_day_box(cell)
            }
        }
    }
}

fn parse_key_event(element: ElementRef) -> Result<EventRecord> {
    let title = element
        .select(selector!(KEY_EVENT_TITLE))
        .next()
        .ok_or(Error::MissingElement {
            fragment: "key event",
            element: KEY_EVENT_TITLE,
        })?
        .text()
        .collect::<String>();

    let datetime = element
        .select(selector!("time"))
        .next()
        .ok_or(Error::MissingElement {
            fragment: "key event",
            element: "time",
        })?
        .value()
        .attr("datetime")
        .ok_or(Error::MissingAttribute {
            element: "time",
            attribute: "datetime",
        })?;

    let day = parse_timestamp(datetime)?.date();
    let event = EventRecord::key_event(day, Some(collapse_whitespace(&title)));
    debug!("Extracted key event {event}");

    Ok(event)
}

fn parse_day_box(element: ElementRef) -> Result<Option<EventRecord>> {
    let Some(link) = element.select(selector!(EVENT_LINK)).next() else {
        return Ok(None);
    };

    let title = collapse_whitespace(&link.text().collect::<String>());
    if title.is_empty() {
        return Ok(None);
    }

    let date = element
        .select(selector!(CALENDAR_DATE))
        .next()
        .ok_or(Error::MissingElement {
            fragment: "day cell",
            element: CALENDAR_DATE,
        })?;

    let year = numeric_attr::<i32>(date, "data-year")?;
    // zero-based, like the JavaScript Date it comes from
    let month = numeric_attr::<u32>(date, "data-month")?;
    let day_of_month = numeric_attr::<u32>(date, "data-day")?;

    let day = NaiveDate::from_ymd_opt(year, month.saturating_add(1), day_of_month).ok_or_else(
        || Error::MalformedDate {
            value: format!("data-year={year} data-month={month} data-day={day_of_month}"),
            reason: "no such calendar day".into(),
        },
    )?;

    // a cell lists one `fsCalendarInfo` per event; only the titled one's times apply
    let info = link
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|ancestor| ancestor.id() != element.id())
        .find(|ancestor| ancestor.value().classes().any(|class| class == CALENDAR_INFO))
        .unwrap_or(element);

    let timestamps = info
        .select(selector!(TIME_RANGE))
        .next()
        .into_iter()
        .flat_map(|range| range.select(selector!("time")))
        .map(|time| {
            time.value()
                .attr("datetime")
                .ok_or(Error::MissingAttribute {
                    element: "time",
                    attribute: "datetime",
                })
                .and_then(parse_timestamp)
        })
        .collect::<Result<Vec<_>>>()?;

    let (start_time, end_time) = match timestamps.as_slice() {
        [] => (START_OF_DAY, END_OF_DAY),
        [at] => (at.time(), at.time()),
        [start, end] => (start.time(), end_time_on(start, end)),
        [start, end, extra @ ..] => {
            warn!(
                "Day cell {day} \"{title}\" carries {} timestamps, ignoring all but the first two",
                extra.len() + 2
            );
            (start.time(), end_time_on(start, end))
        }
    };

    let event = EventRecord::new(day, start_time, end_time, Some(title))?;
    debug!("Extracted event {event}");

    Ok(Some(event))
}

// Events running past midnight are cut off at the end of their first day.
fn end_time_on(start: &NaiveDateTime, end: &NaiveDateTime) -> NaiveTime {
    if end.date() > start.date() {
        END_OF_DAY
    } else {
        end.time()
    }
}

fn numeric_attr<T>(element: ElementRef, attribute: &'static str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = element
        .value()
        .attr(attribute)
        .ok_or(Error::MissingAttribute {
            element: CALENDAR_DATE,
            attribute,
        })?;

    raw.trim().parse::<T>().map_err(|err| Error::MalformedDate {
        value: raw.to_string(),
        reason: format!("`{attribute}` is not a number: {err}"),
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a `datetime` attribute into its wall-clock date and time.
///
/// UTC offsets are dropped rather than applied, and sub-second precision is
/// truncated. A bare date maps to midnight.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();

    let parsed = DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|datetime| datetime.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map(|date| date.and_time(START_OF_DAY))
        })
        .map_err(|err| Error::MalformedDate {
            value: value.to_string(),
            reason: err.to_string(),
        })?;

    Ok(parsed.with_nanosecond(0).unwrap_or(parsed))
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, Once};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn day_box(date: (i32, u32, u32), title: &str, times: &[&str]) -> String {
        let (year, month, day) = date;
        let times = times
            .iter()
            .map(|datetime| format!(r#"<time datetime="{datetime}" class="fsStartTime"></time>"#))
            .collect::<Vec<_>>()
            .join(r#"<span class="fsTimeSeperator"> - </span>"#);

        format!(
            r##"<div class="fsCalendarDaybox fsStateHasEvents">
                <div class="fsCalendarDate" data-day="{day}" data-year="{year}" data-month="{month}">
                    <span class="fsCalendarDay">Wed,</span> <span class="fsCalendarMonth">May</span> {day}
                </div>
                <div class="fsCalendarInfo">
                    <a class="fsCalendarEventTitle fsCalendarEventLink" title="{title}" href="#">{title}</a>
                    <div class="fsTimeRange">{times}</div>
                </div>
            </div>"##
        )
    }

    fn key_article(title: &str, datetime: &str) -> String {
        format!(
            r##"<article>
                <div class="fsTitle"><a class="fsCalendarEventLink" href="#">{title}</a></div>
                <div class="fsDate"><time datetime="{datetime}">Mon, Sep 2</time></div>
            </article>"##
        )
    }

    #[test]
    fn day_box_without_timestamps_is_all_day() {
        let event = Fragment::DayBox(day_box((2024, 8, 2), "First Day", &[]))
            .extract()
            .unwrap()
            .unwrap();

        assert_eq!(event.day, date(2024, 9, 2));
        assert_eq!(event.start_time, START_OF_DAY);
        assert_eq!(event.end_time, END_OF_DAY);
        assert_eq!(event.title.as_deref(), Some("First Day"));
        assert!(!event.is_key_event);
    }

    #[test]
    fn day_box_with_one_timestamp_is_instantaneous() {
        let event = Fragment::DayBox(day_box(
            (2024, 4, 29),
            "Board Meeting",
            &["2024-05-29T17:45:00-07:00"],
        ))
        .extract()
        .unwrap()
        .unwrap();

        assert_eq!(event.start_time, time(17, 45, 0));
        assert_eq!(event.end_time, time(17, 45, 0));
    }

    #[test]
    fn day_box_with_two_timestamps_is_a_range() {
        let event = Fragment::DayBox(day_box(
            (2024, 4, 29),
            "Question. Persuade. Refer. for Youth &amp; Families",
            &["2024-05-29T17:45:00-07:00", "2024-05-29T20:00:00-07:00"],
        ))
        .extract()
        .unwrap()
        .unwrap();

        assert_eq!(event.day, date(2024, 5, 29));
        assert_eq!(event.start_time, time(17, 45, 0));
        assert_eq!(event.end_time, time(20, 0, 0));
        assert_eq!(
            event.title.as_deref(),
            Some("Question. Persuade. Refer. for Youth & Families")
        );
    }

    #[test]
    fn day_box_with_extra_timestamps_uses_the_first_two() {
        let event = Fragment::DayBox(day_box(
            (2024, 9, 14),
            "Conferences",
            &[
                "2024-10-14T08:00:00-07:00",
                "2024-10-14T12:00:00-07:00",
                "2024-10-14T16:00:00-07:00",
            ],
        ))
        .extract()
        .unwrap()
        .unwrap();

        assert_eq!(event.start_time, time(8, 0, 0));
        assert_eq!(event.end_time, time(12, 0, 0));
    }

    #[test]
    fn overnight_event_ends_at_midnight() {
        let event = Fragment::DayBox(day_box(
            (2024, 11, 31),
            "Grad Night",
            &["2024-12-31T21:00:00-08:00", "2025-01-01T02:00:00-08:00"],
        ))
        .extract()
        .unwrap()
        .unwrap();

        assert_eq!(event.day, date(2024, 12, 31));
        assert_eq!(event.start_time, time(21, 0, 0));
        assert_eq!(event.end_time, END_OF_DAY);
    }

    #[test]
    fn day_box_ending_before_it_starts_is_malformed() {
        let err = Fragment::DayBox(day_box(
            (2024, 4, 29),
            "Backwards",
            &["2024-05-29T20:00:00-07:00", "2024-05-29T17:45:00-07:00"],
        ))
        .extract()
        .unwrap_err();

        assert!(matches!(err, Error::MalformedDate { .. }));
    }

    #[test]
    fn blank_or_missing_titles_are_skipped() {
        let blank = Fragment::DayBox(day_box((2024, 4, 29), "   ", &[]));
        assert_eq!(blank.extract().unwrap(), None);

        let empty_cell = Fragment::DayBox(
            r#"<div class="fsCalendarDaybox"><div class="fsCalendarDate" data-day="1" data-year="2024" data-month="4">1</div></div>"#
                .into(),
        );
        assert_eq!(empty_cell.extract().unwrap(), None);
    }

    #[test]
    fn titled_cell_without_date_is_a_shape_fault() {
        let cell = Fragment::DayBox(
            r##"<div class="fsCalendarDaybox"><a class="fsCalendarEventLink" href="#">Orphan</a></div>"##
                .into(),
        );

        assert!(matches!(
            cell.extract().unwrap_err(),
            Error::MissingElement { element: CALENDAR_DATE, .. }
        ));
    }

    #[test]
    fn impossible_dates_are_malformed() {
        let err = Fragment::DayBox(day_box((2024, 1, 30), "Feb 30th", &[]))
            .extract()
            .unwrap_err();

        assert!(matches!(err, Error::MalformedDate { .. }));

        let err = Fragment::DayBox(day_box((2024, 4, 29), "Bad time", &["yesterday"]))
            .extract()
            .unwrap_err();

        assert!(matches!(err, Error::MalformedDate { .. }));
    }

    #[test]
    fn key_event_fragment_takes_only_the_date() {
        let event = Fragment::KeyEvent(key_article(" Labor Day ", "2024-09-02T10:30:00-07:00"))
            .extract()
            .unwrap()
            .unwrap();

        assert_eq!(event, EventRecord::key_event(date(2024, 9, 2), Some("Labor Day".into())));
    }

    #[test]
    fn key_event_without_title_is_a_shape_fault() {
        let fragment = Fragment::KeyEvent(
            r#"<article><time datetime="2024-09-02">Sep 2</time></article>"#.into(),
        );

        assert!(matches!(
            fragment.extract().unwrap_err(),
            Error::MissingElement { element: KEY_EVENT_TITLE, .. }
        ));
    }

    #[test]
    fn key_event_without_datetime_is_a_shape_fault() {
        let fragment = Fragment::KeyEvent(
            r##"<article><div class="fsTitle"><a class="fsCalendarEventLink" href="#">Labor Day</a></div><time>Sep 2</time></article>"##
                .into(),
        );

        assert!(matches!(
            fragment.extract().unwrap_err(),
            Error::MissingAttribute { attribute: "datetime", .. }
        ));
    }

    fn event_info(title: &str, times: &[&str]) -> String {
        let times = times
            .iter()
            .map(|datetime| format!(r#"<time datetime="{datetime}"></time>"#))
            .collect::<String>();

        format!(
            r##"<div class="fsCalendarInfo">
                <a class="fsCalendarEventTitle fsCalendarEventLink" href="#">{title}</a>
                <div class="fsTimeRange">{times}</div>
            </div>"##
        )
    }

    fn multi_event_day_box(date: (i32, u32, u32), infos: &[String]) -> String {
        let (year, month, day) = date;
        let infos = infos.concat();

        format!(
            r#"<div class="fsCalendarDaybox">
                <div class="fsCalendarDate" data-day="{day}" data-year="{year}" data-month="{month}">{day}</div>
                {infos}
            </div>"#
        )
    }

    #[test]
    fn multi_event_cell_ignores_later_events_times() {
        let event = Fragment::DayBox(multi_event_day_box(
            (2024, 9, 1),
            &[
                event_info("Board Meeting", &["2024-10-01T18:00:00-07:00"]),
                event_info(
                    "Breakfast",
                    &["2024-10-01T07:00:00-07:00", "2024-10-01T08:00:00-07:00"],
                ),
            ],
        ))
        .extract()
        .unwrap()
        .unwrap();

        assert_eq!(event.title.as_deref(), Some("Board Meeting"));
        assert_eq!(event.start_time, time(18, 0, 0));
        assert_eq!(event.end_time, time(18, 0, 0));

        let event = Fragment::DayBox(multi_event_day_box(
            (2024, 9, 3),
            &[
                event_info("Open House", &["2024-10-03T08:00:00-07:00"]),
                event_info(
                    "Club",
                    &["2024-10-03T09:00:00-07:00", "2024-10-03T10:00:00-07:00"],
                ),
            ],
        ))
        .extract()
        .unwrap()
        .unwrap();

        assert_eq!(event.title.as_deref(), Some("Open House"));
        assert_eq!((event.start_time, event.end_time), (time(8, 0, 0), time(8, 0, 0)));
    }

    #[test]
    fn multi_event_cell_with_two_ranges_uses_the_first() {
        let event = Fragment::DayBox(multi_event_day_box(
            (2024, 9, 14),
            &[
                event_info(
                    "Conferences",
                    &["2024-10-14T17:00:00-07:00", "2024-10-14T19:00:00-07:00"],
                ),
                event_info(
                    "Early Bird Tutoring",
                    &["2024-10-14T07:00:00-07:00", "2024-10-14T07:45:00-07:00"],
                ),
            ],
        ))
        .extract()
        .unwrap()
        .unwrap();

        assert_eq!(event.title.as_deref(), Some("Conferences"));
        assert_eq!((event.start_time, event.end_time), (time(17, 0, 0), time(19, 0, 0)));
    }

    #[test]
    fn multi_event_cell_with_untimed_first_event_is_all_day() {
        let event = Fragment::DayBox(multi_event_day_box(
            (2024, 9, 21),
            &[
                event_info("Picture Day", &[]),
                event_info("Game Night", &["2024-10-21T18:00:00-07:00"]),
            ],
        ))
        .extract()
        .unwrap()
        .unwrap();

        assert_eq!(event.title.as_deref(), Some("Picture Day"));
        assert!(event.is_all_day());
    }

    static WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());

    struct WarningLog;

    impl log::Log for WarningLog {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                WARNINGS.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    fn capture_warnings() {
        static INSTALL: Once = Once::new();
        INSTALL.call_once(|| {
            log::set_logger(&WarningLog).unwrap();
            log::set_max_level(log::LevelFilter::Warn);
        });
    }

    #[test]
    fn extra_timestamps_are_reported() {
        capture_warnings();

        Fragment::DayBox(day_box(
            (2024, 9, 15),
            "Triple Booked",
            &[
                "2024-10-15T08:00:00-07:00",
                "2024-10-15T12:00:00-07:00",
                "2024-10-15T16:00:00-07:00",
            ],
        ))
        .extract()
        .unwrap();

        let warnings = WARNINGS.lock().unwrap();
        assert!(warnings.iter().any(|warning| warning.contains("2024-10-15")
            && warning.contains("Triple Booked")
            && warning.contains("3 timestamps")));
    }

    #[test]
    fn multi_line_titles_are_collapsed() {
        let event = Fragment::DayBox(day_box(
            (2024, 8, 9),
            "Parent Teacher\n            Conferences",
            &[],
        ))
        .extract()
        .unwrap()
        .unwrap();

        assert_eq!(event.title.as_deref(), Some("Parent Teacher Conferences"));
    }

    #[test]
    fn blank_key_event_title_is_kept_as_text() {
        let event = Fragment::KeyEvent(key_article("   ", "2024-09-02"))
            .extract()
            .unwrap()
            .unwrap();

        assert_eq!(event.title.as_deref(), Some(""));
        assert!(event.is_key_event);
    }

    #[test]
    fn timestamps_keep_wall_clock_time() {
        let expected = date(2024, 5, 29).and_time(time(17, 45, 0));

        for value in [
            "2024-05-29T17:45:00-07:00",
            "2024-05-29T17:45:00Z",
            "2024-05-29T17:45:00-0700",
            "2024-05-29T17:45:00.250",
            "2024-05-29 17:45:00",
            "2024-05-29T17:45",
        ] {
            assert_eq!(parse_timestamp(value).unwrap(), expected, "{value}");
        }

        assert_eq!(
            parse_timestamp("2024-05-29").unwrap(),
            date(2024, 5, 29).and_time(START_OF_DAY)
        );
    }
}
