use std::env;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use getopts::{Matches, Options};
use schoolcal_parser::CalendarOptions;
use tokio::time::Duration;

pub const DEFAULT_URL: &str = "https://salkeiz.k12.or.us/about/calendar";

pub struct Args {
    pub url: String,
    pub output: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub enable_cache: bool,
    pub force_refresh: bool,
    pub months: usize,
    pub settle: Duration,
    pub calendar: CalendarOptions,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "u",
        "url",
        "District calendar page to scrape [Default: https://salkeiz.k12.or.us/about/calendar]",
        "URL",
    );
    opts.optopt(
        "o",
        "output",
        "File to write the calendar to [Default: derived from organization and years]",
        "FILE",
    );
    opts.optopt(
        "d",
        "cache-dir",
        "Directory holding EventDetails.json and KeyEventDetails.json [Default: .]",
        "DIR",
    );
    opts.optflag(
        "f",
        "force-refresh",
        "Scrape the website even if a complete cache exists [Default: false]",
    );
    opts.optflag(
        "n",
        "no-cache",
        "Neither read nor write the event cache [Default: false]",
    );
    opts.optopt(
        "m",
        "months",
        "Number of months to capture, starting with the current one [Default: 12]",
        "COUNT",
    );
    opts.optopt(
        "s",
        "settle",
        "Delay after each month navigation [Default: 1000]",
        "MILLIS",
    );
    opts.optopt(
        "",
        "name",
        "Calendar name shown by subscribing clients [Default: School Calendar]",
        "NAME",
    );
    opts.optopt(
        "",
        "organization",
        "Organization used in the derived file name [Default: Salem-Keizer]",
        "ORG",
    );
    opts
}

fn opt_or_exit<T>(matches: &Matches, name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match matches.opt_get_default(name, default) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("Provided value for option '{name}' is invalid: {err}");
            process::exit(1);
        }
    }
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    let matches = match opts.parse(args.iter().skip(1)) {
        Ok(matches) => matches,
        Err(fail) => {
            eprintln!("{fail}");
            process::exit(1);
        }
    };

    if matches.opt_present("help") {
        println!("{}", opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))));
        process::exit(0);
    }

    let months = opt_or_exit(&matches, "months", 12usize);
    if months == 0 {
        eprintln!("Provided value for option 'months' is invalid: must be at least 1");
        process::exit(1);
    }

    let mut calendar = CalendarOptions::default();
    if let Some(name) = matches.opt_str("name") {
        calendar.name = name;
    }
    if let Some(organization) = matches.opt_str("organization") {
        calendar.organization = organization;
    }

    Args {
        url: matches.opt_str("url").unwrap_or_else(|| DEFAULT_URL.into()),
        output: matches.opt_str("output").map(PathBuf::from),
        cache_dir: opt_or_exit(&matches, "cache-dir", PathBuf::from(".")),
        enable_cache: !matches.opt_present("no-cache"),
        force_refresh: matches.opt_present("force-refresh"),
        months,
        settle: Duration::from_millis(opt_or_exit(&matches, "settle", 1000)),
        calendar,
    }
}
