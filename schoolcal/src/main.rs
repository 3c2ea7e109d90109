use std::env;
use std::path::Path;

use anyhow::Result;
use chrono::Utc;

use schoolcal::{cache, cli, load_or_scrape, write_calendar, Cache, HttpNavigator};

fn setup_logging() {
    if env::var("LOG").is_err() {
        env::set_var("LOG", "schoolcal=info,schoolcal_parser=info");
    }

    pretty_env_logger::init_custom_env("LOG");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse(env::args().collect());

    setup_logging();

    let cache = Cache::new(cache::Config {
        enabled: args.enable_cache,
        dir: args.cache_dir,
    });

    let collections = load_or_scrape(&cache, args.force_refresh, args.months, || {
        HttpNavigator::open(&args.url, args.settle)
    })
    .await?;

    write_calendar(
        &collections,
        &args.calendar,
        args.output.as_deref(),
        Path::new("."),
        Utc::now(),
    )?;

    Ok(())
}
