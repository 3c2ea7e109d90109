pub mod cache;
pub mod cli;
pub mod navigator;
pub mod output;
pub mod scrape;

pub use cache::Cache;
pub use navigator::{HttpNavigator, Navigator};
pub use output::write_calendar;
pub use scrape::{load_or_scrape, scrape};
