use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Months, NaiveDate, Utc};
use log::debug;
use scraper::{Html, Selector};
use tokio::time::{self, Duration};

/// A calendar page that can be stepped month by month.
///
/// Implementations only ever hold one page state at a time; the scrape driver
/// reads it, then moves on.
#[allow(async_fn_in_trait)]
pub trait Navigator {
    /// Markup of the page state currently held.
    fn page(&self) -> &str;

    async fn advance_month(&mut self) -> Result<()>;

    async fn retreat_month(&mut self) -> Result<()>;

    /// Outer HTML of every element of the current page matching `selector`.
    fn fetch_fragments(&self, selector: &str) -> Result<Vec<String>> {
        let selector = Selector::parse(selector)
            .map_err(|err| anyhow!("Invalid selector `{selector}`: {err:?}"))?;
        let html = Html::parse_document(self.page());

        Ok(html.select(&selector).map(|element| element.html()).collect())
    }
}

/// Query parameter the calendar page reads its displayed month from.
const MONTH_PARAM: &str = "cal_date";

/// Navigates the district calendar over plain HTTP by requesting the page for
/// each displayed month.
pub struct HttpNavigator {
    client: reqwest::Client,
    url: String,
    month: NaiveDate,
    page: String,
    settle: Duration,
}

impl HttpNavigator {
    /// Loads `url` as it renders today, which is also the state holding the
    /// key dates listing.
    pub async fn open(url: &str, settle: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        let today = Utc::now().date_naive();
        let month = today.with_day(1).unwrap_or(today);

        let mut navigator = Self {
            client,
            url: url.to_string(),
            month,
            page: String::new(),
            settle,
        };

        navigator.page = navigator.get(url).await?;
        time::sleep(settle).await;

        Ok(navigator)
    }

    fn month_url(&self) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{separator}{MONTH_PARAM}={}",
            self.url,
            self.month.format("%Y-%m-%d")
        )
    }

    async fn get(&self, url: &str) -> Result<String> {
        debug!("Requesting {url}");

        self.client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("Failed to fetch {url}"))?
            .text()
            .await
            .with_context(|| format!("Failed to read body of {url}"))
    }

    async fn show(&mut self, month: NaiveDate) -> Result<()> {
        debug!("Showing {}", month.format("%B %Y"));
        self.month = month;
        self.page = self.get(&self.month_url()).await?;
        time::sleep(self.settle).await;
        Ok(())
    }
}

impl Navigator for HttpNavigator {
    fn page(&self) -> &str {
        &self.page
    }

    async fn advance_month(&mut self) -> Result<()> {
        let next = self
            .month
            .checked_add_months(Months::new(1))
            .ok_or_else(|| anyhow!("Cannot navigate past {}", self.month))?;
        self.show(next).await
    }

    async fn retreat_month(&mut self) -> Result<()> {
        let previous = self
            .month
            .checked_sub_months(Months::new(1))
            .ok_or_else(|| anyhow!("Cannot navigate before {}", self.month))?;
        self.show(previous).await
    }
}
