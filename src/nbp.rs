//! Official NBP (Narodowy Bank Polski) table A mid rates

use crate::core::{MergeError, RateTable, SkipReason, SkippedDate};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.nbp.pl/api/";

/// Longest date range the API serves in a single query
pub const MAX_RANGE_DAYS: i64 = 93;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },
    #[error("invalid effectiveDate in response: {0}")]
    InvalidDate(String),
    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Where exchange rates come from
pub trait RateSource {
    /// All rates published between `start` and `end` inclusive. An empty
    /// table means nothing was published in the range.
    fn rates_between(
        &self,
        currency: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateTable, FetchError>;

    /// The rate published on `date`, `None` if there was none.
    fn rate_on(&self, currency: &str, date: NaiveDate) -> Result<Option<Decimal>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: Vec<RateEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateEntry {
    effective_date: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    mid: Decimal,
}

impl RatesResponse {
    fn into_table(self) -> Result<RateTable, FetchError> {
        self.rates
            .into_iter()
            .map(|entry| {
                NaiveDate::parse_from_str(&entry.effective_date, "%Y-%m-%d")
                    .map(|date| (date, entry.mid))
                    .map_err(|_| FetchError::InvalidDate(entry.effective_date))
            })
            .collect()
    }
}

pub struct NbpClient {
    client: Client,
    base_url: String,
}

impl NbpClient {
    pub fn new(base_url: &str) -> Self {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// GET a rates endpoint; `Ok(None)` when the API answers 404 (no data)
    fn get(&self, currency: &str, path: &str) -> Result<Option<RateTable>, FetchError> {
        let url = format!(
            "{}exchangerates/rates/a/{}/{}/?format=json",
            self.base_url,
            currency.to_lowercase(),
            path
        );
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|source| FetchError::Http {
                url: url.clone(),
                source,
            })?;

        if !has_rates(response.status(), &url)? {
            return Ok(None);
        }
        let body: RatesResponse = response
            .json()
            .map_err(|source| FetchError::Http { url, source })?;
        body.into_table().map(Some)
    }
}

/// Whether a response carries rates. The API answers 404 when nothing was
/// published for the requested day or range.
fn has_rates(status: StatusCode, url: &str) -> Result<bool, FetchError> {
    match status {
        StatusCode::NOT_FOUND => Ok(false),
        status if status.is_success() => Ok(true),
        status => Err(FetchError::Status {
            url: url.to_string(),
            status,
        }),
    }
}

impl Default for NbpClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl RateSource for NbpClient {
    fn rates_between(
        &self,
        currency: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RateTable, FetchError> {
        let path = format!("{}/{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"));
        Ok(self.get(currency, &path)?.unwrap_or_default())
    }

    fn rate_on(&self, currency: &str, date: NaiveDate) -> Result<Option<Decimal>, FetchError> {
        let path = date.format("%Y-%m-%d").to_string();
        Ok(self.get(currency, &path)?.and_then(|table| table.get(date)))
    }
}

/// Rates from a best-effort fetch, along with the dates that could not be
/// resolved
#[derive(Debug, Default)]
pub struct DatedRates {
    pub rates: RateTable,
    pub skipped: Vec<SkippedDate>,
}

/// Fetch `start..=end` in chunks the API accepts and merge them.
pub fn fetch_rates_between<S: RateSource + ?Sized>(
    source: &S,
    currency: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<RateTable, FetchError> {
    let mut table = RateTable::new();
    let mut chunk_start = start;
    while chunk_start <= end {
        let chunk_end = (chunk_start + Duration::days(MAX_RANGE_DAYS - 1)).min(end);
        let chunk = source.rates_between(currency, chunk_start, chunk_end)?;
        log::debug!("{} rates {}..{}: {}", currency, chunk_start, chunk_end, chunk.len());
        table = table.merge(chunk)?;
        chunk_start = chunk_end + Duration::days(1);
    }
    Ok(table)
}

/// Every rate published in `year`, up to today. Fails if any part of the
/// year cannot be fetched.
pub fn fetch_rates_for_year<S: RateSource + ?Sized>(
    source: &S,
    year: i32,
    currency: &str,
) -> Result<RateTable, FetchError> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| FetchError::InvalidDate(format!("{}-01-01", year)))?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| FetchError::InvalidDate(format!("{}-12-31", year)))?
        .min(Utc::now().date_naive());
    let table = fetch_rates_between(source, currency, start, end)?;
    log::info!("Fetched {} {} rates for {}", table.len(), currency, year);
    Ok(table)
}

/// Fetch each year and merge the results into one table
pub fn fetch_rates_for_years<S, I>(
    source: &S,
    years: I,
    currency: &str,
) -> Result<RateTable, FetchError>
where
    S: RateSource + ?Sized,
    I: IntoIterator<Item = i32>,
{
    years.into_iter().try_fold(RateTable::new(), |table, year| {
        let year_table = fetch_rates_for_year(source, year, currency)?;
        Ok(table.merge(year_table)?)
    })
}

/// Years a set of dates span, inclusive
pub fn years_spanning<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Vec<i32> {
    let (min, max) = dates
        .into_iter()
        .map(|d| d.year())
        .fold((i32::MAX, i32::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));
    (min..=max).collect()
}

/// Fetch the rate for each date individually. Dates without a published
/// rate and dates whose request fails are reported in `skipped` instead of
/// failing the whole call.
pub fn fetch_rates_for_dates<S, I>(source: &S, dates: I, currency: &str) -> DatedRates
where
    S: RateSource + ?Sized,
    I: IntoIterator<Item = NaiveDate>,
{
    let mut found = Vec::new();
    let mut skipped = Vec::new();

    for date in dates {
        match source.rate_on(currency, date) {
            Ok(Some(rate)) => found.push((date, rate)),
            Ok(None) => {
                log::warn!("No {} rate published for {}", currency, date);
                skipped.push(SkippedDate {
                    date,
                    reason: SkipReason::NotPublished,
                });
            }
            Err(e) => {
                log::warn!("Fetching {} rate for {} failed: {}", currency, date, e);
                skipped.push(SkippedDate {
                    date,
                    reason: SkipReason::Failed(e.to_string()),
                });
            }
        }
    }

    DatedRates {
        rates: found.into_iter().collect(),
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// In-memory source that records the ranges it was asked for
    #[derive(Default)]
    struct FakeSource {
        rates: RateTable,
        failing: Vec<NaiveDate>,
        failing_range: Option<NaiveDate>,
        requests: RefCell<Vec<(NaiveDate, NaiveDate)>>,
    }

    impl FakeSource {
        fn with_rates(entries: &[(&str, Decimal)]) -> Self {
            FakeSource {
                rates: entries.iter().map(|(d, r)| (date(d), *r)).collect(),
                ..Default::default()
            }
        }
    }

    impl RateSource for FakeSource {
        fn rates_between(
            &self,
            _currency: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<RateTable, FetchError> {
            self.requests.borrow_mut().push((start, end));
            if let Some(day) = self.failing_range {
                if day >= start && day <= end {
                    return Err(FetchError::Status {
                        url: format!("{}/{}", start, end),
                        status: StatusCode::SERVICE_UNAVAILABLE,
                    });
                }
            }
            Ok(self
                .rates
                .iter()
                .filter(|(d, _)| *d >= start && *d <= end)
                .collect())
        }

        fn rate_on(
            &self,
            _currency: &str,
            date: NaiveDate,
        ) -> Result<Option<Decimal>, FetchError> {
            if self.failing.contains(&date) {
                return Err(FetchError::InvalidDate(date.to_string()));
            }
            Ok(self.rates.get(date))
        }
    }

    #[test]
    fn parse_response_body() {
        let body = r#"{
            "table": "A",
            "currency": "dolar amerykański",
            "code": "USD",
            "rates": [
                {"no": "001/A/NBP/2023", "effectiveDate": "2023-01-02", "mid": 4.3480},
                {"no": "002/A/NBP/2023", "effectiveDate": "2023-01-03", "mid": 4.4018}
            ]
        }"#;
        let response: RatesResponse = serde_json::from_str(body).unwrap();
        let table = response.into_table().unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(date("2023-01-02")), Some(dec!(4.3480)));
        assert_eq!(table.get(date("2023-01-03")), Some(dec!(4.4018)));
    }

    #[test]
    fn parse_response_with_bad_date() {
        let body = r#"{"rates": [{"effectiveDate": "02.01.2023", "mid": 4.3480}]}"#;
        let response: RatesResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            response.into_table(),
            Err(FetchError::InvalidDate(_))
        ));
    }

    #[test]
    fn client_normalizes_base_url() {
        let client = NbpClient::new("http://localhost:8080/api");
        assert_eq!(client.base_url, "http://localhost:8080/api/");
        assert_eq!(NbpClient::default().base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn year_is_fetched_in_api_sized_chunks() {
        let source = FakeSource::with_rates(&[
            ("2022-01-03", dec!(4.06)),
            ("2022-06-01", dec!(4.27)),
            ("2022-12-30", dec!(4.40)),
        ]);

        let table = fetch_rates_for_year(&source, 2022, "usd").unwrap();
        assert_eq!(table.len(), 3);

        let requests = source.requests.borrow();
        assert_eq!(requests.first().unwrap().0, date("2022-01-01"));
        assert_eq!(requests.last().unwrap().1, date("2022-12-31"));
        for (start, end) in requests.iter() {
            assert!((*end - *start).num_days() < MAX_RANGE_DAYS);
        }
        for pair in requests.windows(2) {
            assert_eq!(pair[0].1 + Duration::days(1), pair[1].0);
        }
    }

    #[test]
    fn status_decides_whether_body_is_read() {
        let url = "http://localhost/api/exchangerates/rates/a/usd/2023-01-01/";
        assert!(has_rates(StatusCode::OK, url).unwrap());
        assert!(!has_rates(StatusCode::NOT_FOUND, url).unwrap());
        match has_rates(StatusCode::INTERNAL_SERVER_ERROR, url) {
            Err(FetchError::Status { url: failed, status }) => {
                assert_eq!(failed, url);
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(has_rates(StatusCode::BAD_REQUEST, url).is_err());
    }

    #[test]
    fn failed_chunk_fails_the_year() {
        let source = FakeSource {
            rates: [(date("2022-01-03"), dec!(4.06)), (date("2022-12-30"), dec!(4.40))]
                .into_iter()
                .collect(),
            failing_range: Some(date("2022-06-15")),
            ..Default::default()
        };

        assert!(matches!(
            fetch_rates_for_year(&source, 2022, "usd"),
            Err(FetchError::Status { .. })
        ));
        // stops at the failing chunk
        let requests = source.requests.borrow();
        assert!(requests.last().unwrap().1 < date("2022-12-31"));
    }

    #[test]
    fn failed_year_fails_all_years() {
        let source = FakeSource {
            rates: [(date("2021-12-31"), dec!(4.06)), (date("2022-01-03"), dec!(4.05))]
                .into_iter()
                .collect(),
            failing_range: Some(date("2022-03-01")),
            ..Default::default()
        };
        assert!(fetch_rates_for_years(&source, [2021, 2022], "usd").is_err());
    }

    #[test]
    fn empty_range_gives_empty_table() {
        let source = FakeSource::default();
        let table = fetch_rates_for_year(&source, 2022, "usd").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn years_are_merged() {
        let source =
            FakeSource::with_rates(&[("2021-12-31", dec!(4.06)), ("2022-01-03", dec!(4.05))]);
        let table = fetch_rates_for_years(&source, [2021, 2022], "usd").unwrap();
        assert_eq!(table.get(date("2021-12-31")), Some(dec!(4.06)));
        assert_eq!(table.get(date("2022-01-03")), Some(dec!(4.05)));
    }

    #[test]
    fn years_spanning_fills_gaps() {
        let dates = vec![date("2023-05-01"), date("2020-01-01"), date("2021-06-30")];
        assert_eq!(years_spanning(dates), vec![2020, 2021, 2022, 2023]);
        assert!(years_spanning(Vec::new()).is_empty());
    }

    #[test]
    fn missing_and_failed_dates_are_skipped() {
        let mut source =
            FakeSource::with_rates(&[("2022-01-04", dec!(4.02)), ("2023-03-07", dec!(4.41))]);
        source.failing.push(date("2023-03-07"));

        let result = fetch_rates_for_dates(
            &source,
            vec![date("2022-01-04"), date("2023-03-05"), date("2023-03-07")],
            "usd",
        );

        assert_eq!(result.rates.len(), 1);
        assert_eq!(result.rates.get(date("2022-01-04")), Some(dec!(4.02)));
        assert_eq!(
            result.skipped,
            vec![
                SkippedDate {
                    date: date("2023-03-05"),
                    reason: SkipReason::NotPublished,
                },
                SkippedDate {
                    date: date("2023-03-07"),
                    reason: SkipReason::Failed(
                        "invalid effectiveDate in response: 2023-03-07".to_string()
                    ),
                },
            ]
        );
    }
}
