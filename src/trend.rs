use std::collections::HashMap;
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};
use tracing::debug;

use crate::error::{StatsError, StatsResult};
use crate::models::{DailyCount, TimeBucket};
use crate::store::{bounded, TicketStore};

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The `days` calendar days ending at `today`, oldest first.
pub fn window(today: NaiveDate, days: u32) -> StatsResult<Vec<NaiveDate>> {
    if days == 0 {
        return Err(StatsError::InvalidArgument(
            "time series window must cover at least one day".to_string(),
        ));
    }

    let mut dates = (0..days)
        .map(|offset| {
            today.checked_sub_days(Days::new(u64::from(offset))).ok_or_else(|| {
                StatsError::InvalidArgument(format!("{days} days before {today} is out of range"))
            })
        })
        .collect::<StatsResult<Vec<_>>>()?;
    dates.sort();
    Ok(dates)
}

/// Left-joins the window onto the grouped counts; days with no group become zeros.
pub fn fill_buckets(window: &[NaiveDate], counts: Vec<DailyCount>) -> Vec<TimeBucket> {
    let by_day: HashMap<NaiveDate, DailyCount> =
        counts.into_iter().map(|count| (count.day, count)).collect();

    window
        .iter()
        .map(|date| match by_day.get(date) {
            Some(count) => TimeBucket {
                date: *date,
                total: count.total,
                completed: count.completed,
                pending: count.pending,
            },
            None => TimeBucket::empty(*date),
        })
        .collect()
}

/// Daily created/completed/pending counts for the `days` days ending at `today`.
pub async fn daily_series<S>(
    store: &S,
    today: NaiveDate,
    days: u32,
    timeout: Duration,
) -> StatsResult<Vec<TimeBucket>>
where
    S: TicketStore + ?Sized,
{
    let dates = window(today, days)?;
    let (first, last) = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Ok(Vec::new()),
    };

    let counts = bounded(
        "daily ticket counts",
        timeout,
        store.daily_counts(first, last),
    )
    .await?;
    debug!(groups = counts.len(), %first, %last, "grouped tickets by creation day");

    Ok(fill_buckets(&dates, counts))
}
