use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{StatsError, StatsResult};
use crate::models::TimeRange;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Days covered when the request leaves the range open.
const DEFAULT_RANGE_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Last representable instant of `date`; timestamps carry microseconds.
fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_micro_opt(23, 59, 59, 999_999)
        .unwrap_or_else(|| start_of_day(date))
}

/// Parses a request timestamp. A bare date is widened to the start or the end
/// of that day depending on which side of the range it bounds.
pub fn parse_bound(input: &str, bound: Bound) -> StatsResult<NaiveDateTime> {
    let input = input.trim();

    for format in DATETIME_FORMATS {
        if let Ok(at) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(at);
        }
    }

    let date = NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map_err(|_| StatsError::InvalidTime(input.to_string()))?;
    Ok(match bound {
        Bound::Start => start_of_day(date),
        Bound::End => end_of_day(date),
    })
}

fn present(bound: Option<&str>) -> Option<&str> {
    bound.filter(|value| !value.trim().is_empty())
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(date)
}

/// Builds the inclusive process-ranking range. A missing bound is filled in
/// so the range spans seven days: from the supplied start, up to the supplied
/// end, or through the end of `today` when neither is given.
pub fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> StatsResult<TimeRange> {
    let (start, end) = match (present(start), present(end)) {
        (Some(start), Some(end)) => (
            parse_bound(start, Bound::Start)?,
            parse_bound(end, Bound::End)?,
        ),
        (Some(start), None) => {
            let start = parse_bound(start, Bound::Start)?;
            let last = start
                .date()
                .checked_add_days(Days::new(DEFAULT_RANGE_DAYS - 1))
                .unwrap_or(start.date());
            (start, end_of_day(last))
        }
        (None, Some(end)) => {
            let end = parse_bound(end, Bound::End)?;
            let first = days_before(end.date(), DEFAULT_RANGE_DAYS - 1);
            (start_of_day(first), end)
        }
        (None, None) => {
            let first = days_before(today, DEFAULT_RANGE_DAYS - 1);
            (start_of_day(first), end_of_day(today))
        }
    };

    if start > end {
        return Err(StatsError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    Ok(TimeRange { start, end })
}
