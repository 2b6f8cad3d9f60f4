//! JSON shapes consumed by the existing dashboard front end.

use serde::Serialize;

use crate::models::{ProcessCount, ScopeCounts, SubmitterRank, TimeBucket};

const WIRE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Time series as four index-aligned arrays.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TimeSeries {
    pub datetime: Vec<String>,
    pub total: Vec<i64>,
    pub overs: Vec<i64>,
    pub processing: Vec<i64>,
}

impl From<&[TimeBucket]> for TimeSeries {
    fn from(buckets: &[TimeBucket]) -> Self {
        let mut series = TimeSeries {
            datetime: Vec::with_capacity(buckets.len()),
            total: Vec::with_capacity(buckets.len()),
            overs: Vec::with_capacity(buckets.len()),
            processing: Vec::with_capacity(buckets.len()),
        };
        for bucket in buckets {
            series.datetime.push(bucket.date.format(WIRE_DATE_FORMAT).to_string());
            series.total.push(bucket.total);
            series.overs.push(bucket.completed);
            series.processing.push(bucket.pending);
        }
        series
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitterEntry<'a> {
    pub user_id: i64,
    pub username: &'a str,
    pub nick_name: &'a str,
    pub ranking_count: i64,
}

impl<'a> From<&'a SubmitterRank> for SubmitterEntry<'a> {
    fn from(rank: &'a SubmitterRank) -> Self {
        SubmitterEntry {
            user_id: rank.user_id,
            username: &rank.username,
            nick_name: &rank.nick_name,
            ranking_count: rank.count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessEntry<'a> {
    pub name: &'a str,
    pub total: i64,
}

impl<'a> From<&'a ProcessCount> for ProcessEntry<'a> {
    fn from(count: &'a ProcessCount) -> Self {
        ProcessEntry {
            name: count.name.as_deref().unwrap_or_default(),
            total: count.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScopeTotals {
    pub upcoming: i64,
    pub my_create: i64,
    pub related: i64,
    pub all: i64,
}

impl From<ScopeCounts> for ScopeTotals {
    fn from(counts: ScopeCounts) -> Self {
        ScopeTotals {
            upcoming: counts.upcoming,
            my_create: counts.my_create,
            related: counts.related,
            all: counts.all,
        }
    }
}

pub fn submitters(ranks: &[SubmitterRank]) -> Vec<SubmitterEntry<'_>> {
    ranks.iter().map(SubmitterEntry::from).collect()
}

pub fn processes(ranks: &[ProcessCount]) -> Vec<ProcessEntry<'_>> {
    ranks.iter().map(ProcessEntry::from).collect()
}

/// Everything the dashboard page loads in one response.
#[derive(Debug, Serialize)]
pub struct Dashboard<'a> {
    pub count: ScopeTotals,
    pub ranks: Vec<ProcessEntry<'a>>,
    pub submit: Vec<SubmitterEntry<'a>>,
    pub statistics: TimeSeries,
}

impl<'a> Dashboard<'a> {
    pub fn new(
        counts: ScopeCounts,
        process_ranks: &'a [ProcessCount],
        submitter_ranks: &'a [SubmitterRank],
        buckets: &[TimeBucket],
    ) -> Self {
        Dashboard {
            count: counts.into(),
            ranks: processes(process_ranks),
            submit: submitters(submitter_ranks),
            statistics: TimeSeries::from(buckets),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::memory::day;

    #[test]
    fn time_series_serializes_as_parallel_arrays() {
        let buckets = [
            TimeBucket {
                date: day("2024-01-01"),
                total: 1,
                completed: 1,
                pending: 0,
            },
            TimeBucket {
                date: day("2024-01-02"),
                total: 2,
                completed: 0,
                pending: 2,
            },
        ];

        let value = serde_json::to_value(TimeSeries::from(&buckets[..])).unwrap();

        assert_eq!(
            value,
            json!({
                "datetime": ["2024-01-01", "2024-01-02"],
                "total": [1, 2],
                "overs": [1, 0],
                "processing": [0, 2],
            })
        );
    }

    #[test]
    fn dashboard_uses_the_legacy_keys() {
        let submitters = vec![SubmitterRank {
            user_id: 3,
            username: "kiara".to_string(),
            nick_name: "Kiara".to_string(),
            count: 4,
        }];
        let processes = vec![
            ProcessCount {
                process_id: 2,
                name: Some("Leave".to_string()),
                total: 5,
            },
            ProcessCount {
                process_id: 9,
                name: None,
                total: 1,
            },
        ];
        let counts = ScopeCounts {
            upcoming: 1,
            my_create: 2,
            related: 3,
            all: 4,
        };

        let dashboard = Dashboard::new(counts, &processes, &submitters, &[]);
        let value = serde_json::to_value(dashboard).unwrap();

        assert_eq!(
            value,
            json!({
                "count": {"upcoming": 1, "my_create": 2, "related": 3, "all": 4},
                "ranks": [{"name": "Leave", "total": 5}, {"name": "", "total": 1}],
                "submit": [{
                    "user_id": 3,
                    "username": "kiara",
                    "nick_name": "Kiara",
                    "ranking_count": 4,
                }],
                "statistics": {"datetime": [], "total": [], "overs": [], "processing": []},
            })
        );
    }
}
