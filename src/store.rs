use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{StatsError, StatsResult};
use crate::models::{Caller, CreatorCount, DailyCount, ProcessCount, Scope, TimeRange};

/// Grouped-count queries the dashboard needs from the ticket store.
///
/// Implementations return every group, unordered. Ranking, truncation and gap
/// filling happen in the aggregators so every backend ranks identically.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Ticket counts per creation day for days in `[from, to]`, split by the
    /// completed flag. Days without tickets are omitted.
    async fn daily_counts(&self, from: NaiveDate, to: NaiveDate) -> StatsResult<Vec<DailyCount>>;

    /// Ticket counts per creator, joined to the creator's identity if it exists.
    async fn creator_counts(&self) -> StatsResult<Vec<CreatorCount>>;

    /// Ticket counts per process for tickets created within `range`,
    /// joined to the process name if it exists.
    async fn process_counts(&self, range: TimeRange) -> StatsResult<Vec<ProcessCount>>;
}

/// Count-only view of the paginated ticket listing.
#[async_trait]
pub trait TicketListing: Send + Sync {
    async fn total_count(&self, scope: Scope, caller: Caller) -> StatsResult<i64>;
}

/// Runs one store call under `timeout`. Dropping the future on expiry
/// releases its connection back to the pool.
pub async fn bounded<T, F>(operation: &'static str, timeout: Duration, query: F) -> StatsResult<T>
where
    F: Future<Output = StatsResult<T>>,
{
    match tokio::time::timeout(timeout, query).await {
        Ok(result) => result,
        Err(_) => Err(StatsError::Timeout { operation, timeout }),
    }
}

#[cfg(test)]
pub mod memory {
    use std::collections::{BTreeMap, HashMap, HashSet};

    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{TicketListing, TicketStore};
    use crate::error::{StatsError, StatsResult};
    use crate::models::{
        Caller, CreatorCount, DailyCount, Process, ProcessCount, Scope, Ticket, TimeRange, User,
    };

    pub fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S")
            .expect("valid timestamp")
    }

    pub fn day(date: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid date")
    }

    /// In-memory ticket store that groups the same way the Postgres queries do.
    #[derive(Default)]
    pub struct MemoryStore {
        pub tickets: Vec<Ticket>,
        pub processes: Vec<Process>,
        pub users: Vec<User>,
        pub fail: bool,
    }

    impl MemoryStore {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn ticket(
            &mut self,
            creator_id: i64,
            process_id: i64,
            created: NaiveDateTime,
            completed: bool,
        ) {
            let id = self.tickets.len() as i64 + 1;
            self.tickets.push(Ticket {
                id,
                creator_id,
                process_id,
                create_time: created,
                completed,
            });
        }

        fn check(&self) -> StatsResult<()> {
            if self.fail {
                Err(StatsError::Query(sqlx::Error::PoolClosed))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl TicketStore for MemoryStore {
        async fn daily_counts(
            &self,
            from: NaiveDate,
            to: NaiveDate,
        ) -> StatsResult<Vec<DailyCount>> {
            self.check()?;
            let mut days: BTreeMap<NaiveDate, DailyCount> = BTreeMap::new();
            for ticket in &self.tickets {
                let created = ticket.create_time.date();
                if created < from || created > to {
                    continue;
                }
                let entry = days.entry(created).or_insert(DailyCount {
                    day: created,
                    total: 0,
                    completed: 0,
                    pending: 0,
                });
                entry.total += 1;
                if ticket.completed {
                    entry.completed += 1;
                } else {
                    entry.pending += 1;
                }
            }
            // Hand groups back in reverse to make sure callers do their own ordering.
            Ok(days.into_values().rev().collect())
        }

        async fn creator_counts(&self) -> StatsResult<Vec<CreatorCount>> {
            self.check()?;
            let mut counts: HashMap<i64, i64> = HashMap::new();
            for ticket in &self.tickets {
                *counts.entry(ticket.creator_id).or_insert(0) += 1;
            }
            Ok(counts
                .into_iter()
                .map(|(creator_id, count)| {
                    let user = self.users.iter().find(|user| user.id == creator_id);
                    CreatorCount {
                        creator_id,
                        username: user.map(|user| user.username.clone()),
                        nick_name: user.map(|user| user.nick_name.clone()),
                        count,
                    }
                })
                .collect())
        }

        async fn process_counts(&self, range: TimeRange) -> StatsResult<Vec<ProcessCount>> {
            self.check()?;
            let mut counts: HashMap<i64, i64> = HashMap::new();
            for ticket in &self.tickets {
                if ticket.create_time < range.start || ticket.create_time > range.end {
                    continue;
                }
                *counts.entry(ticket.process_id).or_insert(0) += 1;
            }
            Ok(counts
                .into_iter()
                .map(|(process_id, total)| ProcessCount {
                    process_id,
                    name: self
                        .processes
                        .iter()
                        .find(|process| process.id == process_id)
                        .map(|process| process.name.clone()),
                    total,
                })
                .collect())
        }
    }

    /// Listing double answering fixed totals, optionally failing some scopes.
    #[derive(Default)]
    pub struct FixedListing {
        pub totals: HashMap<Scope, i64>,
        pub failing: HashSet<Scope>,
        pub seen: std::sync::Mutex<Vec<(Scope, Caller)>>,
    }

    impl FixedListing {
        pub fn new(upcoming: i64, my_create: i64, related: i64, all: i64) -> Self {
            let totals = [
                (Scope::Upcoming, upcoming),
                (Scope::MyCreate, my_create),
                (Scope::Related, related),
                (Scope::All, all),
            ]
            .into_iter()
            .collect();
            Self {
                totals,
                ..Self::default()
            }
        }

        pub fn failing_on(mut self, scope: Scope) -> Self {
            self.failing.insert(scope);
            self
        }
    }

    #[async_trait]
    impl TicketListing for FixedListing {
        async fn total_count(&self, scope: Scope, caller: Caller) -> StatsResult<i64> {
            self.seen.lock().expect("listing mutex").push((scope, caller));
            if self.failing.contains(&scope) {
                return Err(StatsError::Query(sqlx::Error::PoolTimedOut));
            }
            Ok(self.totals.get(&scope).copied().unwrap_or(0))
        }
    }
}
