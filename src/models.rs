use chrono::{NaiveDate, NaiveDateTime};

/// A work order as the reporting layer sees it.
///
/// Only the binary completed/pending flag is modelled; any finer-grained
/// workflow state upstream collapses onto `completed`.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: i64,
    pub creator_id: i64,
    pub process_id: i64,
    pub create_time: NaiveDateTime,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct Process {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub nick_name: String,
}

/// Identity of whoever asked for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
}

/// Inclusive timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Grouped ticket counts for one creation day, as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBucket {
    pub date: NaiveDate,
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
}

impl TimeBucket {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total: 0,
            completed: 0,
            pending: 0,
        }
    }
}

/// Ticket count per creator with whatever identity the user table had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorCount {
    pub creator_id: i64,
    pub username: Option<String>,
    pub nick_name: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitterRank {
    pub user_id: i64,
    pub username: String,
    pub nick_name: String,
    pub count: i64,
}

/// Ticket count per process; `name` is `None` when the process row is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCount {
    pub process_id: i64,
    pub name: Option<String>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Upcoming,
    MyCreate,
    Related,
    All,
}

impl Scope {
    pub const ALL: [Scope; 4] = [Scope::Upcoming, Scope::MyCreate, Scope::Related, Scope::All];

    /// Classification code understood by the ticket listing.
    pub fn code(self) -> u8 {
        match self {
            Scope::Upcoming => 1,
            Scope::MyCreate => 2,
            Scope::Related => 3,
            Scope::All => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scope::Upcoming => "upcoming",
            Scope::MyCreate => "my_create",
            Scope::Related => "related",
            Scope::All => "all",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScopeCounts {
    pub upcoming: i64,
    pub my_create: i64,
    pub related: i64,
    pub all: i64,
}

impl ScopeCounts {
    pub fn get(&self, scope: Scope) -> i64 {
        match scope {
            Scope::Upcoming => self.upcoming,
            Scope::MyCreate => self.my_create,
            Scope::Related => self.related,
            Scope::All => self.all,
        }
    }
}
