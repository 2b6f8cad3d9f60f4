use anyhow::Context;
use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;

use crate::error::{StatsError, StatsResult};
use crate::models::{
    Caller, CreatorCount, DailyCount, Process, ProcessCount, Scope, Ticket, TimeRange, User,
};
use crate::range::{parse_bound, Bound};
use crate::store::{TicketListing, TicketStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn column<'r, T>(row: &'r PgRow, name: &'static str) -> StatsResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name).map_err(|source| StatsError::Decode {
        column: name,
        source,
    })
}

/// Postgres-backed grouped counts over `ticket_dashboard.tickets`.
#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn daily_counts(&self, from: NaiveDate, to: NaiveDate) -> StatsResult<Vec<DailyCount>> {
        let start = from.and_time(NaiveTime::MIN);
        let end = to
            .checked_add_days(Days::new(1))
            .map(|next| next.and_time(NaiveTime::MIN))
            .ok_or_else(|| StatsError::InvalidArgument(format!("no day follows {to}")))?;

        let rows = sqlx::query(
            r#"
            SELECT create_time::date AS day,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE is_end) AS completed,
                   COUNT(*) FILTER (WHERE NOT is_end) AS pending
            FROM ticket_dashboard.tickets
            WHERE create_time >= $1 AND create_time < $2
            GROUP BY create_time::date
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(StatsError::Query)?;
        debug!(rows = rows.len(), "daily_counts");

        rows.iter()
            .map(|row| {
                Ok(DailyCount {
                    day: column(row, "day")?,
                    total: column(row, "total")?,
                    completed: column(row, "completed")?,
                    pending: column(row, "pending")?,
                })
            })
            .collect()
    }

    async fn creator_counts(&self) -> StatsResult<Vec<CreatorCount>> {
        let rows = sqlx::query(
            r#"
            SELECT t.creator_id, u.username, u.nick_name, COUNT(*) AS ranking_count
            FROM ticket_dashboard.tickets t
            LEFT JOIN ticket_dashboard.users u ON u.id = t.creator_id
            GROUP BY t.creator_id, u.username, u.nick_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StatsError::Query)?;
        debug!(rows = rows.len(), "creator_counts");

        rows.iter()
            .map(|row| {
                Ok(CreatorCount {
                    creator_id: column(row, "creator_id")?,
                    username: column(row, "username")?,
                    nick_name: column(row, "nick_name")?,
                    count: column(row, "ranking_count")?,
                })
            })
            .collect()
    }

    async fn process_counts(&self, range: TimeRange) -> StatsResult<Vec<ProcessCount>> {
        let rows = sqlx::query(
            r#"
            SELECT t.process_id, p.name, COUNT(t.id) AS total
            FROM ticket_dashboard.tickets t
            LEFT JOIN ticket_dashboard.processes p ON p.id = t.process_id
            WHERE t.create_time BETWEEN $1 AND $2
            GROUP BY t.process_id, p.name
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(StatsError::Query)?;
        debug!(rows = rows.len(), "process_counts");

        rows.iter()
            .map(|row| {
                Ok(ProcessCount {
                    process_id: column(row, "process_id")?,
                    name: column(row, "name")?,
                    total: column(row, "total")?,
                })
            })
            .collect()
    }
}

/// Count-only listing over the same tables, one predicate per scope.
#[derive(Clone)]
pub struct PgTicketListing {
    pool: PgPool,
}

impl PgTicketListing {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_scope_filter(query: &mut QueryBuilder<'_, Postgres>, scope: Scope, caller: Caller) {
    match scope {
        Scope::Upcoming => {
            query.push(" WHERE NOT is_end AND ");
            query.push_bind(caller.user_id);
            query.push(" = ANY(processors)");
        }
        Scope::MyCreate => {
            query.push(" WHERE creator_id = ");
            query.push_bind(caller.user_id);
        }
        Scope::Related => {
            query.push(" WHERE ");
            query.push_bind(caller.user_id);
            query.push(" = ANY(related_users)");
        }
        Scope::All => {}
    }
}

#[async_trait]
impl TicketListing for PgTicketListing {
    async fn total_count(&self, scope: Scope, caller: Caller) -> StatsResult<i64> {
        let mut query =
            QueryBuilder::new("SELECT COUNT(*) AS total_count FROM ticket_dashboard.tickets");
        push_scope_filter(&mut query, scope, caller);

        let row = query
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(StatsError::Query)?;
        debug!(
            scope = scope.code(),
            user_id = caller.user_id,
            "total_count"
        );

        column(&row, "total_count")
    }
}

pub async fn seed(pool: &PgPool, today: NaiveDate) -> anyhow::Result<usize> {
    let users = vec![
        User {
            id: 1,
            username: "admin".to_string(),
            nick_name: "Administrator".to_string(),
        },
        User {
            id: 2,
            username: "avery.lee".to_string(),
            nick_name: "Avery Lee".to_string(),
        },
        User {
            id: 3,
            username: "jules.moreno".to_string(),
            nick_name: "Jules Moreno".to_string(),
        },
        User {
            id: 4,
            username: "kiara.patel".to_string(),
            nick_name: "Kiara Patel".to_string(),
        },
    ];
    let processes = vec![
        Process {
            id: 1,
            name: "Server access request".to_string(),
        },
        Process {
            id: 2,
            name: "Leave approval".to_string(),
        },
        Process {
            id: 3,
            name: "Database change".to_string(),
        },
    ];

    for user in &users {
        sqlx::query(
            r#"
            INSERT INTO ticket_dashboard.users (id, username, nick_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET username = EXCLUDED.username, nick_name = EXCLUDED.nick_name
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.nick_name)
        .execute(pool)
        .await?;
    }

    for process in &processes {
        sqlx::query(
            r#"
            INSERT INTO ticket_dashboard.processes (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(process.id)
        .bind(&process.name)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        "SELECT setval(pg_get_serial_sequence('ticket_dashboard.users', 'id'), \
         (SELECT MAX(id) FROM ticket_dashboard.users))",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "SELECT setval(pg_get_serial_sequence('ticket_dashboard.processes', 'id'), \
         (SELECT MAX(id) FROM ticket_dashboard.processes))",
    )
    .execute(pool)
    .await?;

    // (creator, process, days ago, hour, completed)
    let plan: [(i64, i64, u64, u32, bool); 12] = [
        (2, 1, 0, 9, false),
        (2, 1, 0, 11, false),
        (3, 2, 0, 14, true),
        (4, 1, 1, 10, true),
        (2, 3, 1, 16, false),
        (3, 1, 2, 8, true),
        (2, 2, 3, 13, true),
        (4, 3, 3, 15, false),
        (2, 1, 5, 9, true),
        (3, 1, 6, 17, true),
        (4, 2, 6, 10, false),
        (2, 1, 12, 9, true),
    ];

    let mut inserted = 0usize;
    for (index, planned) in plan.into_iter().enumerate() {
        let (creator_id, process_id, days_ago, hour, completed) = planned;
        let date = today
            .checked_sub_days(Days::new(days_ago))
            .context("seed date out of range")?;
        let time = NaiveTime::from_hms_opt(hour, 0, 0).context("invalid seed hour")?;
        let ticket = Ticket {
            id: index as i64 + 1,
            creator_id,
            process_id,
            create_time: NaiveDateTime::new(date, time),
            completed,
        };
        let title = processes
            .iter()
            .find(|process| process.id == ticket.process_id)
            .map(|process| format!("{} #{}", process.name, ticket.id))
            .unwrap_or_else(|| format!("Ticket #{}", ticket.id));
        let handler = if ticket.completed { None } else { Some(1i64) };

        let source_key = format!("seed-{:03}", ticket.id);
        if insert_ticket(pool, &ticket, &title, handler, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Inserts one ticket, keeping the creator and any current handler on its
/// related list. Returns false when `source_key` was already loaded.
async fn insert_ticket(
    pool: &PgPool,
    ticket: &Ticket,
    title: &str,
    handler: Option<i64>,
    source_key: &str,
) -> anyhow::Result<bool> {
    let processors: Vec<i64> = handler.into_iter().collect();
    let mut related = vec![ticket.creator_id];
    related.extend(handler.filter(|id| *id != ticket.creator_id));

    let result = sqlx::query(
        r#"
        INSERT INTO ticket_dashboard.tickets
        (title, creator_id, process_id, create_time, is_end, processors, related_users, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(title)
    .bind(ticket.creator_id)
    .bind(ticket.process_id)
    .bind(ticket.create_time)
    .bind(ticket.completed)
    .bind(&processors)
    .bind(&related)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn upsert_user(pool: &PgPool, username: &str, nick_name: &str) -> anyhow::Result<i64> {
    let id: i64 = sqlx::query(
        r#"
        INSERT INTO ticket_dashboard.users (username, nick_name)
        VALUES ($1, $2)
        ON CONFLICT (username) DO UPDATE
        SET nick_name = CASE WHEN EXCLUDED.nick_name = '' THEN ticket_dashboard.users.nick_name
                             ELSE EXCLUDED.nick_name END
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(nick_name)
    .fetch_one(pool)
    .await?
    .try_get("id")?;
    Ok(id)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        title: String,
        creator_username: String,
        creator_nick_name: String,
        process_name: String,
        create_time: String,
        completed: bool,
        handler_username: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let create_time = parse_bound(&row.create_time, Bound::Start)
            .with_context(|| format!("row {}: bad create_time", line + 1))?;

        let creator_id = upsert_user(pool, &row.creator_username, &row.creator_nick_name).await?;
        let handler = match row.handler_username.as_deref().map(str::trim) {
            Some(username) if !username.is_empty() => {
                Some(upsert_user(pool, username, "").await?)
            }
            _ => None,
        };

        let process_id: i64 = sqlx::query(
            r#"
            INSERT INTO ticket_dashboard.processes (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(&row.process_name)
        .fetch_one(pool)
        .await?
        .try_get("id")?;

        let ticket = Ticket {
            id: 0,
            creator_id,
            process_id,
            create_time,
            completed: row.completed,
        };
        let source_key = row.source_key.unwrap_or_else(|| {
            format!(
                "import-{}-{}-{}",
                row.creator_username,
                create_time.format("%Y%m%d%H%M%S"),
                row.title
            )
        });

        if insert_ticket(pool, &ticket, &row.title, handler, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_filters_bind_the_caller() {
        let caller = Caller { user_id: 7 };
        let expected = [
            (Scope::Upcoming, "SELECT COUNT(*) FROM t WHERE NOT is_end AND $1 = ANY(processors)"),
            (Scope::MyCreate, "SELECT COUNT(*) FROM t WHERE creator_id = $1"),
            (Scope::Related, "SELECT COUNT(*) FROM t WHERE $1 = ANY(related_users)"),
            (Scope::All, "SELECT COUNT(*) FROM t"),
        ];

        for (scope, sql) in expected {
            let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM t");
            push_scope_filter(&mut query, scope, caller);
            assert_eq!(query.sql(), sql, "{scope}");
        }
    }

    #[test]
    fn schema_defaults_create_time_to_utc() {
        let schema = include_str!("../migrations/0001_init.sql");
        let column = "create_time TIMESTAMP NOT NULL DEFAULT (now() AT TIME ZONE 'UTC')";
        assert!(schema.contains(column));
    }
}
