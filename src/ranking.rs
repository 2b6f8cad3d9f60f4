use std::time::Duration;

use tracing::debug;

use crate::error::StatsResult;
use crate::models::{CreatorCount, ProcessCount, SubmitterRank, TimeRange};
use crate::store::{bounded, TicketStore};

/// Orders creators by ticket count, smallest first, ties by creator id, and
/// keeps the first `limit`. Creators without a user row get empty names.
pub fn rank_submitters(mut counts: Vec<CreatorCount>, limit: usize) -> Vec<SubmitterRank> {
    counts.sort_by(|a, b| a.count.cmp(&b.count).then(a.creator_id.cmp(&b.creator_id)));

    counts
        .into_iter()
        .take(limit)
        .map(|count| SubmitterRank {
            user_id: count.creator_id,
            username: count.username.unwrap_or_default(),
            nick_name: count.nick_name.unwrap_or_default(),
            count: count.count,
        })
        .collect()
}

/// Orders processes by ticket total, largest first, ties by process id, and
/// keeps the first `limit`. Empty groups never rank.
pub fn rank_processes(mut counts: Vec<ProcessCount>, limit: usize) -> Vec<ProcessCount> {
    counts.retain(|count| count.total > 0);
    counts.sort_by(|a, b| b.total.cmp(&a.total).then(a.process_id.cmp(&b.process_id)));
    counts.truncate(limit);
    counts
}

pub async fn submit_ranking<S>(
    store: &S,
    limit: usize,
    timeout: Duration,
) -> StatsResult<Vec<SubmitterRank>>
where
    S: TicketStore + ?Sized,
{
    let counts = bounded("submitter counts", timeout, store.creator_counts()).await?;
    debug!(creators = counts.len(), limit, "ranking submitters");
    Ok(rank_submitters(counts, limit))
}

pub async fn process_ranking<S>(
    store: &S,
    range: TimeRange,
    limit: usize,
    timeout: Duration,
) -> StatsResult<Vec<ProcessCount>>
where
    S: TicketStore + ?Sized,
{
    let counts = bounded("process counts", timeout, store.process_counts(range)).await?;
    debug!(processes = counts.len(), start = %range.start, end = %range.end, "ranking processes");
    Ok(rank_processes(counts, limit))
}
