use std::time::Duration;

use tracing::debug;

use crate::error::StatsResult;
use crate::models::{Caller, Scope, ScopeCounts};
use crate::store::{bounded, TicketListing};

async fn scope_total<L>(
    listing: &L,
    scope: Scope,
    caller: Caller,
    timeout: Duration,
) -> StatsResult<i64>
where
    L: TicketListing + ?Sized,
{
    bounded("scope count", timeout, listing.total_count(scope, caller))
        .await
        .map_err(|err| err.in_scope(scope))
}

/// Totals for the four listing scopes as seen by `caller`.
///
/// The scopes are counted concurrently and independently, so the four numbers
/// are not a single snapshot. The first failing scope fails the whole call.
pub async fn scope_counts<L>(
    listing: &L,
    caller: Caller,
    timeout: Duration,
) -> StatsResult<ScopeCounts>
where
    L: TicketListing + ?Sized,
{
    let (upcoming, my_create, related, all) = tokio::try_join!(
        scope_total(listing, Scope::Upcoming, caller, timeout),
        scope_total(listing, Scope::MyCreate, caller, timeout),
        scope_total(listing, Scope::Related, caller, timeout),
        scope_total(listing, Scope::All, caller, timeout),
    )?;

    debug!(
        user_id = caller.user_id,
        upcoming,
        my_create,
        related,
        all,
        "counted ticket scopes"
    );

    Ok(ScopeCounts {
        upcoming,
        my_create,
        related,
        all,
    })
}
