use std::time::Duration;

use thiserror::Error;

use crate::models::Scope;

pub type StatsResult<T> = Result<T, StatsError>;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("ticket store query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("could not decode column `{column}`: {source}")]
    Decode {
        column: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("{scope} count failed: {source}")]
    Scope {
        scope: Scope,
        #[source]
        source: Box<StatsError>,
    },

    #[error("{operation} did not finish within {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("unrecognised time `{0}`, expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS")]
    InvalidTime(String),

    #[error("start time {start} is after end time {end}")]
    InvalidRange { start: String, end: String },

    #[error("{0}")]
    InvalidArgument(String),
}

impl StatsError {
    pub fn in_scope(self, scope: Scope) -> Self {
        StatsError::Scope {
            scope,
            source: Box::new(self),
        }
    }
}
