use std::time::Duration;

/// Tunables for the dashboard aggregations.
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Days covered by the rolling time series, today included.
    pub window_days: u32,
    /// Entries kept on the submitter leaderboard.
    pub leaderboard_size: usize,
    /// Entries kept on the process ranking.
    pub process_rank_limit: usize,
    /// Deadline applied to each store or listing query.
    pub query_timeout: Duration,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            leaderboard_size: 6,
            process_rank_limit: 10,
            query_timeout: Duration::from_secs(10),
        }
    }
}

impl StatsConfig {
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.query_timeout = Duration::from_secs(secs);
        self
    }
}
