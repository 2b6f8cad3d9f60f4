use std::fmt::Write;

use crate::models::{ProcessCount, Scope, ScopeCounts, SubmitterRank, TimeBucket, TimeRange};

pub struct DashboardReport<'a> {
    pub caller_label: &'a str,
    pub range: TimeRange,
    pub buckets: &'a [TimeBucket],
    pub scopes: ScopeCounts,
    pub submitters: &'a [SubmitterRank],
    pub processes: &'a [ProcessCount],
}

fn submitter_label(rank: &SubmitterRank) -> String {
    match (rank.nick_name.is_empty(), rank.username.is_empty()) {
        (false, false) => format!("{} ({})", rank.nick_name, rank.username),
        (true, false) => rank.username.clone(),
        (false, true) => rank.nick_name.clone(),
        (true, true) => format!("unknown user #{}", rank.user_id),
    }
}

const STAMP: &str = "%Y-%m-%d %H:%M:%S";

pub fn build_report(report: &DashboardReport<'_>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Ticket Dashboard Report");
    let _ = writeln!(
        output,
        "Generated for {} (processes ranked from {} to {})",
        report.caller_label,
        report.range.start.format(STAMP),
        report.range.end.format(STAMP)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Ticket Scopes");
    for scope in Scope::ALL {
        let _ = writeln!(output, "- {}: {}", scope.label(), report.scopes.get(scope));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Activity");
    if report.buckets.is_empty() {
        let _ = writeln!(output, "No days in this window.");
    } else {
        let _ = writeln!(output, "| Date | Created | Completed | Pending |");
        let _ = writeln!(output, "|------|---------|-----------|---------|");
        for bucket in report.buckets {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                bucket.date, bucket.total, bucket.completed, bucket.pending
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Submitters");
    if report.submitters.is_empty() {
        let _ = writeln!(output, "No tickets submitted yet.");
    } else {
        for rank in report.submitters {
            let _ = writeln!(output, "- {}: {} tickets", submitter_label(rank), rank.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Busiest Processes");
    if report.processes.is_empty() {
        let _ = writeln!(output, "No tickets created in this range.");
    } else {
        for (position, process) in report.processes.iter().enumerate() {
            let name = process.name.as_deref().unwrap_or("(deleted process)");
            let _ = writeln!(output, "{}. {}: {} tickets", position + 1, name, process.total);
        }
    }

    output
}
