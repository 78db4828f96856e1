//! Search query for one run

use std::collections::BTreeSet;

use time::OffsetDateTime;

/// Issues updated after `last_run`, plus any ticket explicitly queued for a rerun.
pub fn build_query(last_run: OffsetDateTime, rerun_tickets: &BTreeSet<String>) -> String {
    let millis = last_run.unix_timestamp_nanos() / 1_000_000;
    let query = format!("updated > {}", millis);

    if rerun_tickets.is_empty() {
        return query;
    }

    let keys: Vec<&str> = rerun_tickets.iter().map(String::as_str).collect();
    format!("{} OR key in ({})", query, keys.join(","))
}
