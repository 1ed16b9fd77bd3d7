use {
    crate::event::EditEvent,
    crate::window::EventWindow,
    std::{collections::HashMap, sync::Arc},
};

/// Per-user totals derived from the current window
#[derive(Debug, Clone)]
pub struct UserStat {
    pub user: String,
    pub edit_count: u64,
    /// Bot status is whatever the earliest event for this user reported,
    /// in case an account flips between bot and non-bot inside the window
    pub is_bot: bool,
    pub total_bytes: u64,
    pub formatted_bytes: String,
}

/// Immutable aggregate over the window contents at one point in time
///
/// Recomputed wholesale each cycle; the latest value wins.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generated_at: i64,
    pub timeframe: i64,
    pub total_edits: u64,
    pub total_bytes: u64,
    pub distinct_users: usize,
    /// At most top-N entries, edit count descending, ties in
    /// first-appearance order
    pub top_users: Vec<UserStat>,
}

struct UserAccumulator {
    edit_count: u64,
    is_bot: bool,
    total_bytes: u64,
}

/// Derives snapshots from the event window
///
/// Owns the window; the stream consumer only ever appends to it.
pub struct Aggregator {
    window: Arc<EventWindow>,
    timeframe: i64,
    top_n: usize,
}

impl Aggregator {
    pub fn new(window: Arc<EventWindow>, timeframe: i64, top_n: usize) -> Self {
        Self {
            window,
            timeframe,
            top_n,
        }
    }

    /// Purge the window and compute totals plus the top-user ranking
    ///
    /// An empty window is a normal state and yields zero totals with an
    /// empty top list.
    pub fn snapshot(&self, now: i64) -> Snapshot {
        let view = self.window.snapshot_raw(now, self.timeframe);

        let total_edits = view.len() as u64;
        let total_bytes: u64 = view.iter().map(|e| e.new_len).sum();

        let (mut stats, order) = group_by_user(&view);
        let distinct_users = order.len();

        let mut top_users: Vec<UserStat> = Vec::with_capacity(order.len());
        for user in order {
            if let Some(acc) = stats.remove(&user) {
                top_users.push(UserStat {
                    formatted_bytes: format_len(acc.total_bytes),
                    user,
                    edit_count: acc.edit_count,
                    is_bot: acc.is_bot,
                    total_bytes: acc.total_bytes,
                });
            }
        }

        // sort_by is stable: equal counts keep first-appearance order
        top_users.sort_by(|a, b| b.edit_count.cmp(&a.edit_count));
        top_users.truncate(self.top_n);

        Snapshot {
            generated_at: now,
            timeframe: self.timeframe,
            total_edits,
            total_bytes,
            distinct_users,
            top_users,
        }
    }
}

/// Group window entries into per-user accumulators
///
/// Returns the accumulator map together with the user names in
/// first-appearance order, which later drives tie-breaking and the
/// sticky bot flag.
fn group_by_user(view: &[EditEvent]) -> (HashMap<String, UserAccumulator>, Vec<String>) {
    let mut stats: HashMap<String, UserAccumulator> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for event in view {
        let acc = stats.entry(event.user.clone()).or_insert_with(|| {
            order.push(event.user.clone());
            UserAccumulator {
                edit_count: 0,
                is_bot: event.is_bot,
                total_bytes: 0,
            }
        });
        acc.edit_count += 1;
        acc.total_bytes += event.new_len;
    }

    (stats, order)
}

/// Render a byte count in the unit it fits
///
/// Boundaries are inclusive on the low side: exactly 1024 stays bytes,
/// exactly 1024^2 stays kibibytes.
pub fn format_len(length: u64) -> String {
    if length <= 1024 {
        return format!("{} B", length);
    }

    if length <= 1024 * 1024 {
        return format!("{:.2} kiB", length as f64 / 1024.0);
    }

    format!("{:.2} MiB", length as f64 / 1024.0 / 1024.0)
}
