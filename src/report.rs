use {
    crate::aggregator::{format_len, Snapshot},
    crate::event::current_timestamp,
    crate::lag::LagState,
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    std::fmt::Write,
};

/// Destination for the periodic report
///
/// A trait object so the scheduler does not care whether reports go to
/// a console, a log file, or a test recorder.
#[async_trait]
pub trait ReportSink {
    async fn render(
        &self,
        snapshot: &Snapshot,
        lag: &LagState,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Plain-text console renderer
pub struct ConsoleReport {
    top_n: usize,
}

impl ConsoleReport {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }
}

#[async_trait]
impl ReportSink for ConsoleReport {
    async fn render(
        &self,
        snapshot: &Snapshot,
        lag: &LagState,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("{}", render_report(snapshot, lag, self.top_n)?);
        Ok(())
    }
}

/// Format one report block
///
/// Layout: UTC header, lag line with the age of the cached value,
/// window totals, then the ranked user table.
fn render_report(
    snapshot: &Snapshot,
    lag: &LagState,
    top_n: usize,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let generated: DateTime<Utc> = DateTime::from_timestamp(snapshot.generated_at, 0)
        .ok_or("report timestamp out of range")?;

    let mut out = String::new();
    writeln!(out)?;
    writeln!(out, "== {} (UTC) ==", generated.format("%Y-%m-%d %H:%M:%S"))?;

    if lag.last_polled_at == 0 {
        writeln!(out, "Maxlag: n/a (no completed poll yet)")?;
    } else {
        writeln!(
            out,
            "Maxlag: {:.1} (requested {} s ago)",
            lag.lag_seconds,
            current_timestamp() - lag.last_polled_at
        )?;
    }

    writeln!(
        out,
        "Total edits in past {} s: {} by {} users",
        snapshot.timeframe, snapshot.total_edits, snapshot.distinct_users
    )?;
    writeln!(
        out,
        "Total new len in past {} s: {}",
        snapshot.timeframe,
        format_len(snapshot.total_bytes)
    )?;

    writeln!(out, "Top {} users by edit rate (1/min):", top_n)?;
    if snapshot.top_users.is_empty() {
        writeln!(out, "  (no edits in window)")?;
    }
    for stat in &snapshot.top_users {
        writeln!(
            out,
            "  {:<25} {:>5} {:>3} {:>12}",
            stat.user,
            stat.edit_count,
            if stat.is_bot { "bot" } else { "" },
            stat.formatted_bytes
        )?;
    }

    Ok(out)
}
