use {
    crate::aggregator::Aggregator,
    crate::event::current_timestamp,
    crate::lag::LagMonitor,
    crate::report::ReportSink,
    crate::stream::StreamConsumer,
    std::{sync::Arc, time::Duration},
    tokio::task::JoinHandle,
};

/// Periodic driver of the whole monitor
///
/// Each cycle spawns the lag refresh, computes the window snapshot,
/// renders the report, and supervises the stream consumer. The report
/// always reflects a completed snapshot; the lag value is whatever the
/// cache holds when the report goes out. The lag task is joined only
/// after the cycle's sleep, so it can run through the idle time but can
/// never overlap the next cycle's refresh.
pub struct Scheduler {
    sleep_per_step: Duration,
    aggregator: Aggregator,
    lag_monitor: Arc<LagMonitor>,
    consumer: StreamConsumer,
    sink: Arc<dyn ReportSink + Send + Sync>,
}

impl Scheduler {
    pub fn new(
        sleep_per_step: Duration,
        aggregator: Aggregator,
        lag_monitor: Arc<LagMonitor>,
        consumer: StreamConsumer,
        sink: Arc<dyn ReportSink + Send + Sync>,
    ) -> Self {
        Self {
            sleep_per_step,
            aggregator,
            lag_monitor,
            consumer,
            sink,
        }
    }

    /// Run report cycles until the process is stopped
    pub async fn run(mut self) {
        log::info!(
            "⏰ Starting report scheduler (every {} s)",
            self.sleep_per_step.as_secs()
        );

        loop {
            let lag_handle = self.run_cycle().await;

            tokio::time::sleep(self.sleep_per_step).await;

            // A refresh must be finished before the next cycle spawns one
            if let Err(e) = lag_handle.await {
                log::warn!("Lag refresh task failed: {}", e);
            }
        }
    }

    /// One report cycle, minus the sleep
    ///
    /// Returns the in-flight lag refresh so the caller controls when it
    /// is joined.
    async fn run_cycle(&mut self) -> JoinHandle<()> {
        let lag_monitor = self.lag_monitor.clone();
        let lag_handle = tokio::spawn(async move { lag_monitor.refresh().await });

        // Aggregation is CPU-bound and fast; it runs on this task while
        // the lag poll does its network wait elsewhere
        let snapshot = self.aggregator.snapshot(current_timestamp());
        let lag = self.lag_monitor.current().await;

        if let Err(e) = self.sink.render(&snapshot, &lag).await {
            log::error!("❌ Failed to render report: {}", e);
        }

        self.consumer.ensure_running().await;

        lag_handle
    }
}
