mod aggregator;
mod config;
mod event;
mod lag;
mod report;
mod scheduler;
mod stream;
mod window;

use {
    aggregator::Aggregator,
    config::Config,
    lag::LagMonitor,
    report::{ConsoleReport, ReportSink},
    scheduler::Scheduler,
    std::{sync::Arc, time::Duration},
    stream::StreamConsumer,
    window::EventWindow,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so the report output on stdout stays clean
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    // Configuration problems abort before any background task starts
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Configuration error: {}", e);
            return Err(e.into());
        }
    };

    log::info!("🚀 Starting editflow...");
    log::info!("📊 Configuration:");
    log::info!("   Stream: {}", config.stream_url);
    log::info!("   Lag endpoint: {}", config.api_endpoint);
    log::info!("   Wiki: {}", config.wiki);
    log::info!(
        "   Window: {} s, report every {} s, lag refresh {} s, top {} users",
        config.timeframe,
        config.sleep_per_step,
        config.lag_refresh,
        config.top_users
    );

    let window = Arc::new(EventWindow::new());
    let aggregator = Aggregator::new(window.clone(), config.timeframe, config.top_users);

    let lag_monitor = Arc::new(LagMonitor::new(
        config.api_endpoint.clone(),
        config.lag_refresh,
        config.user_agent(),
    )?);

    let mut consumer = StreamConsumer::new(
        config.stream_url.clone(),
        config.wiki.clone(),
        window,
        config.user_agent(),
    )?;
    consumer.start();

    let sink: Arc<dyn ReportSink + Send + Sync> = Arc::new(ConsoleReport::new(config.top_users));

    let scheduler = Scheduler::new(
        Duration::from_secs(config.sleep_per_step),
        aggregator,
        lag_monitor,
        consumer,
        sink,
    );

    // The stream task holds nothing that needs explicit release; on
    // ctrl-c it is abandoned along with the scheduler
    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            log::info!("Stopped");
        }
    }

    Ok(())
}
