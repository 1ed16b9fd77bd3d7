use {
    crate::event,
    crate::window::EventWindow,
    eventsource_stream::{EventStreamError, Eventsource},
    futures::StreamExt,
    std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    std::time::Duration,
    tokio::task::JoinHandle,
};

/// Pause between a terminated read loop and its restart, so a flapping
/// connection does not turn into a restart storm
const RESTART_DELAY: Duration = Duration::from_secs(1);

/// Background consumer of the recent-change stream
///
/// `start` spawns the read loop and returns immediately; the loop runs
/// until the connection drops or the process stops. The health flag is
/// the supervision contract: a cleared flag means the loop has exited
/// (or is about to) and `ensure_running` may restart it.
///
/// Failure handling is deliberately asymmetric. Connection-level
/// failures (request errors, HTTP error statuses, transport errors
/// surfaced by the SSE decoder, clean end-of-stream) end the read loop
/// and leave restart to the supervisor. Anything else coming out of the
/// decoder means the source broke the SSE contract itself, which is an
/// unmodeled failure mode: the whole process exits non-zero rather than
/// silently re-subscribing to a misbehaving feed.
pub struct StreamConsumer {
    stream_url: String,
    wiki: String,
    window: Arc<EventWindow>,
    client: reqwest::Client,
    healthy: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StreamConsumer {
    pub fn new(
        stream_url: String,
        wiki: String,
        window: Arc<EventWindow>,
        user_agent: String,
    ) -> Result<Self, reqwest::Error> {
        // No overall timeout: the stream response is long-lived by design
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;

        Ok(Self {
            stream_url,
            wiki,
            window,
            client,
            healthy: Arc::new(AtomicBool::new(false)),
            handle: None,
        })
    }

    /// Spawn the background read loop and return immediately
    pub fn start(&mut self) {
        self.healthy.store(true, Ordering::SeqCst);

        self.handle = Some(tokio::spawn(read_stream(
            self.client.clone(),
            self.stream_url.clone(),
            self.wiki.clone(),
            self.window.clone(),
            self.healthy.clone(),
        )));
    }

    /// Whether the read loop is currently active
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    /// Supervision hook: restart the read loop if it has died
    ///
    /// Waits for the previous task to fully terminate before spawning a
    /// replacement, so two loops never feed the window at once.
    pub async fn ensure_running(&mut self) {
        if self.is_healthy() {
            return;
        }

        log::warn!("Restarting change stream ...");

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                log::warn!("Stream task ended abnormally: {}", e);
            }
        }

        tokio::time::sleep(RESTART_DELAY).await;
        self.start();
    }
}

async fn read_stream(
    client: reqwest::Client,
    stream_url: String,
    wiki: String,
    window: Arc<EventWindow>,
    healthy: Arc<AtomicBool>,
) {
    let response = match client.get(&stream_url).send().await {
        Ok(response) => response,
        Err(e) => {
            log::error!("❌ Stream connection failed: {}", e);
            healthy.store(false, Ordering::SeqCst);
            return;
        }
    };

    let response = match response.error_for_status() {
        Ok(response) => response,
        Err(e) => {
            log::error!("❌ Stream rejected by server: {}", e);
            healthy.store(false, Ordering::SeqCst);
            return;
        }
    };

    log::info!("✅ Connected to change stream");

    let mut events = response.bytes_stream().eventsource();

    while let Some(item) = events.next().await {
        match item {
            Ok(sse) => {
                // The feed multiplexes housekeeping kinds; only message
                // events carry changes
                if sse.event != "message" {
                    continue;
                }

                // Malformed payloads are expected noise, dropped one at
                // a time without ending the loop
                if let Some(edit) = event::decode_change(&sse.data, &wiki) {
                    window.append(edit);
                }
            }
            Err(EventStreamError::Transport(e)) => {
                log::error!("❌ Stream transport error: {}", e);
                healthy.store(false, Ordering::SeqCst);
                return;
            }
            Err(e) => {
                log::error!("❌ Unrecoverable stream error: {}", e);
                healthy.store(false, Ordering::SeqCst);
                std::process::exit(1);
            }
        }
    }

    log::warn!("⚠️  Change stream ended, awaiting restart");
    healthy.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::current_timestamp;

    fn make_consumer(url: &str) -> StreamConsumer {
        StreamConsumer::new(
            url.to_string(),
            "wikidatawiki".to_string(),
            Arc::new(EventWindow::new()),
            "editflow-test (test suite)".to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn failed_connection_clears_health_flag() {
        // Nothing listens on this port; the connect is refused at once
        let mut consumer = make_consumer("http://127.0.0.1:9/stream");
        consumer.start();
        assert!(consumer.is_healthy());

        // The read loop exits on the connection error
        if let Some(handle) = consumer.handle.take() {
            handle.await.unwrap();
        }
        assert!(!consumer.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_running_restarts_a_dead_loop() {
        let mut consumer = make_consumer("http://127.0.0.1:9/stream");
        consumer.start();
        if let Some(handle) = consumer.handle.take() {
            handle.await.unwrap();
        }
        assert!(!consumer.is_healthy());

        // Supervisor joins the old loop, pauses, and spawns a new one
        consumer.ensure_running().await;
        assert!(consumer.handle.is_some());
    }

    #[tokio::test]
    async fn ensure_running_leaves_a_healthy_loop_alone() {
        let mut consumer = make_consumer("http://127.0.0.1:9/stream");
        consumer.healthy.store(true, Ordering::SeqCst);

        let before = current_timestamp();
        consumer.ensure_running().await;
        // No restart delay was taken and no task was spawned
        assert!(current_timestamp() - before < 1);
        assert!(consumer.handle.is_none());
    }
}
