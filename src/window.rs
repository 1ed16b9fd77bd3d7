use {
    crate::event::EditEvent,
    std::sync::Mutex,
};

/// Shared store of recently seen edits
///
/// The stream consumer appends while the aggregator reads, so both
/// operations go through one mutex. Eviction is lazy: old entries are
/// dropped at snapshot time, driven purely by the event timestamp, never
/// by arrival order. Evict-and-read happens under a single lock
/// acquisition, so a snapshot can neither miss a concurrent append nor
/// expose a half-evicted view.
pub struct EventWindow {
    events: Mutex<Vec<EditEvent>>,
}

impl EventWindow {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Append an admitted event at the end of the sequence
    pub fn append(&self, event: EditEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Evict everything at or older than `now - timeframe`, then return
    /// the surviving entries in insertion order
    pub fn snapshot_raw(&self, now: i64, timeframe: i64) -> Vec<EditEvent> {
        let mut events = self.events.lock().unwrap();
        events.retain(|e| e.observed_at > now - timeframe);
        events.clone()
    }
}

impl Default for EventWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{current_timestamp, ChangeKind};
    use rand::Rng;
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    };

    fn make_event(observed_at: i64, user: &str, new_len: u64) -> EditEvent {
        EditEvent {
            observed_at,
            kind: ChangeKind::Edit,
            user: user.to_string(),
            is_bot: false,
            new_len,
        }
    }

    #[test]
    fn evicts_by_timestamp_not_position() {
        let window = EventWindow::new();
        // Out-of-order arrival: the late event lands first in the sequence
        window.append(make_event(170, "B", 10));
        window.append(make_event(100, "A", 500));
        window.append(make_event(101, "A", 300));

        let view = window.snapshot_raw(171, 60);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].user, "B");
    }

    #[test]
    fn boundary_event_is_evicted() {
        let window = EventWindow::new();
        // observed_at == now - timeframe is already outside the window
        window.append(make_event(111, "A", 1));
        window.append(make_event(112, "B", 1));

        let view = window.snapshot_raw(171, 60);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].user, "B");
    }

    #[test]
    fn snapshot_preserves_insertion_order() {
        let window = EventWindow::new();
        for (i, user) in ["C", "A", "B"].iter().enumerate() {
            window.append(make_event(1000 + i as i64, user, 1));
        }

        let view = window.snapshot_raw(1010, 60);
        let users: Vec<&str> = view.iter().map(|e| e.user.as_str()).collect();
        assert_eq!(users, vec!["C", "A", "B"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_append_and_snapshot_lose_nothing() {
        let window = Arc::new(EventWindow::new());
        let now = current_timestamp();
        let fresh_appended = Arc::new(AtomicU64::new(0));

        // Writers randomly interleave fresh events with already-stale ones
        let mut writers = Vec::new();
        for task_id in 0..4 {
            let window = window.clone();
            let fresh_appended = fresh_appended.clone();
            writers.push(tokio::spawn(async move {
                for i in 0..250 {
                    // ThreadRng must not live across an await point
                    if rand::thread_rng().gen_bool(0.8) {
                        window.append(make_event(now, &format!("user-{}", task_id), 1));
                        fresh_appended.fetch_add(1, Ordering::SeqCst);
                    } else {
                        // Older than the window; a snapshot may evict it
                        window.append(make_event(now - 7200, "stale", 1));
                    }
                    if i % 13 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }

        // Readers snapshot while writers are still appending
        let mut readers = Vec::new();
        for _ in 0..2 {
            let window = window.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let view = window.snapshot_raw(now, 3600);
                    // A view must never contain an evictable entry
                    assert!(view.iter().all(|e| e.observed_at > now - 3600));
                    if rand::thread_rng().gen_bool(0.5) {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }

        for handle in writers {
            handle.await.unwrap();
        }
        for handle in readers {
            handle.await.unwrap();
        }

        // Every fresh append survived the concurrent evictions
        let view = window.snapshot_raw(now, 3600);
        assert_eq!(view.len() as u64, fresh_appended.load(Ordering::SeqCst));
    }
}
