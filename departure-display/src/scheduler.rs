use crate::sink::{DisplaySink, Sink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// How long each line stays up unless configured otherwise.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Rotates a list of lines on a [`DisplaySink`].
///
/// At most one rotation is alive at any time.
/// The sink's setup runs once per scheduler, before the first line is written.
pub struct DisplayScheduler<S = Sink> {
    sink: Arc<S>,
    interval: Duration,
    /// Set once a rotation's setup call has returned, successfully or not.
    setup_done: Arc<AtomicBool>,
    rotation: Option<JoinHandle<()>>,
}

impl<S: DisplaySink> DisplayScheduler<S> {
    pub fn new(sink: S) -> Self {
        Self::with_interval(sink, DEFAULT_INTERVAL)
    }

    pub fn with_interval(sink: S, interval: Duration) -> Self {
        Self {
            sink: Arc::new(sink),
            interval,
            setup_done: Arc::new(AtomicBool::new(false)),
            rotation: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a rotation is currently alive.
    pub fn is_running(&self) -> bool {
        self.rotation
            .as_ref()
            .is_some_and(|rotation| !rotation.is_finished())
    }

    /// Replaces the lines being rotated.
    ///
    /// The current rotation (if any) is stopped before this returns,
    /// and won't write anything further.
    /// The new rotation starts from the first line.
    /// An empty list leaves the display alone until the next call.
    pub async fn show(&mut self, lines: Vec<String>) {
        self.cancel().await;

        if lines.is_empty() {
            debug!("Nothing to show; display is idle");
            return;
        }

        debug!(lines = lines.len(), "Starting display rotation");
        self.rotation = Some(tokio::spawn(rotate(
            Arc::clone(&self.sink),
            lines,
            self.interval,
            Arc::clone(&self.setup_done),
        )));
    }

    async fn cancel(&mut self) {
        let Some(rotation) = self.rotation.take() else {
            return;
        };

        rotation.abort();
        // Aborting only requests cancellation; wait until the task is really gone.
        if let Err(e) = rotation.await
            && e.is_panic()
        {
            error!("Display rotation panicked: {e}");
        }
    }
}

impl<S> Drop for DisplayScheduler<S> {
    fn drop(&mut self) {
        if let Some(rotation) = &self.rotation {
            rotation.abort();
        }
    }
}

async fn rotate<S: DisplaySink>(
    sink: Arc<S>,
    lines: Vec<String>,
    interval: Duration,
    setup_done: Arc<AtomicBool>,
) {
    // Only a setup call that returned counts; one cut short by cancellation is redone next rotation
    if !setup_done.load(Ordering::SeqCst) {
        let result = sink.setup().await;
        setup_done.store(true, Ordering::SeqCst);
        if let Err(e) = result {
            warn!("Display setup failed; continuing without it: {e}");
        }
    }

    for line in lines.iter().cycle() {
        if let Err(e) = sink.write(line).await {
            warn!(line = line.as_str(), "Unable to display line: {e}");
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SinkError;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Recorded {
        writes: Mutex<Vec<String>>,
        setups: AtomicUsize,
        completed_setups: AtomicUsize,
    }

    /// Records everything; optionally fails setup and writes of one particular line.
    #[derive(Clone, Default)]
    struct RecordingSink {
        recorded: Arc<Recorded>,
        fail_setup: bool,
        fail_line: Option<&'static str>,
        /// How long the display takes to answer the setup call.
        setup_delay: Duration,
    }

    impl RecordingSink {
        fn writes(&self) -> Vec<String> {
            self.recorded.writes.lock().expect("not poisoned").clone()
        }

        fn setups(&self) -> usize {
            self.recorded.setups.load(Ordering::SeqCst)
        }

        fn completed_setups(&self) -> usize {
            self.recorded.completed_setups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DisplaySink for RecordingSink {
        async fn setup(&self) -> Result<(), SinkError> {
            self.recorded.setups.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.setup_delay).await;
            self.recorded.completed_setups.fetch_add(1, Ordering::SeqCst);
            if self.fail_setup {
                Err(SinkError::Status(StatusCode::SERVICE_UNAVAILABLE))
            } else {
                Ok(())
            }
        }

        async fn write(&self, text: &str) -> Result<(), SinkError> {
            self.recorded
                .writes
                .lock()
                .expect("not poisoned")
                .push(text.to_string());
            if self.fail_line == Some(text) {
                Err(SinkError::Status(StatusCode::BAD_GATEWAY))
            } else {
                Ok(())
            }
        }
    }

    fn lines(lines: &[&str]) -> Vec<String> {
        lines.iter().map(ToString::to_string).collect()
    }

    async fn wait_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn rotates_with_wrap_around() {
        let sink = RecordingSink::default();
        let mut scheduler = DisplayScheduler::new(sink.clone());

        scheduler.show(lines(&["A", "B", "C"])).await;
        wait_ms(6_500).await;

        assert_eq!(sink.writes(), ["A", "B", "C", "A"]);
        assert!(scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn replacement_mid_cycle() {
        let sink = RecordingSink::default();
        let mut scheduler = DisplayScheduler::new(sink.clone());

        scheduler.show(lines(&["A", "B"])).await;
        wait_ms(4_500).await;
        assert_eq!(sink.writes(), ["A", "B", "A"]);

        scheduler.show(lines(&["C"])).await;
        wait_ms(5_000).await;

        assert_eq!(sink.writes(), ["A", "B", "A", "C", "C", "C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_replacement_never_shows_old_lines() {
        let sink = RecordingSink::default();
        let mut scheduler = DisplayScheduler::new(sink.clone());

        scheduler.show(lines(&["A", "B"])).await;
        scheduler.show(lines(&["C"])).await;
        wait_ms(3_000).await;

        // One write per interval means a single writer
        assert_eq!(sink.writes(), ["C", "C"]);
        assert_eq!(sink.setups(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn setup_interrupted_by_replacement_is_redone() {
        let sink = RecordingSink {
            setup_delay: Duration::from_millis(500),
            ..RecordingSink::default()
        };
        let mut scheduler = DisplayScheduler::new(sink.clone());
        assert_eq!(scheduler.interval(), DEFAULT_INTERVAL);

        scheduler.show(lines(&["A"])).await;
        wait_ms(100).await;
        scheduler.show(lines(&["B"])).await;
        wait_ms(10_000).await;

        assert_eq!(sink.setups(), 2);
        assert_eq!(sink.completed_setups(), 1);
        // Writes start once the second setup has finished, at 0.6 s
        assert_eq!(sink.writes(), ["B"; 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_list_writes_nothing() {
        let sink = RecordingSink::default();
        let mut scheduler = DisplayScheduler::new(sink.clone());

        scheduler.show(lines(&["A"])).await;
        wait_ms(1_000).await;
        scheduler.show(vec![]).await;
        wait_ms(10_000).await;

        assert_eq!(sink.writes(), ["A"]);
        assert!(!scheduler.is_running());

        scheduler.show(lines(&["B"])).await;
        wait_ms(1_000).await;
        assert_eq!(sink.writes(), ["A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn setup_runs_once_even_if_it_fails() {
        let sink = RecordingSink {
            fail_setup: true,
            ..RecordingSink::default()
        };
        let mut scheduler = DisplayScheduler::new(sink.clone());

        scheduler.show(vec![]).await;
        assert_eq!(sink.setups(), 0);

        for round in ["A", "B", "C"] {
            scheduler.show(lines(&[round])).await;
            wait_ms(1_000).await;
        }

        assert_eq!(sink.setups(), 1);
        assert_eq!(sink.writes(), ["A", "B", "C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_writes_do_not_stop_the_rotation() {
        let sink = RecordingSink {
            fail_line: Some("B"),
            ..RecordingSink::default()
        };
        let mut scheduler = DisplayScheduler::with_interval(sink.clone(), Duration::from_secs(1));

        scheduler.show(lines(&["A", "B"])).await;
        wait_ms(3_500).await;

        assert_eq!(sink.writes(), ["A", "B", "A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_scheduler_stops_the_rotation() {
        let sink = RecordingSink::default();
        let mut scheduler = DisplayScheduler::new(sink.clone());

        scheduler.show(lines(&["A"])).await;
        wait_ms(1_000).await;
        drop(scheduler);
        wait_ms(10_000).await;

        assert_eq!(sink.writes(), ["A"]);
    }
}
