//! Inactivity tracking for authenticated sessions.
//!
//! One timer per session. Any qualifying [`ActivityEvent`] pushes the
//! deadline back; when the window passes without activity the timer runs
//! its callback (a forced logout) exactly once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Inactivity window used when none is configured.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// User interactions that count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityEvent {
    MouseDown,
    KeyPress,
    Scroll,
    TouchStart,
}

impl ActivityEvent {
    pub const ALL: [ActivityEvent; 4] = [
        ActivityEvent::MouseDown,
        ActivityEvent::KeyPress,
        ActivityEvent::Scroll,
        ActivityEvent::TouchStart,
    ];

    /// DOM event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityEvent::MouseDown => "mousedown",
            ActivityEvent::KeyPress => "keypress",
            ActivityEvent::Scroll => "scroll",
            ActivityEvent::TouchStart => "touchstart",
        }
    }
}

/// Single-slot idle timer.
#[derive(Debug)]
pub struct IdleTimer {
    window: Duration,
    state: Arc<Mutex<TimerState>>,
}

#[derive(Debug)]
struct TimerState {
    last_activity: Instant,
    /// Bumped on every start/stop; a task only fires for its own generation.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl IdleTimer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Arc::new(Mutex::new(TimerState {
                last_activity: Instant::now(),
                generation: 0,
                task: None,
            })),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arm the timer, replacing any armed one. Must be called inside a
    /// tokio runtime.
    pub fn start<F, Fut>(&self, on_idle: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.state.lock();
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.generation += 1;
        state.last_activity = Instant::now();

        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        let window = self.window;

        state.task = Some(tokio::spawn(async move {
            loop {
                let deadline = {
                    let state = shared.lock();
                    if state.generation != generation {
                        return;
                    }
                    state.last_activity + window
                };

                tokio::time::sleep_until(deadline).await;

                let expired = {
                    let mut state = shared.lock();
                    if state.generation != generation {
                        return;
                    }
                    let expired = Instant::now() >= state.last_activity + window;
                    if expired {
                        // Disarm before running the callback so that a stop()
                        // issued from inside it cannot abort this task.
                        state.task = None;
                    }
                    expired
                };

                if expired {
                    tracing::info!(window_secs = window.as_secs(), "Idle timeout reached");
                    on_idle().await;
                    return;
                }
            }
        }));
        tracing::debug!(window_secs = self.window.as_secs(), "Idle timer armed");
    }

    /// Push the deadline back. Returns false when no timer is armed.
    pub fn record_activity(&self, event: ActivityEvent) -> bool {
        let mut state = self.state.lock();
        if state.task.is_none() {
            return false;
        }
        state.last_activity = Instant::now();
        tracing::trace!(event = event.as_str(), "Activity recorded");
        true
    }

    /// Disarm without firing.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        if let Some(task) = state.task.take() {
            task.abort();
            tracing::debug!("Idle timer stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.state
            .lock()
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Time left before the timer fires, if armed.
    pub fn remaining(&self) -> Option<Duration> {
        let state = self.state.lock();
        state.task.as_ref()?;
        Some((state.last_activity + self.window).saturating_duration_since(Instant::now()))
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const WINDOW: Duration = Duration::from_secs(15 * 60);

    fn counting(
        fired: &Arc<AtomicUsize>,
    ) -> impl FnOnce() -> futures::future::Ready<()> + Send + 'static {
        let fired = Arc::clone(fired);
        move || {
            fired.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(())
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_before_deadline_prevents_logout() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = IdleTimer::new(WINDOW);
        timer.start(counting(&fired));
        settle().await;

        tokio::time::advance(Duration::from_secs(14 * 60 + 59)).await;
        assert!(timer.record_activity(ActivityEvent::MouseDown));
        settle().await;

        tokio::time::advance(Duration::from_secs(14 * 60 + 59)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(timer.is_active());

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_fires_exactly_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = IdleTimer::new(WINDOW);
        timer.start(counting(&fired));
        settle().await;

        tokio::time::advance(Duration::from_secs(15 * 60 + 1)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_active());

        tokio::time::advance(Duration::from_secs(60 * 60)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.record_activity(ActivityEvent::KeyPress));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = IdleTimer::new(WINDOW);
        timer.start(counting(&fired));
        settle().await;

        timer.stop();
        assert!(!timer.is_active());
        assert!(timer.remaining().is_none());

        tokio::time::advance(Duration::from_secs(20 * 60)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_timer() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let timer = IdleTimer::new(WINDOW);

        timer.start(counting(&first));
        settle().await;
        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        timer.start(counting(&second));
        settle().await;

        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        settle().await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(6 * 60)).await;
        settle().await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_tracks_activity() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = IdleTimer::new(WINDOW);
        timer.start(counting(&fired));

        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        assert_eq!(timer.remaining(), Some(Duration::from_secs(10 * 60)));

        timer.record_activity(ActivityEvent::Scroll);
        assert_eq!(timer.remaining(), Some(WINDOW));
    }

    #[test]
    fn test_event_names() {
        let names: Vec<_> = ActivityEvent::ALL.iter().map(|e| e.as_str()).collect();
        assert_eq!(names, ["mousedown", "keypress", "scroll", "touchstart"]);
    }
}
