//! Opening a site and watching its window.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use consent_core::launcher::SiteLauncher;
use consent_core::study::SiteRequest;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::events::UiEvent;
use crate::runtime::inbox::UiEventSender;

/// Waits `delay`, opens the site, then polls its window every
/// `poll_interval` until it closes or `cancel` fires.
///
/// `SiteOpened` (and `WatchFailed`) are sent through `inbox` while the task
/// runs; the returned event is the task result.
pub async fn watch_site(
    launcher: Arc<dyn SiteLauncher>,
    request: SiteRequest,
    delay: Duration,
    poll_interval: Duration,
    inbox: UiEventSender,
    cancel: Option<CancellationToken>,
) -> UiEvent {
    let cancel = cancel.unwrap_or_default();
    let index = request.index;

    if !delay.is_zero() {
        tokio::select! {
            () = cancel.cancelled() => return UiEvent::WatchStopped { index },
            () = tokio::time::sleep(delay) => {}
        }
    }

    let mut window = match launcher.open(&request.url) {
        Ok(window) => window,
        Err(e) => {
            return UiEvent::SiteOpenFailed {
                index,
                error: e.to_string(),
            };
        }
    };

    let needs_confirmation = window.needs_confirmation();
    let _ = inbox.send(UiEvent::SiteOpened {
        index,
        at: Utc::now(),
        needs_confirmation,
    });

    if needs_confirmation {
        cancel.cancelled().await;
        return UiEvent::WatchStopped { index };
    }

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = cancel.cancelled() => return UiEvent::WatchStopped { index },
            _ = ticker.tick() => {}
        }

        match window.is_closed() {
            Ok(true) => return UiEvent::SiteClosed { index },
            Ok(false) => {}
            Err(e) => {
                // Keep the window alive; the participant confirms closure instead.
                let _ = inbox.send(UiEvent::WatchFailed {
                    index,
                    error: e.to_string(),
                });
                cancel.cancelled().await;
                return UiEvent::WatchStopped { index };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use consent_core::launcher::{LaunchError, SiteWindow};
    use tokio::sync::mpsc;

    use super::*;

    /// Window that reports closed after a fixed number of polls.
    struct CountdownWindow {
        polls_left: usize,
        polls: Arc<AtomicUsize>,
    }

    impl SiteWindow for CountdownWindow {
        fn is_closed(&mut self) -> Result<bool, LaunchError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if self.polls_left == 0 {
                return Ok(true);
            }
            self.polls_left -= 1;
            Ok(false)
        }
    }

    struct ManualWindow;

    impl SiteWindow for ManualWindow {
        fn is_closed(&mut self) -> Result<bool, LaunchError> {
            Ok(false)
        }

        fn needs_confirmation(&self) -> bool {
            true
        }
    }

    struct FakeLauncher {
        opened: Mutex<Vec<String>>,
        polls: Arc<AtomicUsize>,
        polls_until_closed: usize,
        manual: bool,
        fail: bool,
    }

    impl FakeLauncher {
        fn new(polls_until_closed: usize) -> Self {
            Self {
                opened: Mutex::new(Vec::new()),
                polls: Arc::new(AtomicUsize::new(0)),
                polls_until_closed,
                manual: false,
                fail: false,
            }
        }
    }

    impl SiteLauncher for FakeLauncher {
        fn open(&self, url: &str) -> Result<Box<dyn SiteWindow>, LaunchError> {
            if self.fail {
                return Err(LaunchError::EmptyCommand);
            }
            self.opened.lock().unwrap().push(url.to_string());
            if self.manual {
                return Ok(Box::new(ManualWindow));
            }
            Ok(Box::new(CountdownWindow {
                polls_left: self.polls_until_closed,
                polls: Arc::clone(&self.polls),
            }))
        }
    }

    fn request() -> SiteRequest {
        SiteRequest {
            index: 1,
            url: "https://b.example".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_closure_detected_by_polling() {
        let launcher = Arc::new(FakeLauncher::new(3));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let result = watch_site(
            Arc::clone(&launcher) as Arc<dyn SiteLauncher>,
            request(),
            Duration::from_millis(500),
            Duration::from_millis(500),
            tx,
            Some(CancellationToken::new()),
        )
        .await;

        assert!(matches!(result, UiEvent::SiteClosed { index: 1 }));
        assert_eq!(launcher.polls.load(Ordering::SeqCst), 4);
        assert_eq!(*launcher.opened.lock().unwrap(), ["https://b.example"]);
        assert!(matches!(
            rx.try_recv(),
            Ok(UiEvent::SiteOpened {
                index: 1,
                needs_confirmation: false,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay_never_opens() {
        let launcher = Arc::new(FakeLauncher::new(0));
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = watch_site(
            Arc::clone(&launcher) as Arc<dyn SiteLauncher>,
            request(),
            Duration::from_secs(5),
            Duration::from_millis(500),
            tx,
            Some(cancel),
        )
        .await;

        assert!(matches!(result, UiEvent::WatchStopped { index: 1 }));
        assert!(launcher.opened.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling() {
        let launcher = Arc::new(FakeLauncher::new(usize::MAX));
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(watch_site(
            Arc::clone(&launcher) as Arc<dyn SiteLauncher>,
            request(),
            Duration::ZERO,
            Duration::from_millis(500),
            tx,
            Some(cancel.clone()),
        ));
        tokio::time::sleep(Duration::from_millis(1_600)).await;
        cancel.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, UiEvent::WatchStopped { index: 1 }));
        let polls = launcher.polls.load(Ordering::SeqCst);
        assert!((3..=5).contains(&polls), "polls = {polls}");
    }

    #[tokio::test]
    async fn test_open_failure_is_the_task_result() {
        let mut launcher = FakeLauncher::new(0);
        launcher.fail = true;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let result = watch_site(
            Arc::new(launcher),
            request(),
            Duration::ZERO,
            Duration::from_millis(500),
            tx,
            None,
        )
        .await;

        assert!(matches!(result, UiEvent::SiteOpenFailed { index: 1, .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_window_waits_for_cancel() {
        let mut launcher = FakeLauncher::new(0);
        launcher.manual = true;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(watch_site(
            Arc::new(launcher),
            request(),
            Duration::ZERO,
            Duration::from_millis(500),
            tx,
            Some(cancel.clone()),
        ));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!handle.is_finished());
        assert!(matches!(
            rx.try_recv(),
            Ok(UiEvent::SiteOpened {
                needs_confirmation: true,
                ..
            })
        ));

        cancel.cancel();
        assert!(matches!(
            handle.await.unwrap(),
            UiEvent::WatchStopped { index: 1 }
        ));
    }
}
