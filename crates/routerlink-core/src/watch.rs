// ── Device watch lifecycle ──
//
// One logical consumer of a shared `SubscriptionManager`: follows a single
// selected device, swapping subscriptions on change and re-issuing the
// subscribe after every reconnect (the manager does not replay them).

use std::sync::Mutex;

use routerlink_api::{ConnectionState, SubscriptionManager};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Tracks which device a consumer is watching on a shared stream.
#[derive(Debug)]
pub struct DeviceWatch {
    manager: SubscriptionManager,
    current: Mutex<Option<String>>,
}

impl DeviceWatch {
    pub fn new(manager: SubscriptionManager) -> Self {
        Self {
            manager,
            current: Mutex::new(None),
        }
    }

    pub fn manager(&self) -> &SubscriptionManager {
        &self.manager
    }

    pub fn current(&self) -> Option<String> {
        self.current.lock().expect("watch lock poisoned").clone()
    }

    /// Switch to `device` (or to nothing).
    ///
    /// While connected the previous device is unsubscribed and the new one
    /// subscribed. While disconnected only the selection is recorded; the
    /// subscribe goes out on the next connect. Returns `true` when the
    /// subscribe for the new device was sent.
    pub fn select(&self, device: Option<&str>) -> bool {
        let mut current = self.current.lock().expect("watch lock poisoned");
        if current.as_deref() == device {
            return false;
        }

        let previous = current.take();
        *current = device.map(str::to_owned);

        if !self.manager.is_connected() {
            debug!(?device, "selection recorded, stream not connected");
            return false;
        }

        if let Some(previous) = previous {
            self.manager.unsubscribe(&previous);
        }
        device.is_some_and(|id| self.manager.subscribe(id))
    }

    /// Re-issue the subscribe once the stream is back.
    pub fn on_connection_change(&self, connected: bool) -> bool {
        if !connected {
            return false;
        }
        let current = self.current.lock().expect("watch lock poisoned");
        match current.as_deref() {
            Some(id) => {
                info!(device = id, "resubscribing after connect");
                self.manager.subscribe(id)
            }
            None => false,
        }
    }

    /// Drop the selection, unsubscribing if the stream is up.
    pub fn release(&self) {
        let previous = self.current.lock().expect("watch lock poisoned").take();
        if let Some(id) = previous {
            if self.manager.is_connected() {
                self.manager.unsubscribe(&id);
            }
        }
    }

    /// Drive [`on_connection_change`](Self::on_connection_change) from the
    /// manager's state channel until cancelled.
    ///
    /// Keyed on the socket counter rather than `is_connected`, so a drop and
    /// reopen that completes between two wakeups still resubscribes.
    pub async fn follow(&self, mut state: watch::Receiver<ConnectionState>, cancel: CancellationToken) {
        let mut seen = None;

        loop {
            let (connected, opened) = {
                let s = state.borrow_and_update();
                (s.is_connected, s.connections)
            };
            if connected && seen != Some(opened) {
                seen = Some(opened);
                self.on_connection_change(true);
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use routerlink_api::StreamConfig;

    use super::*;

    fn watch() -> DeviceWatch {
        let config = StreamConfig::parse("ws://127.0.0.1:9/ws");
        DeviceWatch::new(SubscriptionManager::new(config.expect("valid url")))
    }

    #[test]
    fn selection_is_recorded_while_disconnected() {
        let w = watch();
        assert!(!w.select(Some("r1")));
        assert_eq!(w.current().as_deref(), Some("r1"));

        assert!(!w.select(Some("r2")));
        assert_eq!(w.current().as_deref(), Some("r2"));

        assert!(!w.on_connection_change(false));
        w.release();
        assert!(w.current().is_none());
    }

    #[test]
    fn reselecting_same_device_is_a_noop() {
        let w = watch();
        w.select(Some("r1"));
        assert!(!w.select(Some("r1")));
        assert!(!w.select(None) && w.current().is_none());
    }
}
