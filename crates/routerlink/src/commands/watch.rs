//! `watch`: follow live telemetry for one device.
//!
//! Wires a `SubscriptionManager` to a `DeviceWatch` (subscription lifecycle)
//! and a `TelemetryStore` (bounded per-device windows), then prints every
//! envelope for the watched device until `--count`, Ctrl-C, or a terminal
//! stream error.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use routerlink_api::{StreamConfig, StreamError, StreamEvent, SubscriptionManager};
use routerlink_core::{DeviceWatch, TelemetryStore};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    args: WatchArgs,
    stream: StreamConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let manager = SubscriptionManager::new(stream);
    let device = Arc::new(DeviceWatch::new(manager.clone()));
    let store = Arc::new(TelemetryStore::new());
    let cancel = CancellationToken::new();

    let mut events = manager.events();
    device.select(Some(&args.device_id));

    let follower = {
        let device = Arc::clone(&device);
        let state = manager.watch_state();
        let cancel = cancel.clone();
        tokio::spawn(async move { device.follow(state, cancel).await })
    };
    let recorder = {
        let store = Arc::clone(&store);
        let events = manager.events();
        let cancel = cancel.clone();
        tokio::spawn(async move { store.run(events, cancel).await })
    };

    info!(url = %manager.config().url, device = %args.device_id, "watching device");
    manager.connect();

    let result = pump(&mut events, &args, global).await;

    device.release();
    manager.disconnect();
    cancel.cancel();
    let _ = follower.await;
    let _ = recorder.await;

    if let Some(seen) = store.device(&args.device_id) {
        debug!(
            device = %seen.device_id,
            metrics = seen.metrics.len(),
            interface_metrics = seen.interface_metrics.len(),
            "watch finished"
        );
    }
    result
}

async fn pump(
    events: &mut tokio::sync::broadcast::Receiver<StreamEvent>,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut printed = 0usize;

    loop {
        tokio::select! {
            biased;
            _ = &mut ctrl_c => return Ok(()),
            event = events.recv() => match event {
                Ok(StreamEvent::Message(envelope)) => {
                    if envelope.device_id.as_deref() != Some(args.device_id.as_str()) {
                        continue;
                    }
                    output::print(global.output, envelope.as_ref())?;
                    printed += 1;
                    if args.count.is_some_and(|max| printed >= max) {
                        return Ok(());
                    }
                }
                Ok(StreamEvent::Connected) => info!("telemetry stream connected"),
                Ok(StreamEvent::Disconnected { code, reason, .. }) => {
                    warn!(?code, %reason, "telemetry stream disconnected");
                }
                Ok(StreamEvent::Error(
                    err @ (StreamError::ReconnectLimitReached { .. } | StreamError::InvalidUrl(_)),
                )) => return Err(err.into()),
                Ok(StreamEvent::Error(err)) => warn!(error = %err, "telemetry stream error"),
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "watch output lagged"),
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    }
}
