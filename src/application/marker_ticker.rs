use crate::application::planner_sync::NowProvider;
use crate::domain::marker::MarkerWindow;
use crate::domain::wall_clock::WallClockTime;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub fn current_marker(window: MarkerWindow, now_provider: &NowProvider) -> Option<u32> {
    let now = WallClockTime::from_naive_time(now_provider().time());
    window.minutes_since_anchor(now)
}

/// Recomputes the marker every `period` and publishes it. The task stops
/// once every receiver is dropped.
pub fn spawn_marker_ticker(
    window: MarkerWindow,
    now_provider: NowProvider,
    period: Duration,
) -> (watch::Receiver<Option<u32>>, JoinHandle<()>) {
    let (sender, receiver) = watch::channel(current_marker(window, &now_provider));
    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if sender.send(current_marker(window, &now_provider)).is_err() {
                break;
            }
        }
    });
    (receiver, handle)
}
