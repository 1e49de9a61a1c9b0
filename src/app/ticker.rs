//! Periodic simulation ticker

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::app::GameEngine;
use crate::util::time::Timer;

/// Tick the engine every `period` with the real time elapsed since the previous tick
pub async fn run(engine: Arc<GameEngine>, period: Duration) {
    info!(period_ms = period.as_millis() as u64, "Ticker started");

    let mut tick_interval = interval(period);
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick completes immediately
    tick_interval.tick().await;
    let mut last = Instant::now();

    loop {
        tick_interval.tick().await;
        let now = Instant::now();
        let delta = now - last;
        last = now;

        let timer = Timer::new();
        if let Err(e) = engine.tick(delta) {
            error!(error = %e, "Tick failed");
        }
        debug!(
            delta_ms = delta.as_millis() as u64,
            took_micros = timer.elapsed_micros(),
            "Tick complete"
        );
    }
}
