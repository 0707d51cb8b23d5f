//! Midnight rollover watcher.
//!
//! The claimed-today flag goes stale the moment the calendar day
//! changes. This task rechecks it on a short period and tells the
//! frontend when the daily reward has become available again.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::clock::Clock;
use crate::store::StateStore;

/// How often the watcher rechecks the calendar day.
pub const DEFAULT_ROLLOVER_PERIOD: Duration = Duration::from_secs(60);

/// Events emitted by the rollover watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloverEvent {
    /// The calendar day changed and the daily reward is claimable again.
    DayAdvanced {
        /// The new current day.
        today: NaiveDate,
    },
}

/// Periodically resyncs the claimed-today flag against the clock.
pub struct RolloverWatcher {
    store: StateStore,
    clock: Arc<dyn Clock>,
    period: Duration,
}

impl RolloverWatcher {
    /// Creates a watcher over `store` checking once a minute.
    pub fn new(store: StateStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            period: DEFAULT_ROLLOVER_PERIOD,
        }
    }

    /// Overrides the recheck period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Runs until the receiving side goes away, sending an event for
    /// every observed day change.
    pub async fn run(self, sender: mpsc::Sender<RolloverEvent>) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if sender.is_closed() {
                break;
            }
            let today = self.clock.today();
            if self.store.refresh_daily_flag(today) {
                debug!(%today, "day rolled over");
                if sender.send(RolloverEvent::DayAdvanced { today }).await.is_err() {
                    break;
                }
            }
        }
        debug!("rollover watcher stopped");
    }
}
