// ===============================
// src/scheduler.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : scheduler.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
License : MIT (see LICENSE)

Summary : Counts buy/sell events per item over HTTP, keeps one JSON file per
          day, mirrors the running totals into a single chat message that is
          edited in place, and starts a fresh tally at local midnight.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::sync::Arc;

use chrono::{DateTime, LocalResult, NaiveTime, TimeZone};
use chrono_tz::Tz;
use tokio::{
    select,
    sync::watch,
    time::{sleep, Duration},
};
use tracing::{debug, info, warn};

use crate::context::AppContext;
use crate::domain::DailyTally;
use crate::metrics::DAILY_RESETS;

// Longest single sleep. Every wake checks the date and recomputes the
// deadline, so a date change during a nap (suspend, clock step) is caught.
const MAX_NAP: Duration = Duration::from_secs(15 * 60);

/// First instant of the next local day. When local midnight does not exist
/// (DST gap) this is the first local time after it that does.
pub fn next_midnight(now: DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let fallback = now + chrono::Duration::hours(24);
    let Some(next_day) = now.date_naive().succ_opt() else {
        return fallback;
    };

    let mut probe = next_day.and_time(NaiveTime::MIN);
    for _ in 0..96 {
        match tz.from_local_datetime(&probe) {
            LocalResult::Single(t) => return t,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => probe += chrono::Duration::minutes(15),
        }
    }
    fallback
}

/// Replaces the tally when the local date changes.
///
/// Waiting -> (midnight) -> Resetting -> Waiting, until shutdown.
pub struct ResetScheduler {
    ctx: Arc<AppContext>,
}

impl ResetScheduler {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler: started");
        loop {
            let now = self.ctx.clock.now();
            let target = next_midnight(now);
            let wait = (target - now).to_std().unwrap_or(Duration::ZERO);
            let nap = wait.min(MAX_NAP);
            debug!(%target, wait_secs = wait.as_secs(), "scheduler: waiting");

            let slept = select! {
                _ = sleep(nap) => true,
                res = shutdown.changed() => {
                    if res.is_err() {
                        info!("scheduler: shutdown sender gone, stopped");
                        return;
                    }
                    false
                }
            };
            if *shutdown.borrow() {
                info!("scheduler: stopped");
                return;
            }
            if slept {
                // no-op unless the local date moved
                self.fire().await;
            }
        }
    }

    /// Resetting state. Returns false (and changes nothing) when the local
    /// date has not moved past the live tally's date yet.
    pub async fn fire(&self) -> bool {
        let today = self.ctx.clock.today();
        {
            let mut tally = self.ctx.tally.lock().await;
            if tally.date >= today {
                debug!(date = %tally.date, "scheduler: woke before the date changed");
                return false;
            }
            let old = std::mem::replace(&mut *tally, DailyTally::fresh(today, &self.ctx.catalog));
            info!(from = %old.date, to = %today, "scheduler: daily reset");
            if let Err(e) = self.ctx.store.save(&tally).await {
                warn!(error = %e, "scheduler: saving fresh tally failed");
            }
        }
        DAILY_RESETS.inc();

        // new day, new message
        let outcome = self.ctx.initialize_message().await;
        info!(outcome = outcome.as_str(), "scheduler: message cycle started");
        true
    }
}
