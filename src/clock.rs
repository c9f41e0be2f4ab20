// ===============================
// src/clock.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : clock.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
License : MIT (see LICENSE)

Summary : Counts buy/sell events per item over HTTP, keeps one JSON file per
          day, mirrors the running totals into a single chat message that is
          edited in place, and starts a fresh tally at local midnight.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Wall clock in the configured zone. Everything date-related goes through here.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use chrono::{DateTime, TimeZone};
    use chrono_tz::Tz;

    use super::Clock;

    /// Clock that only moves when told to.
    pub struct ManualClock(Mutex<DateTime<Tz>>);

    impl ManualClock {
        pub fn at(tz: Tz, y: i32, m: u32, d: u32, hh: u32, mm: u32) -> Self {
            let t = tz.with_ymd_and_hms(y, m, d, hh, mm, 0).single().unwrap();
            Self(Mutex::new(t))
        }

        pub fn set(&self, t: DateTime<Tz>) {
            *self.0.lock().unwrap() = t;
        }

        pub fn advance(&self, by: chrono::Duration) {
            let mut g = self.0.lock().unwrap();
            *g += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Tz> {
            *self.0.lock().unwrap()
        }
    }

    /// Wall clock driven by tokio time, so it moves with a paused runtime.
    /// `jump` steps it without tokio noticing (suspend/resume, NTP step).
    pub struct TokioClock {
        base: DateTime<Tz>,
        start: tokio::time::Instant,
        skew: Mutex<chrono::Duration>,
    }

    impl TokioClock {
        pub fn at(tz: Tz, y: i32, m: u32, d: u32, hh: u32, mm: u32) -> Self {
            Self {
                base: tz.with_ymd_and_hms(y, m, d, hh, mm, 0).single().unwrap(),
                start: tokio::time::Instant::now(),
                skew: Mutex::new(chrono::Duration::zero()),
            }
        }

        pub fn jump(&self, by: chrono::Duration) {
            *self.skew.lock().unwrap() += by;
        }
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Tz> {
            let elapsed = chrono::Duration::from_std(self.start.elapsed()).unwrap();
            self.base + elapsed + *self.skew.lock().unwrap()
        }
    }
}
