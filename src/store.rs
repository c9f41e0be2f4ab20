// ===============================
// src/store.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : store.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
License : MIT (see LICENSE)

Summary : Counts buy/sell events per item over HTTP, keeps one JSON file per
          day, mirrors the running totals into a single chat message that is
          edited in place, and starts a fresh tally at local midnight.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::domain::DailyTally;
use crate::error::StoreError;
use crate::metrics::PERSIST_ERRORS;

/// One JSON file per day: `<dir>/data_<YYYY-MM-DD>.json`.
#[derive(Debug, Clone)]
pub struct TallyStore {
    dir: PathBuf,
}

impl TallyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("data_{}.json", date.format("%Y-%m-%d")))
    }

    /// Never fails: anything unreadable becomes a fresh tally for `date`.
    pub async fn load(&self, date: NaiveDate, catalog: &Catalog) -> DailyTally {
        let path = self.path_for(date);
        let bytes = match fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no file for today, starting fresh");
                return DailyTally::fresh(date, catalog);
            }
            Err(e) => {
                warn!(?e, path = %path.display(), "read failed, starting fresh");
                return DailyTally::fresh(date, catalog);
            }
        };

        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            warn!(path = %path.display(), "empty data file, starting fresh");
            return DailyTally::fresh(date, catalog);
        }

        let mut tally: DailyTally = match serde_json::from_slice(&bytes) {
            Ok(t) => t,
            Err(e) => {
                warn!(?e, path = %path.display(), "decode failed, starting fresh");
                return DailyTally::fresh(date, catalog);
            }
        };

        if tally.date != date {
            warn!(
                path = %path.display(),
                stored = %tally.date,
                expected = %date,
                "file date does not match its name, starting fresh"
            );
            return DailyTally::fresh(date, catalog);
        }

        tally.reconcile(catalog);
        info!(path = %path.display(), message_id = ?tally.message_id, "tally loaded");
        tally
    }

    /// Overwrites the file for `tally.date`. Goes through a temp file + rename
    /// so a crash mid-write never leaves a truncated file behind.
    pub async fn save(&self, tally: &DailyTally) -> Result<(), StoreError> {
        let res = self.write(tally).await;
        if res.is_err() {
            PERSIST_ERRORS.inc();
        }
        res
    }

    async fn write(&self, tally: &DailyTally) -> Result<(), StoreError> {
        let path = self.path_for(tally.date);
        let body = serde_json::to_vec_pretty(tally)?;

        if !self.dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.dir).await.map_err(|e| io_err(&self.dir, e))?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &body).await.map_err(|e| io_err(&tmp, e))?;
        fs::rename(&tmp, &path).await.map_err(|e| io_err(&path, e))?;
        debug!(path = %path.display(), bytes = body.len(), "tally saved");
        Ok(())
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io { path: path.display().to_string(), source }
}
