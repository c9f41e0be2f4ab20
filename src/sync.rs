// ===============================
// src/sync.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : sync.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
License : MIT (see LICENSE)

Summary : Counts buy/sell events per item over HTTP, keeps one JSON file per
          day, mirrors the running totals into a single chat message that is
          edited in place, and starts a fresh tally at local midnight.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, OpenItems};
use crate::clock::Clock;
use crate::domain::{Counter, DailyTally};
use crate::error::ChannelError;
use crate::gateway::MessageGateway;
use crate::metrics::{SYNC, SYNC_LATENCY};
use crate::store::TallyStore;

/// Fixed wording of the rendered message.
#[derive(Debug, Clone)]
pub struct RenderStyle {
    pub header_title: String,
    pub open_title: String,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            header_title: "🗡 Stats for".to_string(),
            open_title: "Other items:".to_string(),
        }
    }
}

/// Pure rendering. Same tally + same minute -> byte-identical text.
pub fn render(tally: &DailyTally, catalog: &Catalog, style: &RenderStyle, now: DateTime<Tz>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}:", style.header_title, tally.date.format("%Y-%m-%d"));
    out.push('\n');

    for it in catalog.items() {
        let c = tally
            .fixed
            .get(&it.key)
            .copied()
            .unwrap_or_else(|| Counter::zero(it.directional));
        match c {
            Counter::Split { buy, sell } => {
                let _ = writeln!(out, "{}: {}/{}", it.key, buy, sell);
            }
            Counter::Single(n) => {
                let _ = writeln!(out, "{}: {}", it.key, n);
            }
        }
    }

    let open = open_lines(tally, catalog.open());
    if !open.is_empty() {
        out.push('\n');
        out.push_str(&style.open_title);
        out.push('\n');
        for line in open {
            out.push_str(&line);
            out.push('\n');
        }
    }

    let _ = write!(out, "\n{}", now.format("%H:%M"));
    out
}

// Lexicographic by name so new names never reshuffle existing lines.
fn open_lines(tally: &DailyTally, mode: OpenItems) -> Vec<String> {
    match mode {
        OpenItems::Off => Vec::new(),
        OpenItems::Single => tally
            .count_map
            .iter()
            .map(|(k, n)| format!("{k}: {n}"))
            .collect(),
        OpenItems::Split => {
            let names: BTreeSet<&String> = tally.buy_map.keys().chain(tally.sell_map.keys()).collect();
            names
                .into_iter()
                .map(|k| {
                    let b = tally.buy_map.get(k).copied().unwrap_or(0);
                    let s = tally.sell_map.get(k).copied().unwrap_or(0);
                    format!("{k}: {b}/{s}")
                })
                .collect()
        }
    }
}

#[derive(Debug)]
pub enum SyncOutcome {
    /// rendered text equals what the channel already shows
    Unchanged,
    Created(i64),
    Edited,
    /// logged; `last_text` left stale so the next sync retries
    Failed(ChannelError),
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Unchanged => "unchanged",
            SyncOutcome::Created(_) => "created",
            SyncOutcome::Edited => "edited",
            SyncOutcome::Failed(_) => "failed",
        }
    }
}

/// Keeps the single chat message in line with the tally.
pub struct MessageSyncer {
    gateway: Arc<dyn MessageGateway>,
    store: Arc<TallyStore>,
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    style: RenderStyle,
}

impl MessageSyncer {
    pub fn new(
        gateway: Arc<dyn MessageGateway>,
        store: Arc<TallyStore>,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
        style: RenderStyle,
    ) -> Self {
        Self { gateway, store, catalog, clock, style }
    }

    pub fn render(&self, tally: &DailyTally) -> String {
        render(tally, &self.catalog, &self.style, self.clock.now())
    }

    pub async fn sync(&self, tally: &mut DailyTally) -> SyncOutcome {
        let text = self.render(tally);
        if text == tally.last_text {
            debug!(date = %tally.date, "sync: text unchanged, skip");
            SYNC.with_label_values(&["unchanged"]).inc();
            return SyncOutcome::Unchanged;
        }

        let outcome = self.push(tally, &text).await;
        match &outcome {
            SyncOutcome::Failed(e) => {
                warn!(error = %e, message_id = ?tally.message_id, "sync: channel call failed");
            }
            _ => {
                tally.last_text = text;
                if let Err(e) = self.store.save(tally).await {
                    warn!(error = %e, "sync: persisting message state failed");
                }
            }
        }
        SYNC.with_label_values(&[outcome.as_str()]).inc();
        outcome
    }

    async fn push(&self, tally: &mut DailyTally, text: &str) -> SyncOutcome {
        if let Some(id) = tally.message_id {
            let started = Instant::now();
            let res = self.gateway.edit_message(id, text).await;
            SYNC_LATENCY.observe(started.elapsed().as_secs_f64() * 1000.0);
            match res {
                Ok(()) => return SyncOutcome::Edited,
                Err(ChannelError::MessageGone(_)) => {
                    // dihapus dari chat -> kirim pesan baru
                    warn!(id, "sync: message gone, sending a new one");
                    tally.message_id = None;
                }
                Err(e) => return SyncOutcome::Failed(e),
            }
        }

        let started = Instant::now();
        let res = self.gateway.create_message(text).await;
        SYNC_LATENCY.observe(started.elapsed().as_secs_f64() * 1000.0);
        match res {
            Ok(id) => {
                info!(id, date = %tally.date, "sync: new message created");
                tally.message_id = Some(id);
                SyncOutcome::Created(id)
            }
            Err(e) => SyncOutcome::Failed(e),
        }
    }
}
