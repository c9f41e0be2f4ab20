// ===============================
// src/dispatcher.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : dispatcher.rs
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

use hyper::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::context::AppContext;
use crate::domain::{Direction, Snapshot};
use crate::error::RequestError;
use crate::metrics::INCREMENTS;

/// Body of an increment call. Older clients send `type` instead of `kind`.
#[derive(Debug, Deserialize)]
pub struct IncrementRequest {
    #[serde(alias = "type")]
    pub kind: String,
}

pub struct Dispatcher {
    ctx: Arc<AppContext>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Validate, then apply -> save -> sync under the tally lock.
    /// Save and sync failures are logged inside and never reach the caller.
    pub async fn increment(
        &self,
        method: &Method,
        direction: Option<Direction>,
        body: &[u8],
    ) -> Result<Snapshot, RequestError> {
        if *method != Method::POST {
            return Err(RequestError::MethodNotAllowed);
        }
        let req: IncrementRequest = serde_json::from_slice(body)
            .map_err(|e| RequestError::BadRequest(format!("Invalid request body: {e}")))?;
        let kind = req.kind.trim();
        if kind.is_empty() {
            return Err(RequestError::BadRequest("Invalid request body: empty kind".into()));
        }

        let mut tally = self.ctx.tally.lock().await;
        let applied = tally.apply(&self.ctx.catalog, kind, direction)?;
        let dir_label = direction.map(|d| d.as_str()).unwrap_or("none");
        INCREMENTS.with_label_values(&[applied.as_str(), dir_label]).inc();
        debug!(%kind, direction = dir_label, target = applied.as_str(), "increment applied");

        if let Err(e) = self.ctx.store.save(&tally).await {
            warn!(error = %e, date = %tally.date, "save failed, keeping in-memory tally");
        }
        self.ctx.syncer.sync(&mut tally).await;

        Ok(tally.snapshot(self.ctx.catalog.open()))
    }

    pub async fn snapshot(&self) -> Snapshot {
        let tally = self.ctx.tally.lock().await;
        tally.snapshot(self.ctx.catalog.open())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OpenItems;
    use crate::clock::testing::ManualClock;
    use crate::context::testing::context;
    use crate::domain::Counter;
    use crate::gateway::testing::RecordingGateway;
    use chrono_tz::Asia::Tashkent;
    use tempfile::tempdir;

    struct Rig {
        d: Arc<Dispatcher>,
        ctx: Arc<AppContext>,
        gw: Arc<RecordingGateway>,
        _dir: tempfile::TempDir,
    }

    async fn rig(open: OpenItems) -> Rig {
        let dir = tempdir().unwrap();
        let gw = Arc::new(RecordingGateway::default());
        let clock = Arc::new(ManualClock::at(Tashkent, 2026, 10, 16, 12, 0));
        let ctx = context(dir.path(), open, clock, gw.clone()).await;
        Rig { d: Arc::new(Dispatcher::new(ctx.clone())), ctx, gw, _dir: dir }
    }

    #[tokio::test]
    async fn buy_then_two_sells() {
        let r = rig(OpenItems::Split).await;
        let body = br#"{"kind":"sword5"}"#;
        r.d.increment(&Method::POST, Some(Direction::Buy), body).await.unwrap();
        r.d.increment(&Method::POST, Some(Direction::Sell), body).await.unwrap();
        let snap = r.d.increment(&Method::POST, Some(Direction::Sell), body).await.unwrap();

        assert_eq!(snap.fixed["sword5"], Counter::Split { buy: 1, sell: 2 });
        let tally = r.ctx.tally.lock().await;
        assert!(tally.last_text.lines().any(|l| l == "sword5: 1/2"));
        // one create, then edits; same minute so every call changed text
        assert_eq!(r.gw.calls().len(), 3);
    }

    #[tokio::test]
    async fn legacy_type_field_is_accepted() {
        let r = rig(OpenItems::Split).await;
        let snap = r
            .d
            .increment(&Method::POST, Some(Direction::Buy), br#"{"type":"custom_item"}"#)
            .await
            .unwrap();
        assert_eq!(snap.buy_map.unwrap().get("custom_item"), Some(&1));
    }

    #[tokio::test]
    async fn wrong_method_and_bad_bodies_are_rejected_without_state_change() {
        let r = rig(OpenItems::Off).await;
        let before = r.d.snapshot().await;

        assert_eq!(
            r.d.increment(&Method::GET, Some(Direction::Buy), br#"{"kind":"sword5"}"#).await,
            Err(RequestError::MethodNotAllowed)
        );
        let bodies: [&[u8]; 3] = [b"not json", br#"{"kind":"  "}"#, br#"{"other":1}"#];
        for body in bodies {
            let err = r.d.increment(&Method::POST, Some(Direction::Buy), body).await.unwrap_err();
            assert!(matches!(err, RequestError::BadRequest(_)));
        }
        let err = r
            .d
            .increment(&Method::POST, Some(Direction::Buy), br#"{"kind":"custom_item"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::BadRequest(m) if m.contains("custom_item")));

        assert_eq!(r.d.snapshot().await, before);
        assert!(r.gw.calls().is_empty());
    }

    #[tokio::test]
    async fn channel_outage_is_invisible_to_callers() {
        let r = rig(OpenItems::Split).await;
        r.gw.set_failing(true);
        let snap = r
            .d
            .increment(&Method::POST, Some(Direction::Buy), br#"{"kind":"sword6"}"#)
            .await
            .unwrap();
        assert_eq!(snap.fixed["sword6"], Counter::Split { buy: 1, sell: 0 });

        // the mutation was persisted even though sync failed
        let date = r.ctx.tally.lock().await.date;
        let back = r.ctx.store.load(date, &r.ctx.catalog).await;
        assert_eq!(back.fixed["sword6"], Counter::Split { buy: 1, sell: 0 });
        assert_eq!(back.message_id, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_counted_exactly() {
        let r = rig(OpenItems::Split).await;
        let mut handles = Vec::new();
        for i in 0..60 {
            let d = r.d.clone();
            handles.push(tokio::spawn(async move {
                let (dir, kind) = match i % 3 {
                    0 => (Direction::Buy, "sword5"),
                    1 => (Direction::Sell, "sword5"),
                    _ => (Direction::Sell, "custom_item"),
                };
                let body = format!(r#"{{"kind":"{kind}"}}"#);
                d.increment(&Method::POST, Some(dir), body.as_bytes()).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let snap = r.d.snapshot().await;
        assert_eq!(snap.fixed["sword5"], Counter::Split { buy: 20, sell: 20 });
        assert_eq!(snap.sell_map.unwrap().get("custom_item"), Some(&20));
        assert_eq!(snap.buy_map.unwrap().get("custom_item"), None);
    }
}
