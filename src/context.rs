// ===============================
// src/context.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : context.rs
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

use tokio::sync::Mutex;
use tracing::info;

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::domain::DailyTally;
use crate::gateway::MessageGateway;
use crate::store::TallyStore;
use crate::sync::{MessageSyncer, RenderStyle, SyncOutcome};

/// Everything the dispatcher and the scheduler share. The live tally sits
/// behind one mutex; every mutation holds it through save + sync.
pub struct AppContext {
    pub tally: Mutex<DailyTally>,
    pub catalog: Arc<Catalog>,
    pub store: Arc<TallyStore>,
    pub syncer: MessageSyncer,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    /// Loads today's file (or starts fresh) and wires the syncer.
    pub async fn start(
        catalog: Arc<Catalog>,
        store: Arc<TallyStore>,
        gateway: Arc<dyn MessageGateway>,
        clock: Arc<dyn Clock>,
        style: RenderStyle,
    ) -> Arc<Self> {
        let today = clock.today();
        let tally = store.load(today, &catalog).await;
        info!(date = %today, message_id = ?tally.message_id, "context: tally ready");

        let syncer = MessageSyncer::new(gateway, store.clone(), catalog.clone(), clock.clone(), style);
        Arc::new(Self {
            tally: Mutex::new(tally),
            catalog,
            store,
            syncer,
            clock,
        })
    }

    /// Start of a message cycle: sends a new message when none is recorded,
    /// otherwise refreshes the existing one if its text is stale.
    pub async fn initialize_message(&self) -> SyncOutcome {
        let mut tally = self.tally.lock().await;
        self.syncer.sync(&mut tally).await
    }
}

#[cfg(test)]
pub mod testing {
    use std::path::Path;
    use std::sync::Arc;

    use super::AppContext;
    use crate::catalog::{Catalog, CatalogItem, OpenItems};
    use crate::clock::Clock;
    use crate::gateway::testing::RecordingGateway;
    use crate::store::TallyStore;
    use crate::sync::RenderStyle;

    pub fn small_catalog(open: OpenItems) -> Catalog {
        Catalog::new(
            vec![
                CatalogItem { key: "sword5".into(), directional: true },
                CatalogItem { key: "sword6".into(), directional: true },
                CatalogItem { key: "megasword".into(), directional: false },
            ],
            open,
        )
        .unwrap()
    }

    pub async fn context(
        dir: &Path,
        open: OpenItems,
        clock: Arc<dyn Clock>,
        gw: Arc<RecordingGateway>,
    ) -> Arc<AppContext> {
        AppContext::start(
            Arc::new(small_catalog(open)),
            Arc::new(TallyStore::new(dir)),
            gw,
            clock,
            RenderStyle::default(),
        )
        .await
    }
}
