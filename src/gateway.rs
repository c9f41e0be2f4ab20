// ===============================
// src/gateway.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : gateway.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
License : MIT (see LICENSE)

Summary : Counts buy/sell events per item over HTTP, keeps one JSON file per
          day, mirrors the running totals into a single chat message that is
          edited in place, and starts a fresh tally at local midnight.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::error::ChannelError;

/// The outward chat surface: create a message, edit it by id. Nothing else.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn create_message(&self, text: &str) -> Result<i64, ChannelError>;
    async fn edit_message(&self, id: i64, text: &str) -> Result<(), ChannelError>;
}

/// Dry-run gateway (GATEWAY=log): prints the text instead of sending it.
#[derive(Debug, Default)]
pub struct LogGateway {
    next_id: AtomicI64,
}

#[async_trait]
impl MessageGateway for LogGateway {
    async fn create_message(&self, text: &str) -> Result<i64, ChannelError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!(id, %text, "log gateway: create");
        Ok(id)
    }

    async fn edit_message(&self, id: i64, text: &str) -> Result<(), ChannelError> {
        info!(id, %text, "log gateway: edit");
        Ok(())
    }
}
