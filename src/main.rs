// ===============================
// src/main.rs
// ===============================
/*
 cd /home/kukuhtw/rust/tally_bot

 # tambah 1 beli / 1 jual
curl -s -X POST localhost:8080/buy  -d '{"kind":"sword5"}'
curl -s -X POST localhost:8080/sell -d '{"kind":"custom_item"}'

# counter hari ini & metrics
curl -s localhost:8080/snapshot
curl -s localhost:8080/metrics | grep '^sync_total'

*/
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : main.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
License : MIT (see LICENSE)

Summary : Counts buy/sell events per item over HTTP, keeps one JSON file per
          day, mirrors the running totals into a single chat message that is
          edited in place, and starts a fresh tally at local midnight.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
mod catalog;
mod clock;
mod config;
mod context;
mod dispatcher;
mod domain;
mod error;
mod gateway;          // trait + log-only gateway (dry run)
mod gateway_telegram; // Telegram Bot API
mod http;
mod metrics;
mod scheduler;
mod store;
mod sync;

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::clock::SystemClock;
use crate::context::AppContext;
use crate::dispatcher::Dispatcher;
use crate::gateway::{LogGateway, MessageGateway};
use crate::gateway_telegram::TelegramGateway;
use crate::scheduler::ResetScheduler;
use crate::store::TallyStore;

#[tokio::main]
async fn main() -> ExitCode {
    // ---- Logging ----
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ---- Load config (fatal on error) ----
    let args = match config::load(config::Cli::parse()) {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "config error, not starting");
            return ExitCode::from(2);
        }
    };

    // ---- Metrics ----
    metrics::init();
    metrics::record_config(&args.tz_name, args.catalog.open().as_str(), args.catalog.items().len());

    let items: Vec<&str> = args.catalog.items().iter().map(|i| i.key.as_str()).collect();
    info!(
        port = args.http_port,
        data_dir = %args.data_dir.display(),
        timezone = %args.tz_name,
        gateway = args.gateway.as_str(),
        open_items = args.catalog.open().as_str(),
        items = ?items,
        "startup config"
    );

    // ---- Gateway ----
    let gateway: Arc<dyn MessageGateway> = match &args.gateway {
        config::GatewayMode::Log => Arc::new(LogGateway::default()),
        config::GatewayMode::Telegram(t) => {
            match TelegramGateway::new(&t.api_url, t.token.clone(), t.chat_id) {
                Ok(g) => Arc::new(g),
                Err(e) => {
                    error!(error = %e, "telegram client init failed");
                    return ExitCode::from(2);
                }
            }
        }
    };

    // ---- Context (tally of today + syncer) ----
    let ctx = AppContext::start(
        Arc::new(args.catalog.clone()),
        Arc::new(TallyStore::new(args.data_dir.clone())),
        gateway,
        Arc::new(SystemClock::new(args.tz)),
        args.style.clone(),
    )
    .await;
    let outcome = ctx.initialize_message().await;
    info!(outcome = outcome.as_str(), "message cycle started");

    // ---- Shutdown bus ----
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ---- Midnight reset ----
    let sched = tokio::spawn(ResetScheduler::new(ctx.clone()).run(shutdown_rx.clone()));

    // ---- HTTP ----
    let addr = SocketAddr::from(([0, 0, 0, 0], args.http_port));
    let dispatcher = Arc::new(Dispatcher::new(ctx.clone()));
    let mut server = tokio::spawn(http::serve(addr, dispatcher, shutdown_rx));

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(?e, "ctrl_c listener failed, shutting down");
            }
            info!("shutdown requested");
        }
        res = &mut server => {
            // server ended on its own: bind error or crash
            match res {
                Ok(Err(e)) => error!(error = %e, "http server failed"),
                Err(e) => error!(?e, "http task panicked"),
                Ok(Ok(())) => {}
            }
            let _ = shutdown_tx.send(true);
            let _ = sched.await;
            return ExitCode::FAILURE;
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = sched.await;
    if let Ok(Err(e)) = server.await {
        error!(error = %e, "http server error during shutdown");
    }
    info!("bye");
    ExitCode::SUCCESS
}
